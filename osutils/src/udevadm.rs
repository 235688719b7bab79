use anyhow::{Context, Error};

use crate::dependencies::Dependency;

/// Runs `udevadm test` against a freshly-assembled device node so the kernel's
/// uevent queue catches up before the node is probed again.
pub fn test(device: &str) -> Result<(), Error> {
    Dependency::Udevadm
        .cmd()
        .arg("test")
        .arg(device)
        .run_and_check()
        .with_context(|| format!("Failed to run udevadm test against '{device}'"))
}

#[cfg(all(test, feature = "functional-tests"))]
mod functional_tests {
    use super::*;

    #[test]
    fn test_against_real_device() {
        test("/dev/sda").unwrap();
    }
}
