use anyhow::{Context, Error};
use log::info;

use crate::dependencies::Dependency;

/// Assembles every RAID array `mdadm` can discover from on-disk superblocks.
///
/// This mirrors the early-boot RAID activation step: run once, unconditionally,
/// before anything looks for `/dev/md*` nodes. Callers that need a specific
/// node settled afterwards should follow up with `udevadm::test`.
pub fn assemble_scan() -> Result<(), Error> {
    info!("Assembling RAID arrays via mdadm --assemble --scan");

    Dependency::Mdadm
        .cmd()
        .arg("--assemble")
        .arg("--scan")
        .run_and_check()
        .context("Failed to run mdadm --assemble --scan")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assemble_scan_reports_missing_binary() {
        if Dependency::Mdadm.exists() {
            return;
        }
        let err = assemble_scan().unwrap_err();
        assert!(err.to_string().contains("mdadm"));
    }
}
