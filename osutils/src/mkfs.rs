use std::path::Path;
use std::process::Command;

use anyhow::{bail, Context, Error};

use crate::{exe::RunAndCheck, filesystems::Fstype};

/// Formats `device_path` with `filesystem` by invoking the matching
/// `mkfs.<type>` binary directly (`mkfs.ext4`, `mkfs.xfs`, ...), the way the
/// tool the RAM-disk stage is modeled on locates a formatter: one binary per
/// filesystem rather than a single dispatcher with a `--type` flag.
pub fn run(device_path: &Path, filesystem: &Fstype) -> Result<(), Error> {
    if !filesystem.is_formattable() {
        bail!(
            "'{}' filesystem type cannot be used for creating new filesystems",
            filesystem
        );
    }

    let binary = format!("mkfs.{}", filesystem.name());
    Command::new(&binary)
        .arg(device_path)
        .run_and_check()
        .with_context(|| {
            format!(
                "Failed to format '{}' as {} via {binary}",
                device_path.display(),
                filesystem
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_formattable_types() {
        assert!(run(Path::new("/dev/ram0p1"), &Fstype::Swap).is_err());
        assert!(run(Path::new("/dev/ram0p1"), &Fstype::Auto).is_err());
    }
}
