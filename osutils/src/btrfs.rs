use anyhow::{Context, Error};

use crate::dependencies::Dependency;

/// Scans all block devices for Btrfs superblocks and registers any multi-device
/// filesystem found, the Btrfs analogue of RAID assembly or LVM activation.
pub fn scan_all() -> Result<(), Error> {
    Dependency::Btrfs
        .cmd()
        .arg("device")
        .arg("scan")
        .arg("--all")
        .run_and_check()
        .context("Failed to run btrfs device scan --all")
}
