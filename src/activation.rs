use log::warn;
use regex::Regex;

use crate::config::RambootConfig;
use osutils::lsblk::BlockDeviceType;

/// Runs storage-class activation steps before mount discovery.
///
/// Every step is best-effort: a missing tool or a failing command is logged
/// and swallowed rather than propagated, matching the original's silent
/// per-command early exit. This stage runs strictly before the probe is
/// consulted for mount discovery, since its entire purpose is to make the
/// devices the probe will find actually present.
pub fn activate(config: &RambootConfig) {
    if config.activation_enabled("raid") {
        activate_raid();
    }
    if config.activation_enabled("zfs") {
        if let Err(e) = osutils::zfs::import_all() {
            warn!("ZFS activation failed: {e}");
        }
    }
    if config.activation_enabled("btrfs") {
        if let Err(e) = osutils::btrfs::scan_all() {
            warn!("Btrfs activation failed: {e}");
        }
    }
    if config.activation_enabled("lvm") {
        if let Err(e) = osutils::lvm::activate_vgs() {
            warn!("LVM activation failed: {e}");
        }
    }
}

fn activate_raid() {
    if let Err(e) = osutils::mdadm::assemble_scan() {
        warn!("RAID activation failed: {e}");
        return;
    }

    for device in raid_devices() {
        if let Err(e) = osutils::udevadm::test(&device) {
            warn!("udevadm test failed for '{device}': {e}");
        }
    }
}

/// Finds every `/dev/md*`-style device node present after RAID assembly.
fn raid_devices() -> Vec<String> {
    osutils::lsblk::find(|device| is_raid_device(device.blkdev_type, &device.name))
        .unwrap_or_default()
        .into_iter()
        .map(|device| device.name)
        .collect()
}

fn is_raid_device(blkdev_type: BlockDeviceType, name: &str) -> bool {
    let md_name = Regex::new(r"^/dev/md\d+.*$").expect("static regex is valid");
    blkdev_type == BlockDeviceType::Raid || md_name.is_match(name)
}
