use std::collections::BTreeSet;
use std::fs;
use std::os::unix::fs::symlink;
use std::path::Path;

use log::warn;

use crate::config::RambootConfig;
use crate::model::{MountCollection, MountEntry};

const ZFS_CACHE_FILE: &str = "/etc/zfs/zpool.cache";
const ZFS_LIST_CACHE_DIR: &str = "/etc/zfs/zfs-list.cache";
const ZFS_SYSTEMD_TARGETS: &[&str] = &["zfs-volumes.target", "zfs-import.target", "zfs.target"];
const SYSTEMD_SYSTEM_DIR: &str = "/etc/systemd/system";

/// Best-effort device hiding, run after the pivot. Every failure here is
/// logged and swallowed: the new root is already live, and a failed cleanup
/// step here must never fail the overall run.
///
/// The ZFS cache/target cleanup runs unconditionally off `root.fstype`, not
/// `config.hide_disks` — that flag only gates the LVM branch (the Design
/// Notes resolve the source's ambiguous polarity in favor of hiding when
/// true).
pub fn hide(config: &RambootConfig, root: &MountEntry, physical: &MountCollection) {
    if root.fstype == "zfs" {
        hide_zfs_pools();
    }

    if config.hide_disks && root.is_lvm {
        hide_lvm_disks(physical);
    }
}

fn hide_zfs_pools() {
    if let Err(e) = fs::remove_file(ZFS_CACHE_FILE) {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!("Failed to remove '{ZFS_CACHE_FILE}': {e}");
        }
    }

    match fs::read_dir(ZFS_LIST_CACHE_DIR) {
        Ok(entries) => {
            for entry in entries.flatten() {
                if let Err(e) = fs::remove_file(entry.path()) {
                    warn!("Failed to remove '{}': {e}", entry.path().display());
                }
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to read '{ZFS_LIST_CACHE_DIR}': {e}"),
    }

    for target in ZFS_SYSTEMD_TARGETS {
        let link_path = Path::new(SYSTEMD_SYSTEM_DIR).join(target);
        let _ = fs::remove_file(&link_path);
        if let Err(e) = symlink("/dev/null", &link_path) {
            warn!("Failed to mask '{}': {e}", link_path.display());
        }
    }
}

/// Deletes every unique parent disk backing the LVM root (and any other
/// physical LVM mount) via the `device/delete` sysfs node, so the kernel
/// forgets about it entirely.
fn hide_lvm_disks(physical: &MountCollection) {
    for disk in unique_parent_disk_basenames(physical) {
        let delete_path = format!("/sys/block/{disk}/device/delete");
        if !Path::new(&delete_path).exists() {
            continue;
        }
        if let Err(e) = fs::write(&delete_path, "1") {
            warn!("Failed to delete block device '{disk}': {e}");
        }
    }
}

/// Unique basenames (e.g. `sda` from `/dev/sda`) of every parent disk across
/// `physical`'s mounts, so a disk backing several mounts is only hidden once.
fn unique_parent_disk_basenames(physical: &MountCollection) -> BTreeSet<&str> {
    physical
        .iter()
        .flat_map(|m| m.parent_disks.iter())
        .filter_map(|path| Path::new(path).file_name())
        .filter_map(|name| name.to_str())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedups_parent_disks_shared_across_mounts() {
        let mut root = MountEntry::new("/dev/mapper/vg-root", "/", "xfs", vec!["defaults".into()], "0", "1");
        root.is_lvm = true;
        root.parent_disks = vec!["/dev/sda".into()];
        let mut var = MountEntry::new("/dev/mapper/vg-var", "/var", "xfs", vec!["defaults".into()], "0", "2");
        var.is_lvm = true;
        var.parent_disks = vec!["/dev/sda".into(), "/dev/sdb".into()];

        let physical = MountCollection::from_initialized(vec![root, var]).unwrap();
        let disks = unique_parent_disk_basenames(&physical);

        assert_eq!(disks, BTreeSet::from(["sda", "sdb"]));
    }
}
