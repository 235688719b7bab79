use std::fs;
use std::path::Path;

use anyhow::{Context, Error};
use log::info;
use tempfile::tempdir;

use osutils::filesystems::Fstype;

use crate::executor;
use crate::model::{MountCollection, MountEntry};

/// Archive-copies every physical mount into the RAM disk, in depth order so
/// parent destinations exist before children are mounted onto them.
pub fn copy_all(physical: &MountCollection, ramdisk_base: &Path) -> Result<(), Error> {
    for mount in physical.iter() {
        if mount.is_root() {
            info!("Copying root filesystem into '{}'", ramdisk_base.display());
            osutils::copy::archive_copy("/.", ramdisk_base)
                .context("Failed to copy root filesystem into the RAM disk")?;
        } else {
            copy_non_root(mount, ramdisk_base)?;
        }
    }

    Ok(())
}

fn copy_non_root(mount: &MountEntry, ramdisk_base: &Path) -> Result<(), Error> {
    let destination = executor::mount_point(ramdisk_base, &mount.destination);
    osutils::mount::ensure_mount_directory(&destination)?;

    let temp = tempdir().with_context(|| {
        format!("Failed to create a temporary mount point for '{}'", mount.destination)
    })?;

    let source = mount.canonical_source.as_deref().unwrap_or(&mount.source);
    let fstype: Fstype = mount.fstype.as_str().into();
    let options = replication_mount_options(mount);

    info!("Copying '{}' into '{}'", mount.destination, destination.display());

    osutils::mount::mount(source, temp.path(), &fstype, &options)
        .with_context(|| format!("Failed to mount '{source}' for replication"))?;

    let source_contents = temp.path().join(".");
    let copy_result = osutils::copy::archive_copy(&source_contents, &destination);

    osutils::mount::force_umount(temp.path())
        .with_context(|| format!("Failed to unmount temporary replication source for '{}'", mount.destination))?;

    copy_result.with_context(|| format!("Failed to copy '{}' into the RAM disk", mount.destination))
}

/// Mount options for the temporary replication-source mount: Btrfs keeps its
/// original fstab options (e.g. `subvol=...`), ZFS mounts with `zfsutil`
/// regardless of its fstab options, everything else mounts plain.
fn replication_mount_options(mount: &MountEntry) -> Vec<String> {
    match mount.fstype.as_str() {
        "btrfs" => mount.options.clone(),
        "zfs" => vec!["zfsutil".into()],
        _ => Vec::new(),
    }
}

/// Rewrites the RAM disk's copy of the mount table to contain only
/// non-physical entries, so the new system never tries to remount the
/// original disks it just replicated.
pub fn rewrite_fstab(all_mounts: &MountCollection, ramdisk_base: &Path) -> Result<(), Error> {
    let path = ramdisk_base.join("etc/fstab");

    let body: String = all_mounts
        .iter()
        .filter(|m| !m.is_physical())
        .map(|m| format!("{}\n", m.to_fstab_line()))
        .collect();

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create '{}'", parent.display()))?;
    }
    fs::write(&path, body).with_context(|| format!("Failed to write '{}'", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(fstype: &str, options: Vec<&str>) -> MountEntry {
        MountEntry::new(
            "/dev/sda1",
            "/data",
            fstype,
            options.into_iter().map(String::from).collect(),
            "0",
            "2",
        )
    }

    #[test]
    fn btrfs_keeps_original_options() {
        let mount = entry("btrfs", vec!["subvol=@data", "noatime"]);
        assert_eq!(
            replication_mount_options(&mount),
            vec!["subvol=@data".to_owned(), "noatime".to_owned()]
        );
    }

    #[test]
    fn zfs_forces_zfsutil_regardless_of_declared_options() {
        let mount = entry("zfs", vec!["defaults"]);
        assert_eq!(replication_mount_options(&mount), vec!["zfsutil".to_owned()]);
    }

    #[test]
    fn plain_fstype_mounts_with_no_options() {
        let mount = entry("ext4", vec!["defaults"]);
        assert!(replication_mount_options(&mount).is_empty());
    }

    #[test]
    fn rewrite_fstab_keeps_only_non_physical_entries() {
        let root = MountEntry::new("UUID=abc", "/", "ext4", vec!["defaults".into()], "0", "1");
        let tmp = MountEntry::new("tmpfs", "/tmp", "tmpfs", vec!["defaults".into()], "0", "0");
        let nfs = MountEntry::new("server:/export", "/data", "nfs", vec!["defaults".into()], "0", "0");
        let collection = MountCollection::from_initialized(vec![root, tmp.clone(), nfs.clone()]).unwrap();

        let dir = tempfile::tempdir().unwrap();
        rewrite_fstab(&collection, dir.path()).unwrap();

        let written = fs::read_to_string(dir.path().join("etc/fstab")).unwrap();
        assert!(!written.contains("UUID=abc"));
        assert!(written.contains("tmpfs"));
        assert!(written.contains("server:/export"));
    }
}
