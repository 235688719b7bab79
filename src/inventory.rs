use std::{collections::HashMap, fs, path::Path};

use anyhow::{Context, Error};
use osutils::dependencies::Dependency;

use crate::{
    classify, config::RambootConfig, model::MountEntry, model::ZfsVolume, probe::Probe,
};

/// Parses the configured mount table and returns one `MountEntry` per
/// non-blank, non-comment line, fully discovered and ready for
/// `MountCollection` construction.
///
/// ZFS-discovered mounts are appended after the fstab-derived entries; the
/// ignored-mounts filter is applied to the combined set last, matching the
/// distilled spec's "ignored-mounts filter" being the final inventory step.
pub fn build(config: &RambootConfig) -> Result<Vec<MountEntry>, Error> {
    let mut entries = parse_fstab(&config.fstab_file)?;

    for entry in &mut entries {
        initialize(entry)?;
    }

    entries.extend(zfs_mount_entries()?);

    entries.retain(|entry| !config.ignored_mounts.iter().any(|ignored| ignored == &entry.destination));

    Ok(entries)
}

/// Reads and parses the fstab-style file at `path`: blank lines and comment
/// lines (leading `#`) are dropped, everything else must be a six-field line.
pub fn parse_fstab(path: &str) -> Result<Vec<MountEntry>, Error> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read mount table '{path}'"))?;

    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| MountEntry::from_fstab_line(line).map_err(Error::from))
        .collect()
}

/// Runs the full discovery dispatch on one entry: identity resolution,
/// canonical-source computation, LVM device-mapper substitution, and
/// classification-dependent population of `partitions`/`parent_disks`/
/// `size_gb`/`parent_size_gb`.
pub fn initialize(entry: &mut MountEntry) -> Result<(), Error> {
    if entry.initialized {
        return Ok(());
    }

    entry.resolve_identity();
    entry.canonicalize_source();

    let canonical = entry
        .canonical_source
        .clone()
        .unwrap_or_else(|| entry.source.clone());

    entry.is_lvm = entry.is_physical() && !entry.is_remote() && classify::is_lvm(&canonical);
    entry.is_raid = entry.is_physical() && !entry.is_remote() && classify::is_raid(&canonical);

    if entry.is_lvm && Path::new(&canonical).exists() {
        if let Ok(mapped) = classify::lvm_map(&canonical) {
            entry.source = mapped;
        }
    }

    if !entry.is_physical() || entry.is_remote() {
        entry.initialized = true;
        return Ok(());
    }

    if entry.is_lvm {
        populate_lvm(entry)?;
    } else if entry.is_raid {
        populate_raid(entry);
    } else {
        populate_plain(entry)?;
    }

    entry.initialized = true;
    Ok(())
}

fn populate_lvm(entry: &mut MountEntry) -> Result<(), Error> {
    let vg = osutils::lvm::volume_group(&entry.source)
        .with_context(|| format!("Failed to resolve volume group for '{}'", entry.source))?;
    let partition = osutils::lvm::physical_volume(&vg)
        .with_context(|| format!("Failed to resolve physical volume for volume group '{vg}'"))?;
    let size_gb = osutils::lvm::logical_volume_size_gb(&entry.source)
        .with_context(|| format!("Failed to resolve logical volume size for '{}'", entry.source))?;

    let parent_disks = Probe::disks_of(&partition).unwrap_or_default();
    let parent_size_gb = parent_disks
        .first()
        .and_then(|disk| Probe::disk_size(disk).ok());

    entry.partitions = vec![partition];
    entry.size_gb = Some(size_gb);
    entry.parent_disks = parent_disks;
    entry.parent_size_gb = parent_size_gb;
    Ok(())
}

fn populate_raid(entry: &mut MountEntry) {
    entry.partitions = vec![entry.source.clone()];
    entry.parent_disks = vec![entry.source.clone()];
    entry.size_gb = Probe::mount_size(&entry.source).ok();
    entry.parent_size_gb = entry.size_gb;
}

fn populate_plain(entry: &mut MountEntry) -> Result<(), Error> {
    let partition = if entry.uuid.is_some() || entry.part_uuid.is_some() || entry.label.is_some() {
        readlink_canonicalize(&entry.source)?
    } else if entry.source.starts_with("/dev") {
        entry.source.clone()
    } else {
        entry.source.clone()
    };

    let parent_disks = Probe::disks_of(&partition).unwrap_or_default();
    let parent_size_gb = parent_disks
        .first()
        .and_then(|disk| Probe::disk_size(disk).ok());

    entry.partitions = vec![partition.clone()];
    entry.size_gb = Probe::mount_size(&partition).ok();
    entry.parent_disks = parent_disks;
    entry.parent_size_gb = parent_size_gb;
    Ok(())
}

fn readlink_canonicalize(path: &str) -> Result<String, Error> {
    Dependency::Readlink
        .cmd()
        .arg("--canonicalize")
        .arg(path)
        .output_and_check()
        .map(|s| s.trim().to_owned())
        .with_context(|| format!("Failed to resolve canonical path for '{path}'"))
}

/// Lists ZFS datasets, drops unmounted (`none`) ones, deduplicates by
/// destination keeping the *last*-encountered (highest list order) entry —
/// the inverse tie-break from `MountCollection`'s own dedup — and projects
/// each survivor into a `MountEntry`.
fn zfs_mount_entries() -> Result<Vec<MountEntry>, Error> {
    let datasets = match osutils::zfs::list_datasets() {
        Ok(datasets) => datasets,
        Err(_) => return Ok(Vec::new()),
    };

    let volumes: Vec<ZfsVolume> = datasets
        .into_iter()
        .enumerate()
        .filter(|(_, (_, mountpoint))| mountpoint != "none")
        .map(|(order, (name, destination))| {
            let pool = name.split('/').next().unwrap_or(&name).to_owned();
            let size_gb = osutils::zfs::pool_size_gb(&pool).unwrap_or(0);
            ZfsVolume {
                name,
                destination,
                order,
                pool,
                size_gb,
            }
        })
        .collect();

    let mut by_destination: HashMap<String, ZfsVolume> = HashMap::new();
    for volume in volumes {
        match by_destination.get(&volume.destination) {
            Some(existing) if existing.order > volume.order => {}
            _ => {
                by_destination.insert(volume.destination.clone(), volume);
            }
        }
    }

    let mut deduped: Vec<ZfsVolume> = by_destination.into_values().collect();
    deduped.sort_by_key(|v| v.order);

    Ok(deduped.into_iter().map(ZfsVolume::into_mount_entry).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parses_dropping_blank_and_comment_lines() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            "{}",
            indoc::indoc! {"
                # a comment

                UUID=abc / ext4 defaults 0 1
                server:/export /data nfs defaults 0 0
            "}
        )
        .unwrap();

        let entries = parse_fstab(file.path().to_str().unwrap()).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].destination, "/");
        assert_eq!(entries[1].fstype, "nfs");
    }

    #[test]
    fn rejects_malformed_line() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "only two fields").unwrap();
        assert!(parse_fstab(file.path().to_str().unwrap()).is_err());
    }

    #[test]
    fn remote_and_soft_mounts_skip_discovery_dispatch() {
        let mut nfs = MountEntry::new("server:/export", "/data", "nfs", vec![], "0", "0");
        initialize(&mut nfs).unwrap();
        assert!(nfs.initialized);
        assert!(nfs.partitions.is_empty());
        assert!(nfs.parent_disks.is_empty());

        let mut swap = MountEntry::new("/dev/sda2", "none", "swap", vec![], "0", "0");
        initialize(&mut swap).unwrap();
        assert!(swap.partitions.is_empty());
    }
}
