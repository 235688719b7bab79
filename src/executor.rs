use std::path::{Path, PathBuf};

use anyhow::{Context, Error};
use log::info;

use osutils::filesystems::Fstype;
use osutils::sgdisk::PartitionSpec;

use crate::model::RamdiskPlan;

/// Directory under which every RAM-disk partition is mounted before
/// replication populates it.
pub const RAMDISK_BASE: &str = "/mnt/ramdisk-ramboot";

/// Materializes `plan` as an actual RAM block device: loads `brd`, partitions
/// it, formats each partition, and mounts every partition under
/// [`RAMDISK_BASE`].
///
/// The `brd` module is sized from `plan.ramdisk_size_gb`, which the planner
/// already padded by `max(2, 5%)` exactly once; each individual `sgdisk
/// --new` call uses the partition's own `size_gb` as the planner computed
/// it, with no further adjustment here.
pub fn execute(plan: &RamdiskPlan) -> Result<PathBuf, Error> {
    let num_partitions = plan.partitions.len() as u32;

    info!(
        "Creating {}G RAM disk with {num_partitions} partition(s)",
        plan.ramdisk_size_gb
    );
    osutils::ramdisk::create(plan.ramdisk_size_gb, num_partitions)?;

    let specs: Vec<PartitionSpec> = plan
        .partitions
        .iter()
        .map(|p| PartitionSpec {
            order: p.order,
            size_gib: p.size_gb,
        })
        .collect();
    osutils::sgdisk::partition(Path::new(osutils::ramdisk::DEVICE), &specs)?;

    let base = PathBuf::from(RAMDISK_BASE);

    for partition in &plan.partitions {
        let device_path = PathBuf::from(osutils::ramdisk::partition_path(partition.order));
        let fstype: Fstype = partition.fstype.as_str().into();

        osutils::mkfs::run(&device_path, &fstype)
            .with_context(|| format!("Failed to format partition {}", partition.order))?;

        let mount_dir = mount_point(&base, &partition.destination);
        osutils::mount::ensure_mount_directory(&mount_dir)?;
        osutils::mount::mount(&device_path, &mount_dir, &fstype, &[])
            .with_context(|| format!("Failed to mount partition {}", partition.order))?;
    }

    Ok(base)
}

/// Maps a mount destination (`/`, `/var`, ...) onto its location under the
/// RAM-disk base directory.
pub fn mount_point(base: &Path, destination: &str) -> PathBuf {
    base.join(destination.trim_start_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mount_point_joins_relative_destination() {
        let base = PathBuf::from("/mnt/ramdisk-ramboot");
        assert_eq!(mount_point(&base, "/"), PathBuf::from("/mnt/ramdisk-ramboot"));
        assert_eq!(
            mount_point(&base, "/var/log"),
            PathBuf::from("/mnt/ramdisk-ramboot/var/log")
        );
    }
}
