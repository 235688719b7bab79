use osutils::lsblk::{self, BlockDevice, BlockDeviceType};

use crate::error::RambootError;

/// The sole path through which the rest of the pipeline queries the kernel's
/// block-layer model.
///
/// `get_tree` asks `lsblk --inverse` for the dependency tree rooted at a
/// device: each child in the returned tree is a device the root sits on top
/// of (a partition's child is its disk; a logical volume's child is its
/// physical volume). `first_field_matching` descends through `children[0]`
/// only ("first match" — the path down a non-striped stack); `all_fields_matching`
/// folds the whole tree ("all matches" — used to dedup disks under striped
/// or mirrored configurations).
pub struct Probe;

impl Probe {
    /// Returns the inverse block-device tree rooted at `device`.
    pub fn get_tree(device: &str) -> Result<BlockDevice, RambootError> {
        lsblk::try_get_inverse(device)
            .ok()
            .flatten()
            .ok_or_else(|| RambootError::ProbeUnavailable {
                device: device.to_owned(),
            })
    }

    /// Walks `children[0]` repeatedly, applying `extract` at each node, and
    /// returns the first non-`None` result found at any depth.
    pub fn first_field_matching<T>(
        device: &str,
        extract: impl Fn(&BlockDevice) -> Option<T>,
    ) -> Result<Option<T>, RambootError> {
        let root = Self::get_tree(device)?;
        Ok(first_match(&root, &extract))
    }

    /// Traverses the entire tree (not just the first-child spine) and
    /// collects every node for which `extract` returns `Some`.
    pub fn all_fields_matching<T>(
        device: &str,
        extract: impl Fn(&BlockDevice) -> Option<T>,
    ) -> Result<Vec<T>, RambootError> {
        let root = Self::get_tree(device)?;
        let mut out = Vec::new();
        collect_all(&root, &extract, &mut out);
        Ok(out)
    }

    /// Every disk (`BlockDeviceType::Disk`) this device ultimately sits on,
    /// deduplicated and sorted by name.
    pub fn disks_of(device: &str) -> Result<Vec<String>, RambootError> {
        let mut disks = Self::all_fields_matching(device, |node| {
            (node.blkdev_type == BlockDeviceType::Disk).then(|| node.name.clone())
        })?;
        disks.sort();
        disks.dedup();
        Ok(disks)
    }

    /// Every partition this device ultimately sits on.
    pub fn partitions_of(device: &str) -> Result<Vec<String>, RambootError> {
        let mut partitions = Self::all_fields_matching(device, |node| {
            (node.blkdev_type == BlockDeviceType::Partition).then(|| node.name.clone())
        })?;
        partitions.sort();
        partitions.dedup();
        Ok(partitions)
    }

    /// The device's own type, as classified by `lsblk`.
    pub fn type_of(device: &str) -> Result<BlockDeviceType, RambootError> {
        lsblk::device_type_name(device)
            .ok()
            .map(|name| match name.as_str() {
                "lvm" | "lvm2" => BlockDeviceType::Lvm,
                "part" => BlockDeviceType::Partition,
                "disk" => BlockDeviceType::Disk,
                name if name.starts_with("raid") => BlockDeviceType::Raid,
                _ => BlockDeviceType::Unknown,
            })
            .ok_or_else(|| RambootError::ProbeUnavailable {
                device: device.to_owned(),
            })
    }

    /// Size of `device` itself, rounded up to whole gigabytes.
    pub fn disk_size(device: &str) -> Result<u64, RambootError> {
        let node = Self::get_tree(device)?;
        Ok(bytes_to_gb_ceil(node.size))
    }

    /// Size of the mount's backing partition, rounded up to whole gigabytes.
    /// Distinct entry point from `disk_size` for readability at call sites
    /// even though both resolve through the same tree node today.
    pub fn mount_size(device: &str) -> Result<u64, RambootError> {
        Self::disk_size(device)
    }
}

fn first_match<T>(node: &BlockDevice, extract: &impl Fn(&BlockDevice) -> Option<T>) -> Option<T> {
    if let Some(value) = extract(node) {
        return Some(value);
    }
    let child = node.children.first()?;
    first_match(child, extract)
}

fn collect_all<T>(node: &BlockDevice, extract: &impl Fn(&BlockDevice) -> Option<T>, out: &mut Vec<T>) {
    if let Some(value) = extract(node) {
        out.push(value);
    }
    for child in &node.children {
        collect_all(child, extract, out);
    }
}

fn bytes_to_gb_ceil(bytes: u64) -> u64 {
    bytes.div_ceil(1024 * 1024 * 1024)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn disk(name: &str, size: u64, children: Vec<BlockDevice>) -> BlockDevice {
        BlockDevice {
            name: name.into(),
            size,
            blkdev_type: BlockDeviceType::Disk,
            children,
            ..Default::default()
        }
    }

    #[test]
    fn first_match_descends_first_child_only() {
        let leaf = BlockDevice {
            name: "/dev/sda".into(),
            blkdev_type: BlockDeviceType::Disk,
            ..Default::default()
        };
        let root = BlockDevice {
            name: "/dev/mapper/vg-root".into(),
            blkdev_type: BlockDeviceType::Lvm,
            children: vec![leaf],
            ..Default::default()
        };

        let found = first_match(&root, &|n| (n.blkdev_type == BlockDeviceType::Disk).then(|| n.name.clone()));
        assert_eq!(found.as_deref(), Some("/dev/sda"));
    }

    #[test]
    fn collect_all_gathers_every_matching_node() {
        let root = disk(
            "/dev/md0",
            0,
            vec![disk("/dev/sda", 0, vec![]), disk("/dev/sdb", 0, vec![])],
        );
        let mut out = Vec::new();
        collect_all(&root, &|n| (n.blkdev_type == BlockDeviceType::Disk).then(|| n.name.clone()), &mut out);
        assert_eq!(out, vec!["/dev/md0", "/dev/sda", "/dev/sdb"]);
    }

    #[test]
    fn bytes_to_gb_rounds_up() {
        assert_eq!(bytes_to_gb_ceil(1), 1);
        assert_eq!(bytes_to_gb_ceil(1024 * 1024 * 1024), 1);
        assert_eq!(bytes_to_gb_ceil(1024 * 1024 * 1024 + 1), 2);
    }
}
