use crate::config::RambootConfig;
use crate::model::{MountCollection, RamdiskPartition, RamdiskPlan};

/// Builds the partition layout for the RAM disk from the physical-mount view
/// of the inventory.
///
/// Either a single-partition "simple" plan (forced by configuration, or by a
/// root filesystem whose subvolume/dataset semantics don't partition
/// cleanly) or a complex plan with one partition per physical mount.
pub fn plan(config: &RambootConfig, physical: &MountCollection) -> RamdiskPlan {
    let root = physical.root_mount();
    let force_simple = config.simple_ramdisk || matches!(root.fstype.as_str(), "zfs" | "btrfs");

    let mut plan = if force_simple {
        simple_plan(config, physical)
    } else {
        complex_plan(physical)
    };

    for partition in &mut plan.partitions {
        substitute_zfs_fstype(config, partition);
    }

    plan
}

/// Builds a single-partition plan whose one partition spans the whole RAM
/// disk: `size_gb` is padded once here, and `ramdisk_size_gb` (the total the
/// `brd` module is created with) is simply that same value, since there is
/// nothing else on the disk to add to it. Padding it again at the executor
/// would double the safety margin.
fn simple_plan(config: &RambootConfig, physical: &MountCollection) -> RamdiskPlan {
    let root = physical.root_mount();

    let size_gb = match config.ramdisk_simple_size_gb {
        Some(size) => size,
        None => padded_total_gb(simple_size_gb(physical)),
    };

    let fstype = config
        .ramdisk_simple_fstype
        .clone()
        .unwrap_or_else(|| root.fstype.clone());

    RamdiskPlan {
        partitions: vec![RamdiskPartition {
            size_gb,
            destination: "/".into(),
            order: 1,
            fstype,
        }],
        contains_lvm: physical.iter().any(|m| m.is_lvm),
        ramdisk_size_gb: size_gb,
    }
}

/// Sums parent-disk sizes across physical mounts, deduplicating by the tuple
/// of `parent_disks` so a striped configuration sharing the same disk set
/// across multiple mounts isn't counted twice.
fn simple_size_gb(physical: &MountCollection) -> u64 {
    let mut seen = Vec::new();
    let mut total = 0;

    for mount in physical.iter() {
        if seen.contains(&mount.parent_disks) {
            continue;
        }
        seen.push(mount.parent_disks.clone());
        total += mount.parent_size_gb.unwrap_or(0);
    }

    total
}

/// Builds one partition per physical mount, each keeping its own source's
/// unpadded `size_gb`. The `max(2, 5%)` safety margin from the "Final total
/// size" rule is applied once, to the sum, as `ramdisk_size_gb` — the
/// individual partitions are not inflated, only the module's overall
/// capacity.
fn complex_plan(physical: &MountCollection) -> RamdiskPlan {
    let partitions: Vec<RamdiskPartition> = physical
        .iter()
        .enumerate()
        .map(|(index, mount)| RamdiskPartition {
            size_gb: mount.size_gb.unwrap_or(0),
            destination: mount.destination.clone(),
            order: index as u32 + 1,
            fstype: mount.fstype.clone(),
        })
        .collect();

    let raw_total: u64 = partitions.iter().map(|p| p.size_gb).sum();

    RamdiskPlan {
        partitions,
        contains_lvm: physical.iter().any(|m| m.is_lvm),
        ramdisk_size_gb: padded_total_gb(raw_total),
    }
}

/// Pads `total_gb` by `max(2, 5% of total)`.
///
/// The 5% term is computed with the same `f64` truncation the original
/// implementation relies on: `(size_gb as f64 * 0.05) as u64` truncates, it
/// does not round, and IEEE-754 double rounding error in `total * 0.05` is
/// load-bearing — `60.0 * 0.05` evaluates to `2.9999999999999996`, not `3.0`,
/// so `60` pads to `62`, not `63`. Using `.floor()`/`.ceil()` here would be
/// correct-looking and wrong.
pub fn padded_total_gb(total_gb: u64) -> u64 {
    let padding = ((total_gb as f64) * 0.05) as u64;
    total_gb + padding.max(2)
}

fn substitute_zfs_fstype(config: &RambootConfig, partition: &mut RamdiskPartition) {
    if partition.fstype == "zfs" {
        partition.fstype = config.zfs_replacement_fstype.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MountEntry;

    fn physical_with(entries: Vec<MountEntry>) -> MountCollection {
        MountCollection::from_initialized(entries).unwrap()
    }

    fn initialized(
        destination: &str,
        fstype: &str,
        parent_disks: Vec<&str>,
        parent_size_gb: u64,
        size_gb: u64,
    ) -> MountEntry {
        let mut entry = MountEntry::new(
            format!("/dev/{destination}-src"),
            destination,
            fstype,
            vec!["defaults".into()],
            "0",
            "1",
        );
        entry.parent_disks = parent_disks.into_iter().map(String::from).collect();
        entry.parent_size_gb = Some(parent_size_gb);
        entry.size_gb = Some(size_gb);
        entry.initialized = true;
        entry
    }

    #[test]
    fn padding_matches_worked_examples() {
        assert_eq!(padded_total_gb(60), 62);
        assert_eq!(padded_total_gb(100), 105);
    }

    #[test]
    fn simple_plan_sums_distinct_parent_disk_tuples() {
        let config = RambootConfig::default();
        let physical = physical_with(vec![
            initialized("/", "ext4", vec!["sda"], 10, 10),
            initialized("/var", "ext4", vec!["sdb"], 20, 20),
            initialized("/home", "ext4", vec!["sdc"], 30, 30),
        ]);

        let plan = plan(&config, &physical);

        assert_eq!(plan.partitions.len(), 1);
        assert_eq!(plan.partitions[0].size_gb, 62);
        assert_eq!(plan.partitions[0].destination, "/");
    }

    #[test]
    fn simple_plan_dedups_shared_parent_disk_tuple() {
        let config = RambootConfig::default();
        let physical = physical_with(vec![
            initialized("/", "ext4", vec!["sda", "sdb"], 100, 100),
            initialized("/var", "ext4", vec!["sda", "sdb"], 100, 100),
        ]);

        let plan = plan(&config, &physical);

        assert_eq!(plan.partitions[0].size_gb, 105);
    }

    #[test]
    fn simple_plan_honors_explicit_size_and_fstype_overrides() {
        let mut config = RambootConfig::default();
        config.ramdisk_simple_size_gb = Some(40);
        config.ramdisk_simple_fstype = Some("xfs".into());
        let physical = physical_with(vec![initialized("/", "ext4", vec!["sda"], 10, 10)]);

        let plan = plan(&config, &physical);

        assert_eq!(plan.partitions[0].size_gb, 40);
        assert_eq!(plan.partitions[0].fstype, "xfs");
    }

    #[test]
    fn btrfs_root_forces_simple_plan_even_when_complex_requested() {
        let mut config = RambootConfig::default();
        config.simple_ramdisk = false;
        let physical = physical_with(vec![
            initialized("/", "btrfs", vec!["sda"], 10, 10),
            initialized("/home", "btrfs", vec!["sda"], 10, 10),
        ]);

        let plan = plan(&config, &physical);

        assert_eq!(plan.partitions.len(), 1);
    }

    #[test]
    fn zfs_root_substitutes_configured_fstype() {
        let config = RambootConfig::default();
        let physical = physical_with(vec![initialized("/", "zfs", vec!["sda"], 10, 10)]);

        let plan = plan(&config, &physical);

        assert_eq!(plan.partitions[0].fstype, "ext4");
    }

    #[test]
    fn complex_plan_mirrors_source_mounts_with_contiguous_order() {
        let mut config = RambootConfig::default();
        config.simple_ramdisk = false;
        let physical = physical_with(vec![
            initialized("/", "ext4", vec!["sda"], 10, 10),
            initialized("/var", "xfs", vec!["sdb"], 20, 20),
        ]);

        let plan = plan(&config, &physical);

        assert_eq!(plan.partitions.len(), 2);
        assert_eq!(plan.partitions[0].order, 1);
        assert_eq!(plan.partitions[1].order, 2);
        assert_eq!(plan.partitions[1].destination, "/var");
        assert_eq!(plan.total_size_gb(), 30);
        // The per-partition sizes stay raw; only the module total is padded.
        assert_eq!(plan.ramdisk_size_gb, 32);
    }

    #[test]
    fn simple_plan_module_total_is_not_padded_twice() {
        let config = RambootConfig::default();
        let physical = physical_with(vec![
            initialized("/", "ext4", vec!["sda"], 10, 10),
            initialized("/var", "ext4", vec!["sdb"], 20, 20),
            initialized("/home", "ext4", vec!["sdc"], 30, 30),
        ]);

        let plan = plan(&config, &physical);

        assert_eq!(plan.partitions[0].size_gb, 62);
        assert_eq!(plan.ramdisk_size_gb, 62, "module total must equal the partition size, not be padded again");
    }
}
