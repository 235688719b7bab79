use crate::error::RambootError;

/// Filesystems that never back a real, independently-mountable block device.
pub const SOFT_FSTYPES: &[&str] = &["swap", "tmpfs", "ramfs"];

/// Network filesystems: no local partition, parent disk, or size to resolve.
pub const REMOTE_FSTYPES: &[&str] = &["nfs", "nfs4", "cifs", "fuse.s3fs", "fuse.ceph"];

/// One mount, carrying both its declared fstab fields and (once
/// `initialized`) the attributes discovered by probing the block layer.
///
/// Declared fields are set at construction and never change. Discovered
/// fields start empty and are populated exactly once by `MountCollection`'s
/// construction step; nothing re-derives or memoizes them afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountEntry {
    pub source: String,
    pub destination: String,
    pub fstype: String,
    pub options: Vec<String>,
    pub dump: String,
    pub fsck_order: String,

    pub uuid: Option<String>,
    pub label: Option<String>,
    pub part_uuid: Option<String>,

    pub is_lvm: bool,
    pub is_raid: bool,
    pub canonical_source: Option<String>,
    pub partitions: Vec<String>,
    pub parent_disks: Vec<String>,
    pub size_gb: Option<u64>,
    pub parent_size_gb: Option<u64>,
    pub initialized: bool,
}

impl MountEntry {
    /// Builds an entry straight from its six declared fstab fields, with all
    /// discovered attributes left empty until `initialize()` runs.
    pub fn new(
        source: impl Into<String>,
        destination: impl Into<String>,
        fstype: impl Into<String>,
        options: Vec<String>,
        dump: impl Into<String>,
        fsck_order: impl Into<String>,
    ) -> Self {
        MountEntry {
            source: source.into(),
            destination: destination.into(),
            fstype: fstype.into(),
            options,
            dump: dump.into(),
            fsck_order: fsck_order.into(),
            uuid: None,
            label: None,
            part_uuid: None,
            is_lvm: false,
            is_raid: false,
            canonical_source: None,
            partitions: Vec::new(),
            parent_disks: Vec::new(),
            size_gb: None,
            parent_size_gb: None,
            initialized: false,
        }
    }

    /// Parses one non-blank, non-comment fstab line into a declared-fields-only
    /// entry. Fails with `ParseFailure` unless the line has exactly six
    /// whitespace-separated fields.
    pub fn from_fstab_line(line: &str) -> Result<Self, RambootError> {
        let fields: Vec<&str> = line.split_whitespace().collect();
        let [source, destination, fstype, options, dump, fsck_order] = fields[..] else {
            return Err(RambootError::ParseFailure {
                line: line.to_owned(),
            });
        };

        Ok(MountEntry::new(
            source,
            destination,
            fstype,
            options.split(',').map(str::to_owned).collect(),
            dump,
            fsck_order,
        ))
    }

    /// Serializes the six declared fields back to a tab-separated fstab line.
    pub fn to_fstab_line(&self) -> String {
        format!(
            "{}\t{}\t{}\t{}\t{}\t{}",
            self.source,
            self.destination,
            self.fstype,
            self.options.join(","),
            self.dump,
            self.fsck_order,
        )
    }

    pub fn is_root(&self) -> bool {
        self.destination == "/"
    }

    pub fn is_remote(&self) -> bool {
        REMOTE_FSTYPES.contains(&self.fstype.as_str())
    }

    pub fn is_soft(&self) -> bool {
        SOFT_FSTYPES.contains(&self.fstype.as_str())
    }

    /// True unless this is a soft or remote mount — root is always physical
    /// regardless of its declared fstype.
    pub fn is_physical(&self) -> bool {
        self.is_root() || (!self.is_soft() && !self.is_remote())
    }

    /// Mount-point nesting depth: `/` is 1, `/var` is 2, `/var/log` is 3. A
    /// destination with no path separator at all sorts to infinity (last).
    pub fn depth(&self) -> f64 {
        depth(&self.destination)
    }

    /// Populates the identity fields (`uuid`/`label`/`part_uuid`) by
    /// inspecting the declared `source`. Idempotent and side-effect free;
    /// called once during construction.
    pub fn resolve_identity(&mut self) {
        if let Some(rest) = self.source.strip_prefix("/dev/disk/by-uuid/") {
            self.uuid = Some(rest.to_owned());
        } else if let Some(rest) = strip_prefix_ci(&self.source, "UUID=") {
            self.uuid = Some(rest.to_owned());
        }

        if let Some(rest) = self.source.strip_prefix("/dev/disk/by-partuuid/") {
            self.part_uuid = Some(rest.to_owned());
        } else if let Some(rest) = strip_prefix_ci(&self.source, "PARTUUID=") {
            self.part_uuid = Some(rest.to_owned());
        }

        if let Some(rest) = self.source.strip_prefix("/dev/disk/by-label/") {
            self.label = Some(rest.to_owned());
        } else if let Some(rest) = strip_prefix_ci(&self.source, "LABEL=") {
            self.label = Some(rest.to_owned());
        }
    }

    /// Computes `canonical_source` in UUID → PARTUUID → LABEL → original
    /// priority order.
    pub fn canonicalize_source(&mut self) {
        self.canonical_source = Some(if let Some(uuid) = &self.uuid {
            format!("/dev/disk/by-uuid/{uuid}")
        } else if let Some(part_uuid) = &self.part_uuid {
            format!("/dev/disk/by-partuuid/{part_uuid}")
        } else if let Some(label) = &self.label {
            format!("/dev/disk/by-label/{label}")
        } else {
            self.source.clone()
        });
    }
}

fn strip_prefix_ci<'a>(haystack: &'a str, prefix: &str) -> Option<&'a str> {
    if haystack.len() >= prefix.len() && haystack[..prefix.len()].eq_ignore_ascii_case(prefix) {
        Some(&haystack[prefix.len()..])
    } else {
        None
    }
}

/// Depth of an fstab destination path. `/` is depth 1; an extra path
/// component adds one; a path with no separator at all is unparseable as a
/// mount nesting level and sorts last.
pub fn depth(destination: &str) -> f64 {
    if destination == "/" {
        return 1.0;
    }

    let trimmed = destination.trim_end_matches('/');
    let separators = trimmed.matches('/').count();

    if separators == 0 {
        f64::INFINITY
    } else {
        (separators + 1) as f64
    }
}

/// A discovered ZFS dataset, projected into a `MountEntry` via
/// `into_mount_entry` rather than through inheritance — the sum-type
/// `Source = Fstab | Zfs` the design calls for is expressed as two distinct
/// construction paths converging on one enriched record type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZfsVolume {
    pub name: String,
    pub destination: String,
    pub order: usize,
    pub pool: String,
    pub size_gb: u64,
}

impl ZfsVolume {
    pub fn into_mount_entry(self) -> MountEntry {
        let mut entry = MountEntry::new(self.name.clone(), self.destination, "zfs", Vec::new(), "0", "0");
        entry.is_lvm = false;
        entry.is_raid = false;
        entry.partitions = vec![self.name];
        entry.size_gb = Some(self.size_gb);
        entry.parent_disks = vec![self.pool];
        entry.parent_size_gb = Some(self.size_gb);
        entry.initialized = true;
        entry
    }
}

/// Ordered, deduplicated, depth-sorted collection of mounts.
///
/// Construction always retains the root entry, drops later duplicates that
/// share a destination with an earlier one, initializes every retained entry
/// exactly once, then sorts shallow-to-deep. Iteration order is load-bearing:
/// copy, mount, and unmount correctness all depend on parents appearing
/// before their children.
#[derive(Debug, Clone)]
pub struct MountCollection {
    entries: Vec<MountEntry>,
}

impl MountCollection {
    /// Builds a collection from already-`initialize`d entries, applying only
    /// the dedup-then-sort rules (used when entries are pre-initialized, e.g.
    /// the ZFS-derived set, which the inventory constructs once up front).
    pub fn from_initialized(entries: Vec<MountEntry>) -> Result<Self, RambootError> {
        if !entries.iter().any(MountEntry::is_root) {
            return Err(RambootError::InvariantViolation(
                "no root mount (destination \"/\") present in inventory".into(),
            ));
        }

        let mut retained: Vec<MountEntry> = Vec::with_capacity(entries.len());
        for entry in entries {
            if !retained.iter().any(|e| e.destination == entry.destination) {
                retained.push(entry);
            }
        }

        retained.sort_by(|a, b| a.depth().partial_cmp(&b.depth()).unwrap());

        Ok(MountCollection { entries: retained })
    }

    pub fn iter(&self) -> impl Iterator<Item = &MountEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn as_slice(&self) -> &[MountEntry] {
        &self.entries
    }

    pub fn into_vec(self) -> Vec<MountEntry> {
        self.entries
    }

    /// A new collection containing only physical entries.
    pub fn physical_mounts(&self) -> MountCollection {
        MountCollection {
            entries: self.entries.iter().filter(|e| e.is_physical()).cloned().collect(),
        }
    }

    pub fn root_mount(&self) -> &MountEntry {
        self.entries
            .iter()
            .find(|e| e.is_root())
            .expect("MountCollection invariant: root mount always present")
    }
}

/// One partition in a RAM-disk plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RamdiskPartition {
    pub size_gb: u64,
    pub destination: String,
    pub order: u32,
    pub fstype: String,
}

/// A sequence of `RamdiskPartition`, sorted by `order`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RamdiskPlan {
    pub partitions: Vec<RamdiskPartition>,
    /// Whether any source partition folded into this plan was LVM-backed.
    /// Unused by the core pipeline; preserved for downstream extension.
    pub contains_lvm: bool,
    /// Total capacity to request from the `brd` kernel module: the sum of
    /// partition sizes, padded once by `max(2, 5%)`. Computed by the planner
    /// and not re-derived downstream — for a simple plan this already equals
    /// the single partition's own (padded) size, so padding it again at the
    /// executor would double-count the safety margin.
    pub ramdisk_size_gb: u64,
}

impl RamdiskPlan {
    pub fn total_size_gb(&self) -> u64 {
        self.partitions.iter().map(|p| p.size_gb).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn depth_table() {
        assert_eq!(depth("/"), 1.0);
        assert_eq!(depth("/var"), 2.0);
        assert_eq!(depth("/var/log"), 3.0);
        assert_eq!(depth("/var/log/"), 3.0);
        assert!(depth("noslash").is_infinite());
    }

    #[test]
    fn fstab_round_trip() {
        let line = "UUID=abc\t/\text4\tdefaults,noatime\t0\t1";
        let entry = MountEntry::from_fstab_line(line).unwrap();
        let reparsed = MountEntry::from_fstab_line(&entry.to_fstab_line()).unwrap();
        assert_eq!(entry.source, reparsed.source);
        assert_eq!(entry.destination, reparsed.destination);
        assert_eq!(entry.fstype, reparsed.fstype);
        assert_eq!(entry.options, reparsed.options);
        assert_eq!(entry.dump, reparsed.dump);
        assert_eq!(entry.fsck_order, reparsed.fsck_order);
    }

    #[test]
    fn rejects_malformed_lines() {
        assert!(MountEntry::from_fstab_line("only three fields here").is_err());
    }

    #[test]
    fn is_physical_rules() {
        let root = MountEntry::new("UUID=x", "/", "ext4", vec![], "0", "1");
        assert!(root.is_physical());

        let swap = MountEntry::new("/dev/sda2", "none", "swap", vec![], "0", "0");
        assert!(!swap.is_physical());

        let nfs = MountEntry::new("server:/export", "/data", "nfs", vec![], "0", "0");
        assert!(!nfs.is_physical());

        // A root mount is always physical even if its fstype is in the soft set.
        let odd_root = MountEntry::new("tmpfs", "/", "tmpfs", vec![], "0", "0");
        assert!(odd_root.is_physical());
    }

    #[test]
    fn identity_resolution_priority() {
        let mut entry = MountEntry::new("UUID=abc-123", "/", "ext4", vec![], "0", "1");
        entry.resolve_identity();
        entry.canonicalize_source();
        assert_eq!(entry.uuid.as_deref(), Some("abc-123"));
        assert_eq!(
            entry.canonical_source.as_deref(),
            Some("/dev/disk/by-uuid/abc-123")
        );
    }

    #[test]
    fn collection_dedups_first_wins_and_sorts_by_depth() {
        let deep = MountEntry::new("/dev/sdb1", "/var/log", "ext4", vec![], "0", "2");
        let shallow_dup = MountEntry::new("/dev/sdb2", "/var/log", "ext4", vec![], "0", "2");
        let root = MountEntry::new("UUID=x", "/", "ext4", vec![], "0", "1");
        let var = MountEntry::new("/dev/sdc1", "/var", "ext4", vec![], "0", "2");

        let collection =
            MountCollection::from_initialized(vec![deep.clone(), shallow_dup, root.clone(), var.clone()])
                .unwrap();

        let destinations: Vec<&str> = collection.iter().map(|e| e.destination.as_str()).collect();
        assert_eq!(destinations, vec!["/", "/var", "/var/log"]);
        assert_eq!(collection.iter().find(|e| e.destination == "/var/log").unwrap().source, deep.source);
    }

    #[test]
    fn missing_root_is_invariant_violation() {
        let only_var = MountEntry::new("/dev/sdc1", "/var", "ext4", vec![], "0", "2");
        assert!(MountCollection::from_initialized(vec![only_var]).is_err());
    }

    #[test]
    fn zfs_volume_projects_into_mount_entry() {
        let vol = ZfsVolume {
            name: "rpool/ROOT".into(),
            destination: "/".into(),
            order: 0,
            pool: "rpool".into(),
            size_gb: 40,
        };
        let entry = vol.into_mount_entry();
        assert_eq!(entry.fstype, "zfs");
        assert!(entry.initialized);
        assert_eq!(entry.size_gb, Some(40));
        assert_eq!(entry.parent_disks, vec!["rpool"]);
    }
}
