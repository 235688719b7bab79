/// Filesystem type for a mount or mkfs invocation.
///
/// Fstab entries and `lsblk` output carry arbitrary fstype strings, so this
/// isn't a closed enum: `Other` preserves whatever Ramboot read off disk
/// verbatim, while the named variants exist so the planner and the GPT/mkfs
/// stages can match on the types they actually know how to build ramdisks
/// out of.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fstype {
    Ext2,
    Ext3,
    Ext4,
    Xfs,
    Vfat,
    Btrfs,
    Zfs,
    Iso9660,
    Tmpfs,
    Swap,
    Auto,
    Other(String),
}

impl Fstype {
    pub fn name(&self) -> &str {
        match self {
            Fstype::Ext2 => "ext2",
            Fstype::Ext3 => "ext3",
            Fstype::Ext4 => "ext4",
            Fstype::Xfs => "xfs",
            Fstype::Vfat => "vfat",
            Fstype::Btrfs => "btrfs",
            Fstype::Zfs => "zfs",
            Fstype::Iso9660 => "iso9660",
            Fstype::Tmpfs => "tmpfs",
            Fstype::Swap => "swap",
            Fstype::Auto => "auto",
            Fstype::Other(name) => name,
        }
    }

    /// Whether `mkfs.<type>` is a meaningful operation for this filesystem.
    pub fn is_formattable(&self) -> bool {
        !matches!(self, Fstype::Swap | Fstype::Auto | Fstype::Tmpfs)
    }
}

impl From<&str> for Fstype {
    fn from(value: &str) -> Self {
        match value {
            "ext2" => Fstype::Ext2,
            "ext3" => Fstype::Ext3,
            "ext4" => Fstype::Ext4,
            "xfs" => Fstype::Xfs,
            "vfat" => Fstype::Vfat,
            "btrfs" => Fstype::Btrfs,
            "zfs" | "zfs_member" => Fstype::Zfs,
            "iso9660" => Fstype::Iso9660,
            "tmpfs" => Fstype::Tmpfs,
            "swap" => Fstype::Swap,
            "auto" => Fstype::Auto,
            other => Fstype::Other(other.to_owned()),
        }
    }
}

impl std::fmt::Display for Fstype {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
