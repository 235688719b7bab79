use anyhow::{Context, Error};

use crate::dependencies::Dependency;

/// Name of the single `brd` device Ramboot ever creates: `rd_nr=1` means the
/// kernel only ever hands back `/dev/ram0`.
pub const DEVICE: &str = "/dev/ram0";

/// Loads the `brd` RAM-block-device kernel module, sized for `num_partitions`
/// partitions and `size_gb` gigabytes total.
///
/// `rd_size` is specified in kibibytes, hence the `* 1024 * 1024` (GiB to
/// KiB) rather than the more common MiB-to-KiB `* 1024`.
pub fn create(size_gb: u64, num_partitions: u32) -> Result<(), Error> {
    Dependency::Modprobe
        .cmd()
        .arg("brd")
        .arg("rd_nr=1")
        .arg(format!("max_part={num_partitions}"))
        .arg(format!("rd_size={}", size_gb * 1024 * 1024))
        .run_and_check()
        .with_context(|| format!("Failed to load brd module for {size_gb}G/{num_partitions} partitions"))
}

/// Partition device node for the `order`-th partition of the RAM disk.
pub fn partition_path(order: u32) -> String {
    format!("{DEVICE}p{order}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partition_path_matches_kernel_naming() {
        assert_eq!(partition_path(1), "/dev/ram0p1");
        assert_eq!(partition_path(3), "/dev/ram0p3");
    }
}
