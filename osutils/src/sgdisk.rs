use std::path::Path;

use anyhow::{Context, Error};

use crate::dependencies::Dependency;

/// A single partition to be created on a RAM block device, in creation order.
pub struct PartitionSpec {
    /// 1-based creation order, passed straight through to `sgdisk --new`.
    pub order: u32,
    /// Partition size in whole gibibytes.
    pub size_gib: u64,
}

/// Wipes any pre-existing partition table on `device` and lays out a fresh GPT
/// with one partition per entry in `partitions`, in order.
///
/// Ramboot always builds brand-new ram block devices, so there is never a
/// table worth preserving: `--zap-all` runs unconditionally before the first
/// `--new`.
pub fn partition(device: &Path, partitions: &[PartitionSpec]) -> Result<(), Error> {
    Dependency::Sgdisk
        .cmd()
        .arg("--zap-all")
        .arg(device)
        .run_and_check()
        .with_context(|| format!("Failed to zap partition table on '{}'", device.display()))?;

    for spec in partitions {
        Dependency::Sgdisk
            .cmd()
            .arg(format!("--new={}::+{}G", spec.order, spec.size_gib))
            .arg(device)
            .run_and_check()
            .with_context(|| {
                format!(
                    "Failed to create partition {} of size {}G on '{}'",
                    spec.order,
                    spec.size_gib,
                    device.display()
                )
            })?;
    }

    Ok(())
}
