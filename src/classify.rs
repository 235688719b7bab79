use osutils::lsblk::BlockDeviceType;

use crate::{error::RambootError, probe::Probe};

/// True iff `device`'s own `lsblk` type is `lvm` or `lvm2`.
///
/// A `ProbeUnavailable` failure (missing device, non-zero probe exit) is
/// swallowed here and reported as "not LVM" — per the error-handling design,
/// classifiers catch probe failures themselves rather than letting them
/// propagate as hard errors.
pub fn is_lvm(device: &str) -> bool {
    matches!(Probe::type_of(device), Ok(BlockDeviceType::Lvm))
}

/// True iff `device`'s own `lsblk` type begins with the literal prefix `raid`.
pub fn is_raid(device: &str) -> bool {
    match Probe::type_of(device) {
        Ok(BlockDeviceType::Raid) => true,
        Ok(_) | Err(_) => false,
    }
}

/// Canonical `/dev/mapper/<name>` form for an LVM device: the first tree node
/// of type `lvm` found by descending `children[0]`.
pub fn lvm_map(device: &str) -> Result<String, RambootError> {
    Probe::first_field_matching(device, |node| {
        (node.blkdev_type == BlockDeviceType::Lvm).then(|| format!("/dev/mapper/{}", node.name))
    })?
    .ok_or_else(|| RambootError::ProbeUnavailable {
        device: device.to_owned(),
    })
}

/// Volume group name for `device`, via the LVM tool.
pub fn lvm_vg(device: &str) -> Result<String, RambootError> {
    osutils::lvm::volume_group(device)
        .map_err(|_| RambootError::ProbeUnavailable {
            device: device.to_owned(),
        })
}

/// Every disk this device ultimately sits on.
pub fn disks_of(device: &str) -> Result<Vec<String>, RambootError> {
    Probe::disks_of(device)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probe_failure_is_treated_as_not_lvm_and_not_raid() {
        assert!(!is_lvm("/dev/does-not-exist"));
        assert!(!is_raid("/dev/does-not-exist"));
    }
}
