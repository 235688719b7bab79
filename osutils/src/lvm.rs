use anyhow::{Context, Error};

use crate::dependencies::Dependency;

/// Activates every volume group on the system and asks device-mapper to
/// create the corresponding `/dev/mapper/*` nodes.
///
/// Mirrors the two-command activation sequence every LVM-aware bootstrapper
/// runs before touching logical volumes: `vgchange -a y` brings the VGs
/// online, `vgscan --mknodes` guarantees the nodes actually exist under
/// `/dev/mapper` afterwards.
pub fn activate_vgs() -> Result<(), Error> {
    Dependency::Vgchange
        .cmd()
        .arg("-a")
        .arg("y")
        .run_and_check()
        .context("Failed to run vgchange -a y")?;

    Dependency::Vgscan
        .cmd()
        .arg("--mknodes")
        .run_and_check()
        .context("Failed to run vgscan --mknodes")
}

/// Returns the volume group name backing `device`.
pub fn volume_group(device: &str) -> Result<String, Error> {
    Dependency::Lvs
        .cmd()
        .arg("--noheadings")
        .arg("--options")
        .arg("vg_name")
        .arg(device)
        .output_and_check()
        .map(|s| s.trim().to_owned())
        .with_context(|| format!("Failed to query volume group for '{device}'"))
}

/// Returns the physical volume backing volume group `vg`.
pub fn physical_volume(vg: &str) -> Result<String, Error> {
    Dependency::Vgs
        .cmd()
        .arg("--noheadings")
        .arg("--options")
        .arg("pv_name")
        .arg(vg)
        .output_and_check()
        .map(|s| s.trim().to_owned())
        .with_context(|| format!("Failed to query physical volume for volume group '{vg}'"))
}

/// Returns the size, in whole gigabytes, of the logical volume at `device`.
pub fn logical_volume_size_gb(device: &str) -> Result<u64, Error> {
    let raw = Dependency::Lvs
        .cmd()
        .arg("--noheadings")
        .arg("--options")
        .arg("lv_size")
        .arg("--units")
        .arg("g")
        .arg("--nosuffix")
        .arg(device)
        .output_and_check()
        .with_context(|| format!("Failed to query logical volume size for '{device}'"))?;

    let size: f64 = raw
        .trim()
        .parse()
        .with_context(|| format!("Failed to parse logical volume size '{}'", raw.trim()))?;

    Ok(size.ceil() as u64)
}
