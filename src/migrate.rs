use std::path::Path;

use anyhow::{Context, Error};
use log::info;

/// Kernel virtual mounts that must survive the pivot as live mounts, not
/// remounts: moving (rather than unmounting and remounting) preserves file
/// descriptors processes already hold open under them.
const SYSTEM_MOUNTS: &[&str] = &["dev", "proc", "sys", "run"];

/// Moves the kernel virtual mounts from the current root into the RAM-disk
/// tree. Order among the four does not matter.
pub fn migrate_system_mounts(ramdisk_base: &Path) -> Result<(), Error> {
    for name in SYSTEM_MOUNTS {
        let source = Path::new("/").join(name);
        let target = ramdisk_base.join(name);

        info!("Moving mount '{}' to '{}'", source.display(), target.display());
        osutils::mount::move_mount(&source, &target)
            .with_context(|| format!("Failed to move '{}' into the RAM disk", source.display()))?;
    }

    Ok(())
}

/// Pivots the running system's root onto the RAM disk.
pub fn pivot(ramdisk_base: &Path) -> Result<(), Error> {
    osutils::pivot::pivot_root(ramdisk_base)
}
