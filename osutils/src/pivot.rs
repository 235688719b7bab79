use std::{fs, path::Path, process::Command};

use anyhow::{bail, Context, Error};
use log::info;

use crate::{exe::RunAndCheck, mount};

const OLD_ROOT: &str = "oldroot";

/// Pivots the running system's root onto `new_root`.
///
/// Changes the process's working directory to `new_root`, then invokes
/// `./usr/sbin/pivot_root` — a *relative* path, resolved against the new
/// working directory rather than `$PATH` — so the binary that actually runs
/// is the new root's own copy, not whatever the old root happened to have at
/// an absolute `/usr/sbin/pivot_root`. The old root ends up bind-mounted at
/// `new_root/oldroot`, which is then lazily and recursively unmounted and,
/// on success, removed.
pub fn pivot_root(new_root: &Path) -> Result<(), Error> {
    std::env::set_current_dir(new_root)
        .with_context(|| format!("Failed to change directory into '{}'", new_root.display()))?;

    let old_root = Path::new(OLD_ROOT);
    if !old_root.exists() {
        fs::create_dir(old_root)
            .with_context(|| format!("Failed to create '{}'", old_root.display()))?;
    }

    let binary = Path::new("./usr/sbin/pivot_root");
    if !binary.exists() {
        bail!(
            "pivot_root binary not found at '{}' inside the new root",
            binary.display()
        );
    }

    info!("Pivoting root to '{}'", new_root.display());
    Command::new(binary)
        .arg(".")
        .arg(OLD_ROOT)
        .run_and_check()
        .context("pivot_root syscall failed")?;

    mount::umount(old_root, true, true)
        .context("Failed to lazily, recursively unmount the old root")?;

    // Best-effort: the lazy unmount may not have fully detached yet.
    let _ = fs::remove_dir(old_root);

    Ok(())
}
