use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Error};

use crate::{dependencies::Dependency, files, filesystems::Fstype};

/// Mounts a device or file at `mount_dir`.
pub fn mount(
    path: impl AsRef<Path>,
    mount_dir: impl AsRef<Path>,
    filesystem: &Fstype,
    options: &[String],
) -> Result<(), Error> {
    let mut options = options.to_owned();
    let mut cmd = Dependency::Mount.cmd();

    if path.as_ref().is_file() {
        options.push("loop".into());
    }

    if !options.is_empty() {
        cmd.arg("-o").arg(options.join(","));
    }

    cmd.arg("-t")
        .arg(filesystem.name())
        .arg(path.as_ref())
        .arg(mount_dir.as_ref())
        .run_and_check()
        .with_context(|| {
            format!(
                "Failed to mount {} to path {}",
                path.as_ref().display(),
                mount_dir.as_ref().display(),
            )
        })?;

    Ok(())
}

/// Moves an already-mounted kernel virtual filesystem from `source` to
/// `target` without unmounting it, preserving the live mount for processes
/// that already have file descriptors open under it.
pub fn move_mount(source: impl AsRef<Path>, target: impl AsRef<Path>) -> Result<(), Error> {
    Dependency::Mount
        .cmd()
        .arg("--move")
        .arg(source.as_ref())
        .arg(target.as_ref())
        .run_and_check()
        .with_context(|| {
            format!(
                "Failed to move mount {} to {}",
                source.as_ref().display(),
                target.as_ref().display(),
            )
        })
}

/// Unmounts `mount_dir`, optionally recursively and lazily (the latter
/// detaches the mount point immediately and releases it once it's no longer
/// busy, which is what the final `pivot_root` cleanup relies on).
pub fn umount(mount_dir: impl AsRef<Path>, recursive: bool, lazy: bool) -> Result<(), Error> {
    let mut cmd = Dependency::Umount.cmd();
    if recursive {
        cmd.arg("-R");
    }
    if lazy {
        cmd.arg("--lazy");
    }

    cmd.arg(mount_dir.as_ref())
        .run_and_check()
        .with_context(|| format!("Failed to unmount directory {}", mount_dir.as_ref().display()))
}

/// Force-unmounts `mount_dir`, for tearing down a temporary replication
/// source mount even if something still appears to be using it.
pub fn force_umount(mount_dir: impl AsRef<Path>) -> Result<(), Error> {
    Dependency::Umount
        .cmd()
        .arg("--force")
        .arg(mount_dir.as_ref())
        .run_and_check()
        .with_context(|| format!("Failed to force-unmount directory {}", mount_dir.as_ref().display()))
}

/// Ensures that `target_path` is a suitable, empty directory to mount onto.
pub fn ensure_mount_directory(target_path: &Path) -> Result<(), Error> {
    if target_path.exists() {
        if !target_path.is_dir() {
            bail!("Mount path '{}' is not a directory", target_path.display());
        }
        if let Ok(entries) = fs::read_dir(target_path) {
            if entries.count() > 0 {
                bail!("Mount path '{}' is not empty", target_path.display());
            }
        }
    } else {
        files::create_dirs(target_path)
            .with_context(|| format!("Failed to create mount path '{}'", target_path.display()))?;
    }

    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    use std::fs::File;

    use tempfile::TempDir;

    #[test]
    fn test_ensure_mount_directory() {
        let temp_mount_dir = TempDir::new().unwrap();

        ensure_mount_directory(temp_mount_dir.path()).unwrap();

        let temp_mount_point_dir = temp_mount_dir.path().join("temp_dir");
        ensure_mount_directory(&temp_mount_point_dir).unwrap();
        assert!(temp_mount_point_dir.exists());

        assert_eq!(
            ensure_mount_directory(temp_mount_dir.path())
                .unwrap_err()
                .to_string(),
            format!(
                "Mount path '{}' is not empty",
                temp_mount_dir.path().display()
            )
        );

        let temp_mount_point_file = temp_mount_dir.path().join("temp_file");
        File::create(&temp_mount_point_file).unwrap();
        assert_eq!(
            ensure_mount_directory(&temp_mount_point_file)
                .unwrap_err()
                .to_string(),
            format!(
                "Mount path '{}' is not a directory",
                temp_mount_point_file.display()
            )
        );
    }
}
