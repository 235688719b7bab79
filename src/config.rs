use std::{env, path::Path};

use anyhow::{Context, Error};
use configparser::ini::Ini;

const DEFAULT_CONFIG_PATH: &str = "/etc/ramboot.conf";
const DEFAULT_ZFS_REPLACEMENT_FSTYPE: &str = "ext4";
const DEFAULT_FSTAB_FILE: &str = "/etc/fstab";

/// Process-wide, read-only configuration, loaded once at startup.
///
/// There is no lazy re-read and no global mutable state: `load()` produces a
/// single immutable value that the caller threads through the rest of the
/// pipeline explicitly.
#[derive(Debug, Clone)]
pub struct RambootConfig {
    pub simple_ramdisk: bool,
    pub hide_disks: bool,
    pub ramdisk_simple_size_gb: Option<u64>,
    pub ramdisk_simple_fstype: Option<String>,
    pub zfs_replacement_fstype: String,
    pub activate_raid: bool,
    pub activate_zfs: bool,
    pub activate_btrfs: bool,
    pub activate_lvm: bool,
    pub fstab_file: String,
    pub ignored_mounts: Vec<String>,
}

impl Default for RambootConfig {
    fn default() -> Self {
        RambootConfig {
            simple_ramdisk: true,
            hide_disks: false,
            ramdisk_simple_size_gb: None,
            ramdisk_simple_fstype: None,
            zfs_replacement_fstype: DEFAULT_ZFS_REPLACEMENT_FSTYPE.into(),
            activate_raid: true,
            activate_zfs: true,
            activate_btrfs: true,
            activate_lvm: true,
            fstab_file: DEFAULT_FSTAB_FILE.into(),
            ignored_mounts: Vec::new(),
        }
    }
}

impl RambootConfig {
    /// Resolves the config file path: an explicit override (from `-c`/`--config`),
    /// else `RAMBOOT_CONFIG`, else the well-known default.
    pub fn resolve_path(override_path: Option<&str>) -> String {
        override_path
            .map(str::to_owned)
            .or_else(|| env::var("RAMBOOT_CONFIG").ok())
            .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_owned())
    }

    /// Loads configuration from `path`. A missing file is not an error: every
    /// key has a documented default, so an absent config file is equivalent to
    /// one with no sections at all.
    pub fn load(path: &str) -> Result<Self, Error> {
        if !Path::new(path).exists() {
            return Ok(RambootConfig::default());
        }

        let mut ini = Ini::new();
        ini.load(path)
            .map_err(|e| anyhow::anyhow!("Failed to parse config file '{path}': {e}"))?;

        let defaults = RambootConfig::default();

        let simple_ramdisk = getbool(&ini, "main", "simple_ramdisk", defaults.simple_ramdisk)?;
        let hide_disks = getbool(&ini, "main", "hide_disks", defaults.hide_disks)?;

        let ramdisk_simple_size_gb = ini
            .getuint("ramdisk_simple", "size_gb")
            .map_err(|e| anyhow::anyhow!("Invalid 'ramdisk_simple.size_gb': {e}"))?;
        let ramdisk_simple_fstype = ini.get("ramdisk_simple", "fstype");
        let zfs_replacement_fstype = ini
            .get("ramdisk_simple", "zfs_replacement_fstype")
            .unwrap_or_else(|| defaults.zfs_replacement_fstype.clone());

        let activate_raid = getbool(&ini, "activations", "raid", defaults.activate_raid)?;
        let activate_zfs = getbool(&ini, "activations", "zfs", defaults.activate_zfs)?;
        let activate_btrfs = getbool(&ini, "activations", "btrfs", defaults.activate_btrfs)?;
        let activate_lvm = getbool(&ini, "activations", "lvm", defaults.activate_lvm)?;

        let fstab_file = ini
            .get("mounts", "fstab_file")
            .unwrap_or(defaults.fstab_file);
        let ignored_mounts = match ini.get("mounts", "ignored_mounts") {
            Some(raw) => serde_json::from_str(&raw)
                .with_context(|| format!("Failed to parse 'mounts.ignored_mounts' as a JSON list: '{raw}'"))?,
            None => Vec::new(),
        };

        Ok(RambootConfig {
            simple_ramdisk,
            hide_disks,
            ramdisk_simple_size_gb,
            ramdisk_simple_fstype,
            zfs_replacement_fstype,
            activate_raid,
            activate_zfs,
            activate_btrfs,
            activate_lvm,
            fstab_file,
            ignored_mounts,
        })
    }

    pub fn activation_enabled(&self, name: &str) -> bool {
        match name {
            "raid" => self.activate_raid,
            "zfs" => self.activate_zfs,
            "btrfs" => self.activate_btrfs,
            "lvm" => self.activate_lvm,
            _ => false,
        }
    }
}

/// Reads a boolean key via `configparser`'s own bool coercion, explicitly
/// normalized to `bool` rather than the original's stringly-typed `get` with
/// a string fallback. Setting `raid = false` disables the step; an absent key
/// uses `default`.
fn getbool(ini: &Ini, section: &str, key: &str, default: bool) -> Result<bool, Error> {
    ini.getbool(section, key)
        .map_err(|e| anyhow::anyhow!("Invalid boolean for '{section}.{key}': {e}"))
        .map(|v| v.unwrap_or(default))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn missing_file_uses_defaults() {
        let config = RambootConfig::load("/nonexistent/ramboot.conf").unwrap();
        assert!(config.simple_ramdisk);
        assert!(!config.hide_disks);
        assert_eq!(config.fstab_file, "/etc/fstab");
        assert!(config.ignored_mounts.is_empty());
    }

    #[test]
    fn explicit_false_disables_activation() {
        let file = write_config(
            "[activations]\nraid = false\nzfs = true\n",
        );
        let config = RambootConfig::load(file.path().to_str().unwrap()).unwrap();
        assert!(!config.activation_enabled("raid"));
        assert!(config.activation_enabled("zfs"));
        // lvm/btrfs were never set, so they keep their documented default.
        assert!(config.activation_enabled("lvm"));
        assert!(config.activation_enabled("btrfs"));
    }

    #[test]
    fn parses_ignored_mounts_json_list() {
        let file = write_config("[mounts]\nignored_mounts = [\"/scratch\", \"/data\"]\n");
        let config = RambootConfig::load(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.ignored_mounts, vec!["/scratch", "/data"]);
    }

    #[test]
    fn hide_disks_true_is_true_not_inverted() {
        let file = write_config("[main]\nhide_disks = true\n");
        let config = RambootConfig::load(file.path().to_str().unwrap()).unwrap();
        assert!(config.hide_disks);
    }
}
