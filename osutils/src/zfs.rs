use anyhow::{Context, Error};

use crate::dependencies::Dependency;

/// Imports every importable ZFS pool, the early-boot equivalent of attaching
/// every disk-backed volume group.
pub fn import_all() -> Result<(), Error> {
    Dependency::Zpool
        .cmd()
        .arg("import")
        .arg("-a")
        .run_and_check()
        .context("Failed to run zpool import -a")
}

/// Lists every ZFS dataset as `(name, mountpoint)` pairs, in the order `zfs
/// list` reports them (later entries win ties on destination).
pub fn list_datasets() -> Result<Vec<(String, String)>, Error> {
    let raw = Dependency::Zfs
        .cmd()
        .arg("list")
        .arg("-H")
        .arg("-o")
        .arg("name,mountpoint")
        .output_and_check()
        .context("Failed to run zfs list")?;

    Ok(raw
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            Some((parts.next()?.to_owned(), parts.next()?.to_owned()))
        })
        .collect())
}

/// Returns the size, in whole gigabytes, of `pool`.
pub fn pool_size_gb(pool: &str) -> Result<u64, Error> {
    let raw = Dependency::Zpool
        .cmd()
        .arg("list")
        .arg("-H")
        .arg("-o")
        .arg("size")
        .arg("-p")
        .arg(pool)
        .output_and_check()
        .with_context(|| format!("Failed to query size of zpool '{pool}'"))?;

    let bytes: f64 = raw
        .trim()
        .parse()
        .with_context(|| format!("Failed to parse zpool size '{}'", raw.trim()))?;

    Ok((bytes / 1024f64.powi(3)).ceil() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_dataset_listing() {
        let raw = "rpool/ROOT\t/\nrpool/home\t/home\nrpool/tmp\tnone\n";
        let parsed: Vec<(String, String)> = raw
            .lines()
            .filter_map(|line| {
                let mut parts = line.split_whitespace();
                Some((parts.next()?.to_owned(), parts.next()?.to_owned()))
            })
            .collect();
        assert_eq!(
            parsed,
            vec![
                ("rpool/ROOT".to_owned(), "/".to_owned()),
                ("rpool/home".to_owned(), "/home".to_owned()),
                ("rpool/tmp".to_owned(), "none".to_owned()),
            ]
        );
    }
}
