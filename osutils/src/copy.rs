use std::path::Path;

use anyhow::{Context, Error};

use crate::dependencies::Dependency;

/// Archive-copies `source` into `destination` via `cp --archive --one-file-system`.
///
/// Callers are responsible for the trailing `/.` convention: passing a source
/// of `<dir>/.` copies `<dir>`'s contents into an already-existing
/// `destination` rather than creating `destination/<dir>` — `cp` without the
/// trailing `/.` behaves differently when the destination already exists.
pub fn archive_copy(source: impl AsRef<Path>, destination: impl AsRef<Path>) -> Result<(), Error> {
    Dependency::Cp
        .cmd()
        .arg("--archive")
        .arg("--one-file-system")
        .arg(source.as_ref())
        .arg(destination.as_ref())
        .run_and_check()
        .with_context(|| {
            format!(
                "Failed to copy '{}' to '{}'",
                source.as_ref().display(),
                destination.as_ref().display()
            )
        })
}
