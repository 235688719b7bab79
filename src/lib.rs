pub mod activation;
pub mod classify;
pub mod cli;
pub mod config;
pub mod error;
pub mod executor;
pub mod hide;
pub mod inventory;
pub mod migrate;
pub mod model;
pub mod planner;
pub mod probe;
pub mod replicate;

use anyhow::{bail, Context, Error};
use log::info;
use nix::unistd::Uid;

use config::RambootConfig;
use model::MountCollection;

/// Runs the full root-to-RAM transition: activation, discovery, planning,
/// execution, replication, migration, pivot, and device hiding, in that
/// order. Each stage consumes the previous stage's output; no stage mutates
/// the previous stage's data.
pub fn run(config: &RambootConfig) -> Result<(), Error> {
    if !Uid::effective().is_root() {
        bail!("ramboot must run as root");
    }

    info!("Starting activation of storage classes");
    activation::activate(config);

    info!("Building mount inventory from '{}'", config.fstab_file);
    let entries = inventory::build(config).context("Failed to build mount inventory")?;
    let all_mounts = MountCollection::from_initialized(entries).context("Invalid mount inventory")?;
    let physical = all_mounts.physical_mounts();
    let root = physical.root_mount().clone();

    info!("Planning RAM disk layout for {} physical mount(s)", physical.len());
    let plan = planner::plan(config, &physical);

    let ramdisk_base = executor::execute(&plan).context("Failed to create RAM disk")?;

    info!("Replicating mounts into the RAM disk");
    replicate::copy_all(&physical, &ramdisk_base).context("Failed to replicate mounts")?;
    replicate::rewrite_fstab(&all_mounts, &ramdisk_base).context("Failed to rewrite mount table")?;

    info!("Migrating system mounts and pivoting root");
    migrate::migrate_system_mounts(&ramdisk_base).context("Failed to migrate system mounts")?;
    migrate::pivot(&ramdisk_base).context("Failed to pivot root")?;

    hide::hide(config, &root, &physical);

    info!("Ramboot completed successfully");
    Ok(())
}
