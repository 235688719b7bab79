use std::process::ExitCode;

use clap::Parser;
use log::error;

use ramboot::cli::Cli;
use ramboot::config::RambootConfig;

fn main() -> ExitCode {
    let args = Cli::parse();

    env_logger::Builder::new().filter_level(args.log_level()).init();

    let config_path = RambootConfig::resolve_path(args.config.as_deref());
    let config = match RambootConfig::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration from '{config_path}': {e:#}");
            return ExitCode::FAILURE;
        }
    };

    match ramboot::run(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("ramboot failed: {e:#}");
            ExitCode::FAILURE
        }
    }
}
