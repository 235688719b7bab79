use clap::Parser;
use log::LevelFilter;

/// Transitions the running machine's root filesystem onto RAM.
///
/// Takes no subcommands and no required arguments: the entire flow runs to
/// completion, or fails, in a single invocation.
#[derive(Parser, Debug)]
#[command(name = "ramboot")]
#[command(about = "Moves the running root filesystem onto a RAM-backed disk", long_about = None)]
pub struct Cli {
    /// Increases log verbosity; repeat for more detail (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Overrides the configuration file path (defaults to `RAMBOOT_CONFIG` or
    /// `/etc/ramboot.conf`).
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<String>,
}

impl Cli {
    pub fn log_level(&self) -> LevelFilter {
        match self.verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_count_maps_to_increasing_log_levels() {
        assert_eq!(Cli { verbose: 0, config: None }.log_level(), LevelFilter::Info);
        assert_eq!(Cli { verbose: 1, config: None }.log_level(), LevelFilter::Debug);
        assert_eq!(Cli { verbose: 5, config: None }.log_level(), LevelFilter::Trace);
    }

    #[test]
    fn parses_short_and_long_flags() {
        let cli = Cli::parse_from(["ramboot", "-vv", "-c", "/tmp/custom.conf"]);
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.config.as_deref(), Some("/tmp/custom.conf"));
    }
}
