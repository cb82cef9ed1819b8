use std::path::PathBuf;

use clap::Parser;

/// Probe websites on an interval and record every outcome.
#[derive(Debug, Parser)]
#[command(name = "wsmon", version, about)]
pub struct Cli {
    /// Config file (defaults to $XDG_CONFIG_HOME/wsmon/config.toml)
    #[arg(short = 'c', long = "conf-file", value_name = "PATH")]
    pub conf_file: Option<PathBuf>,

    /// Append results to this JSON Lines file instead of the configured storage
    #[arg(short = 'r', long = "results-file", value_name = "PATH")]
    pub results_file: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long)]
    pub verbose: bool,

    /// Validate and print the configuration, then exit
    #[arg(long)]
    pub check_config: bool,
}
