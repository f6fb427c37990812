//! CLI arguments.

use std::path::PathBuf;

use clap::Args;

/// Logging configuration.
#[derive(Debug, Args, Clone, Default)]
#[command(next_help_heading = "Logging")]
pub struct LogArgs {
    /// Silence all output.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose mode (-v, -vv, -vvv, etc.).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbosity: u8,

    /// Log filter directive (e.g., "rumor_discovery=debug,tonic=info").
    #[arg(long = "log.filter", value_name = "DIRECTIVE", global = true)]
    pub filter: Option<String>,

    /// Use JSON format for log output.
    #[arg(long = "log.json", global = true)]
    pub json: bool,
}

/// Arguments of the `node` command. Flags override the configuration file.
#[derive(Debug, Args, Clone, Default)]
pub struct NodeArgs {
    /// Path to the TOML configuration file.
    #[arg(short, long, value_name = "FILE", env = "RUMOR_CONFIG")]
    pub config: Option<PathBuf>,

    /// Listen address, overriding `local.addr`.
    #[arg(long, value_name = "HOST:PORT")]
    pub addr: Option<String>,

    /// Bootstrap peer address; repeat or comma separate. Replaces the configured list.
    #[arg(long, value_name = "HOST:PORT", value_delimiter = ',')]
    pub bootstrap: Vec<String>,

    /// Serve Exchange requests without running the discovery loop.
    #[arg(long)]
    pub no_discovery: bool,
}
