//! Command line entry point.

use clap::{Parser, Subcommand};
use eyre::{Result, WrapErr};
use rumor_node_core::Node;
use rumor_node_core::args::{LogArgs, NodeArgs};
use rumor_node_core::config::NodeConfig;
use rumor_node_core::logging::init_logging;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// rumor - gossip peer discovery over gRPC
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub(crate) struct Cli {
    /// Logging configuration (applies to all subcommands).
    #[command(flatten)]
    pub(crate) logs: LogArgs,

    #[command(subcommand)]
    pub(crate) command: Commands,
}

#[derive(Debug, Subcommand)]
pub(crate) enum Commands {
    /// Run a node.
    Node(NodeArgs),
    /// Print the default configuration as TOML.
    Config,
}

pub(crate) async fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Config => {
            print!("{}", NodeConfig::default().to_toml()?);
            Ok(())
        }
        Commands::Node(args) => {
            init_logging(&cli.logs)?;
            run_node(&args).await
        }
    }
}

async fn run_node(args: &NodeArgs) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => NodeConfig::load(path)?,
        None => NodeConfig::default(),
    };
    config.apply_args(args);

    let node = Node::new(config).wrap_err("failed to create node")?;
    info!(
        addr = %node.local().addr(),
        bootstrap = node.peers().len(),
        discovery = node.config().discovery.enabled,
        "launching node"
    );

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    info!("received ctrl-c, shutting down");
                    cancel.cancel();
                }
                Err(err) => warn!(%err, "failed to listen for ctrl-c"),
            }
        }
    });

    node.start(cancel).await.wrap_err("node terminated with an error")
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_node_args() {
        let cli = Cli::try_parse_from([
            "rumor",
            "-vv",
            "node",
            "--addr",
            "127.0.0.1:7000",
            "--bootstrap",
            "127.0.0.1:7001,127.0.0.1:7002",
            "--no-discovery",
        ])
        .unwrap();

        assert_eq!(cli.logs.verbosity, 2);
        let Commands::Node(args) = cli.command else {
            panic!("expected node command");
        };
        assert_eq!(args.addr.as_deref(), Some("127.0.0.1:7000"));
        assert_eq!(args.bootstrap, ["127.0.0.1:7001", "127.0.0.1:7002"]);
        assert!(args.no_discovery);
        assert!(args.config.is_none());
    }
}
