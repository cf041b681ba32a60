//! navcache CLI - command-line interface
//!
//! Inspects and fills the on-disk navcache store and shows a live
//! dashboard of cache contents and preload efficiency.

mod commands;
mod error;
mod runner;
mod ui;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use commands::config::ConfigCommands;
use commands::preload::PreloadArgs;
use commands::watch::WatchArgs;
use error::CliError;
use runner::CliRunner;

#[derive(Parser)]
#[command(name = "navcache")]
#[command(version, about = "Two-tier cache and preload layer", long_about = None)]
struct Cli {
    /// Configuration file (default: ~/.navcache/config.ini)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch keys from a directory of JSON files into the cache
    Preload(PreloadArgs),

    /// Print the cached value for a key
    Get {
        /// Cache key
        key: String,
    },

    /// Remove a key from both tiers
    Invalidate {
        /// Cache key
        key: String,
    },

    /// Remove every cached entry
    Clear,

    /// Show cache statistics
    Stats {
        /// Print the snapshot as JSON
        #[arg(long)]
        json: bool,
    },

    /// Live dashboard (q to quit)
    Watch(WatchArgs),

    /// Configuration file commands
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Preload(_) => "preload",
            Commands::Get { .. } => "get",
            Commands::Invalidate { .. } => "invalidate",
            Commands::Clear => "clear",
            Commands::Stats { .. } => "stats",
            Commands::Watch(_) => "watch",
            Commands::Config { .. } => "config",
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        e.exit();
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    // stderr logging would tear the dashboard
    let console = !matches!(cli.command, Commands::Watch(_));
    let runner = CliRunner::new(cli.config, console)?;
    runner.log_startup(cli.command.name());

    match cli.command {
        Commands::Preload(args) => commands::preload::run(&runner, args).await,
        Commands::Get { key } => commands::cache::run_get(&runner, &key),
        Commands::Invalidate { key } => commands::cache::run_invalidate(&runner, &key),
        Commands::Clear => commands::cache::run_clear(&runner),
        Commands::Stats { json } => commands::cache::run_stats(&runner, json),
        Commands::Watch(args) => commands::watch::run(&runner, args).await,
        Commands::Config { command } => commands::config::run(&runner, command),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_preload() {
        let cli = Cli::parse_from([
            "navcache",
            "--config",
            "/tmp/c.ini",
            "preload",
            "--source",
            "data",
            "users",
            "orders",
        ]);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/c.ini")));
        match cli.command {
            Commands::Preload(args) => {
                assert_eq!(args.source, PathBuf::from("data"));
                assert_eq!(args.keys, vec!["users", "orders"]);
            }
            _ => panic!("expected preload"),
        }
    }

    #[test]
    fn test_preload_requires_keys() {
        assert!(Cli::try_parse_from(["navcache", "preload", "--source", "data"]).is_err());
    }

    #[test]
    fn test_watch_source_requires_keys() {
        assert!(Cli::try_parse_from(["navcache", "watch", "--source", "data"]).is_err());
        assert!(Cli::try_parse_from(["navcache", "watch"]).is_ok());
    }

    #[test]
    fn test_config_after_subcommand() {
        let cli = Cli::parse_from(["navcache", "stats", "--json", "--config", "x.ini"]);
        assert_eq!(cli.command.name(), "stats");
        assert_eq!(cli.config, Some(PathBuf::from("x.ini")));
    }
}
