//! Configuration CLI commands.

use clap::Subcommand;

use crate::error::CliError;
use crate::runner::CliRunner;

/// Config subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Show the configuration file path
    Path,

    /// Print the effective configuration as INI
    Show,
}

/// Run a config subcommand.
pub fn run(runner: &CliRunner, command: ConfigCommands) -> Result<(), CliError> {
    match command {
        ConfigCommands::Path => {
            let path = runner.config_path();
            if path.exists() {
                println!("{}", path.display());
            } else {
                println!("{} (not created, using defaults)", path.display());
            }
        }
        ConfigCommands::Show => print!("{}", runner.config().to_ini_string()),
    }
    Ok(())
}
