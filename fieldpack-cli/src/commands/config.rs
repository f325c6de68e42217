//! Configuration commands.

use std::path::Path;

use clap::Subcommand;

use super::common::{config_path, load_config};
use crate::error::CliError;

/// Config subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Show the configuration file path
    Path,

    /// Print the effective configuration as INI
    Show,
}

/// Run a config subcommand.
pub fn run(cli_path: Option<&Path>, command: ConfigCommands) -> Result<(), CliError> {
    match command {
        ConfigCommands::Path => {
            let path = config_path(cli_path);
            let note = if path.exists() { "" } else { " (not created yet)" };
            println!("{}{}", path.display(), note);
            Ok(())
        }
        ConfigCommands::Show => {
            let config = load_config(cli_path)?;
            print!("{}", config.to_config_string());
            Ok(())
        }
    }
}
