//! Init command - create the configuration file.

use std::path::Path;

use fieldpack::config::{ConfigFile, ConfigFileError};

use crate::error::CliError;

/// Write a default config file unless one already exists.
pub fn run(cli_path: Option<&Path>) -> Result<(), CliError> {
    let path = match cli_path {
        Some(path) => {
            if !path.exists() {
                ConfigFile::default().save_to(path)?;
            }
            path.to_path_buf()
        }
        None => ConfigFile::ensure_exists()?,
    };

    let config = ConfigFile::load_from(&path)?;
    std::fs::create_dir_all(&config.storage.data_dir)
        .map_err(|e| CliError::ConfigFile(ConfigFileError::DirectoryError(e)))?;

    println!("Configuration file: {}", path.display());
    println!("Package records:    {}", config.storage.data_dir.display());
    println!("Map assets:         {}", config.assets.asset_dir.display());
    println!();
    println!("Set tile_url_template in [assets] before preparing packages.");
    Ok(())
}
