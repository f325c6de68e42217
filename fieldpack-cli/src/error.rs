//! CLI error handling with user-friendly messages.
//!
//! Centralizes error handling for the CLI, providing consistent formatting
//! and appropriate exit codes.

use std::fmt;
use std::path::PathBuf;
use std::process;

use fieldpack::assets::AssetError;
use fieldpack::config::ConfigFileError;
use fieldpack::controller::PackageError;
use fieldpack::PackageStatus;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// Failed to load or save the config file
    ConfigFile(ConfigFileError),
    /// Failed to set up asset access
    AssetSetup(AssetError),
    /// Package operation rejected
    Package(PackageError),
    /// Package does not exist
    NotFound(String),
    /// Pipeline ended without a usable package
    PipelineFailed {
        package_id: String,
        status: PackageStatus,
        message: String,
    },
    /// Failed to read an input file
    FileRead { path: PathBuf, error: std::io::Error },
    /// Failed to start the async runtime
    Runtime(std::io::Error),
    /// Failed to render JSON output
    Output(serde_json::Error),
    /// Interactive prompt failed
    Prompt(String),
}

impl CliError {
    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        match self {
            CliError::PipelineFailed { message, .. } if message.starts_with("style") => {
                eprintln!();
                eprintln!("If the style is a mapbox:// reference, make sure:");
                eprintln!("  1. access_token is set in the [assets] section of config.ini");
                eprintln!("  2. The token has the styles:read scope");
            }
            CliError::PipelineFailed { message, .. } if message.starts_with("tile") => {
                eprintln!();
                eprintln!("Check tile_url_template in the [assets] section of config.ini.");
                eprintln!("Run 'fieldpack prepare' again once connectivity is back.");
            }
            CliError::ConfigFile(_) => {
                eprintln!();
                eprintln!("Run 'fieldpack config path' to locate the file.");
            }
            _ => {}
        }

        process::exit(1)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::ConfigFile(e) => write!(f, "{}", e),
            CliError::AssetSetup(e) => write!(f, "Failed to set up asset stores: {}", e),
            CliError::Package(e) => write!(f, "{}", e),
            CliError::NotFound(id) => write!(f, "Package '{}' not found", id),
            CliError::PipelineFailed {
                package_id,
                status,
                message,
            } => write!(f, "Package '{}' ended {}: {}", package_id, status, message),
            CliError::FileRead { path, error } => {
                write!(f, "Failed to read '{}': {}", path.display(), error)
            }
            CliError::Runtime(e) => write!(f, "Failed to start async runtime: {}", e),
            CliError::Output(e) => write!(f, "Failed to render output: {}", e),
            CliError::Prompt(msg) => write!(f, "Prompt failed: {}", msg),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::ConfigFile(e) => Some(e),
            CliError::AssetSetup(e) => Some(e),
            CliError::Package(e) => Some(e),
            CliError::FileRead { error, .. } => Some(error),
            CliError::Runtime(e) => Some(e),
            CliError::Output(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigFileError> for CliError {
    fn from(e: ConfigFileError) -> Self {
        CliError::ConfigFile(e)
    }
}

impl From<PackageError> for CliError {
    fn from(e: PackageError) -> Self {
        match e {
            PackageError::NotFound(id) => CliError::NotFound(id),
            other => CliError::Package(other),
        }
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        CliError::Output(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_is_mapped() {
        let err: CliError = PackageError::NotFound("farm1".into()).into();
        assert!(matches!(err, CliError::NotFound(ref id) if id == "farm1"));
        assert_eq!(err.to_string(), "Package 'farm1' not found");
    }

    #[test]
    fn test_pipeline_failure_message() {
        let err = CliError::PipelineFailed {
            package_id: "farm1".into(),
            status: PackageStatus::Error,
            message: "tile asset fetch failed: network error: timeout".into(),
        };
        assert_eq!(
            err.to_string(),
            "Package 'farm1' ended error: tile asset fetch failed: network error: timeout"
        );
    }
}
