//! User configuration.
//!
//! Settings live in `~/.fieldpack/config.ini`. A missing file means every
//! default applies; a present file only needs the keys it wants to change.

mod file;
mod parser;
mod writer;

pub use file::{
    config_directory, config_file_path, AssetSettings, ConfigFile, ConfigFileError,
    LoggingSettings, PackageSettings, StorageSettings, DEFAULT_HTTP_TIMEOUT_SECS,
    DEFAULT_LOG_FILE,
};
