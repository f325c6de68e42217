//! Configuration file handling for ~/.fieldpack/config.ini.

use std::path::{Path, PathBuf};
use std::time::Duration;

use ini::Ini;
use thiserror::Error;

use crate::assets::DEFAULT_MAX_TILES;
use crate::controller::ControllerConfig;
use crate::package::{DEFAULT_MAX_ZOOM, DEFAULT_MIN_ZOOM, DEFAULT_STYLE_REFERENCE};

pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_REMOVAL_TIMEOUT_SECS: u64 = 4;
pub const DEFAULT_INSPECTOR_TIMEOUT_SECS: u64 = 4;
pub const DEFAULT_LOG_FILE: &str = "fieldpack.log";

/// Configuration file errors.
#[derive(Debug, Error)]
pub enum ConfigFileError {
    /// Failed to read config file
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] ini::Error),

    /// Failed to write config file
    #[error("Failed to write config file: {0}")]
    WriteError(String),

    /// Invalid configuration value
    #[error("Invalid configuration: {section}.{key} = '{value}' - {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },

    /// Failed to create config directory
    #[error("Failed to create config directory: {0}")]
    DirectoryError(std::io::Error),
}

/// `[storage]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct StorageSettings {
    /// Directory holding `packages.json`.
    pub data_dir: PathBuf,
}

/// `[assets]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct AssetSettings {
    /// Root of the on-disk style and tile stores.
    pub asset_dir: PathBuf,
    /// XYZ tile URL with `{z}`, `{x}` and `{y}` placeholders.
    pub tile_url_template: Option<String>,
    /// Token for `mapbox://` style references.
    pub access_token: Option<String>,
    /// HTTP timeout in seconds.
    pub http_timeout: u64,
    /// Largest tile region one package may request.
    pub max_tiles: u64,
}

/// `[packages]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct PackageSettings {
    pub default_style: String,
    pub default_min_zoom: u8,
    pub default_max_zoom: u8,
    /// Seconds.
    pub removal_timeout: u64,
    /// Seconds.
    pub inspector_timeout: u64,
}

/// `[logging]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct LoggingSettings {
    pub log_dir: PathBuf,
    pub log_file: String,
}

/// Parsed configuration file.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigFile {
    pub storage: StorageSettings,
    pub assets: AssetSettings,
    pub packages: PackageSettings,
    pub logging: LoggingSettings,
}

impl Default for ConfigFile {
    fn default() -> Self {
        let base = config_directory();
        Self {
            storage: StorageSettings {
                data_dir: base.join("data"),
            },
            assets: AssetSettings {
                asset_dir: base.join("assets"),
                tile_url_template: None,
                access_token: None,
                http_timeout: DEFAULT_HTTP_TIMEOUT_SECS,
                max_tiles: DEFAULT_MAX_TILES,
            },
            packages: PackageSettings {
                default_style: DEFAULT_STYLE_REFERENCE.to_string(),
                default_min_zoom: DEFAULT_MIN_ZOOM,
                default_max_zoom: DEFAULT_MAX_ZOOM,
                removal_timeout: DEFAULT_REMOVAL_TIMEOUT_SECS,
                inspector_timeout: DEFAULT_INSPECTOR_TIMEOUT_SECS,
            },
            logging: LoggingSettings {
                log_dir: base.join("logs"),
                log_file: DEFAULT_LOG_FILE.to_string(),
            },
        }
    }
}

impl ConfigFile {
    /// Load configuration from the default path (~/.fieldpack/config.ini).
    pub fn load() -> Result<Self, ConfigFileError> {
        Self::load_from(&config_file_path())
    }

    /// Load configuration from a specific path.
    ///
    /// If the file doesn't exist, returns defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigFileError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let ini = Ini::load_from_file(path)?;
        super::parser::parse_ini(&ini)
    }

    /// Save configuration to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigFileError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(ConfigFileError::DirectoryError)?;
        }

        let content = super::writer::to_config_string(self);
        std::fs::write(path, content).map_err(|e| ConfigFileError::WriteError(e.to_string()))
    }

    /// The commented INI text `save_to` writes.
    pub fn to_config_string(&self) -> String {
        super::writer::to_config_string(self)
    }

    /// Create the default config file if it doesn't exist.
    ///
    /// Returns the path to the config file.
    pub fn ensure_exists() -> Result<PathBuf, ConfigFileError> {
        let path = config_file_path();
        if !path.exists() {
            Self::default().save_to(&path)?;
        }
        Ok(path)
    }

    /// Controller settings from the `[packages]` section.
    pub fn controller_config(&self) -> ControllerConfig {
        ControllerConfig::new()
            .with_default_style(self.packages.default_style.clone())
            .with_default_zoom(self.packages.default_min_zoom, self.packages.default_max_zoom)
            .with_removal_timeout(Duration::from_secs(self.packages.removal_timeout))
            .with_inspector_timeout(Duration::from_secs(self.packages.inspector_timeout))
    }

    /// Directory of the style store.
    pub fn style_dir(&self) -> PathBuf {
        self.assets.asset_dir.join("styles")
    }

    /// Directory of the tile store.
    pub fn tile_dir(&self) -> PathBuf {
        self.assets.asset_dir.join("tiles")
    }
}

/// Get the path to the config directory (~/.fieldpack).
pub fn config_directory() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".fieldpack")
}

/// Get the path to the config file (~/.fieldpack/config.ini).
pub fn config_file_path() -> PathBuf {
    config_directory().join("config.ini")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ConfigFile::default();

        assert_eq!(config.packages.default_style, DEFAULT_STYLE_REFERENCE);
        assert_eq!(config.packages.default_min_zoom, 12);
        assert_eq!(config.packages.default_max_zoom, 16);
        assert_eq!(config.packages.removal_timeout, 4);
        assert!(config.assets.tile_url_template.is_none());
        assert!(config.storage.data_dir.ends_with(".fieldpack/data"));
    }

    #[test]
    fn test_load_nonexistent_returns_defaults() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nonexistent.ini");

        let config = ConfigFile::load_from(&config_path).unwrap();

        assert_eq!(config, ConfigFile::default());
    }

    #[test]
    fn test_save_then_load_keeps_values() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("config.ini");

        let mut config = ConfigFile::default();
        config.storage.data_dir = temp_dir.path().join("data");
        config.assets.tile_url_template = Some("https://t.example.com/{z}/{x}/{y}.png".into());
        config.packages.default_max_zoom = 18;
        config.save_to(&path).unwrap();

        assert_eq!(ConfigFile::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_controller_config_from_file() {
        let mut config = ConfigFile::default();
        config.packages.removal_timeout = 9;
        config.packages.default_min_zoom = 5;

        let controller = config.controller_config();

        assert_eq!(controller.removal_timeout, Duration::from_secs(9));
        assert_eq!(controller.default_min_zoom, 5);
        assert_eq!(controller.inspector_timeout, Duration::from_secs(4));
    }
}
