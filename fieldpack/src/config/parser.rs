//! INI parsing for `ConfigFile`.

use std::path::PathBuf;

use ini::Ini;

use super::file::{ConfigFile, ConfigFileError};
use crate::package::MAX_ZOOM;

/// Overlay the sections present in `ini` onto the defaults.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    // [storage] section
    if let Some(section) = ini.section(Some("storage")) {
        if let Some(v) = non_empty(section.get("data_dir")) {
            config.storage.data_dir = expand_tilde(v);
        }
    }

    // [assets] section
    if let Some(section) = ini.section(Some("assets")) {
        if let Some(v) = non_empty(section.get("asset_dir")) {
            config.assets.asset_dir = expand_tilde(v);
        }
        if let Some(v) = section.get("tile_url_template") {
            let v = v.trim();
            if v.is_empty() {
                config.assets.tile_url_template = None;
            } else if ["{z}", "{x}", "{y}"].iter().all(|p| v.contains(p)) {
                config.assets.tile_url_template = Some(v.to_string());
            } else {
                return Err(invalid(
                    "assets",
                    "tile_url_template",
                    v,
                    "must contain {z}, {x} and {y} placeholders",
                ));
            }
        }
        if let Some(v) = section.get("access_token") {
            config.assets.access_token = non_empty(Some(v)).map(str::to_string);
        }
        if let Some(v) = section.get("http_timeout") {
            config.assets.http_timeout = positive(v).ok_or_else(|| {
                invalid("assets", "http_timeout", v, "must be a positive integer (seconds)")
            })?;
        }
        if let Some(v) = section.get("max_tiles") {
            config.assets.max_tiles = positive(v)
                .ok_or_else(|| invalid("assets", "max_tiles", v, "must be a positive integer"))?;
        }
    }

    // [packages] section
    if let Some(section) = ini.section(Some("packages")) {
        if let Some(v) = non_empty(section.get("default_style")) {
            config.packages.default_style = v.to_string();
        }
        if let Some(v) = section.get("default_min_zoom") {
            config.packages.default_min_zoom = zoom(v)
                .ok_or_else(|| invalid("packages", "default_min_zoom", v, &zoom_reason()))?;
        }
        if let Some(v) = section.get("default_max_zoom") {
            config.packages.default_max_zoom = zoom(v)
                .ok_or_else(|| invalid("packages", "default_max_zoom", v, &zoom_reason()))?;
        }
        if config.packages.default_min_zoom > config.packages.default_max_zoom {
            return Err(invalid(
                "packages",
                "default_min_zoom",
                &config.packages.default_min_zoom.to_string(),
                "must not exceed default_max_zoom",
            ));
        }
        if let Some(v) = section.get("removal_timeout") {
            config.packages.removal_timeout = positive(v).ok_or_else(|| {
                invalid("packages", "removal_timeout", v, "must be a positive integer (seconds)")
            })?;
        }
        if let Some(v) = section.get("inspector_timeout") {
            config.packages.inspector_timeout = positive(v).ok_or_else(|| {
                invalid("packages", "inspector_timeout", v, "must be a positive integer (seconds)")
            })?;
        }
    }

    // [logging] section
    if let Some(section) = ini.section(Some("logging")) {
        if let Some(v) = non_empty(section.get("log_dir")) {
            config.logging.log_dir = expand_tilde(v);
        }
        if let Some(v) = non_empty(section.get("log_file")) {
            config.logging.log_file = v.to_string();
        }
    }

    Ok(config)
}

fn invalid(section: &str, key: &str, value: &str, reason: &str) -> ConfigFileError {
    ConfigFileError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn positive(value: &str) -> Option<u64> {
    value.trim().parse::<u64>().ok().filter(|v| *v > 0)
}

fn zoom(value: &str) -> Option<u8> {
    value.trim().parse::<u8>().ok().filter(|z| *z <= MAX_ZOOM)
}

fn zoom_reason() -> String {
    format!("must be an integer between 0 and {}", MAX_ZOOM)
}

/// Expand a leading `~` to the home directory.
fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}
