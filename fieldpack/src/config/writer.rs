//! Serialization of `ConfigFile` to a commented INI string.

use std::path::Path;

use super::file::ConfigFile;

/// Convert a `ConfigFile` to a commented INI string for saving.
pub(super) fn to_config_string(config: &ConfigFile) -> String {
    let tile_url_template = config.assets.tile_url_template.as_deref().unwrap_or("");
    let access_token = config.assets.access_token.as_deref().unwrap_or("");

    format!(
        r#"[storage]
; Directory holding the package record store (packages.json)
data_dir = {}

[assets]
; Root directory for downloaded styles and tiles
asset_dir = {}
; XYZ tile source, e.g. https://tiles.example.com/{{z}}/{{x}}/{{y}}.png
; When empty, tiles come from the style's raster source
tile_url_template = {}
; Access token for mapbox:// style references
access_token = {}
; HTTP request timeout in seconds
http_timeout = {}
; Largest number of tiles a single package may request
max_tiles = {}

[packages]
; Style used when a request does not name one
default_style = {}
; Zoom range used when a request does not name one (0-22)
default_min_zoom = {}
default_max_zoom = {}
; Seconds each asset removal may take before it is abandoned
removal_timeout = {}
; Seconds an asset inventory query may take before it is inconclusive
inspector_timeout = {}

[logging]
log_dir = {}
log_file = {}
"#,
        path_to_string(&config.storage.data_dir),
        path_to_string(&config.assets.asset_dir),
        tile_url_template,
        access_token,
        config.assets.http_timeout,
        config.assets.max_tiles,
        config.packages.default_style,
        config.packages.default_min_zoom,
        config.packages.default_max_zoom,
        config.packages.removal_timeout,
        config.packages.inspector_timeout,
        path_to_string(&config.logging.log_dir),
        config.logging.log_file,
    )
}

/// Paths under the home directory are written with a `~` prefix.
fn path_to_string(path: &Path) -> String {
    if let Some(home) = dirs::home_dir() {
        if let Ok(rest) = path.strip_prefix(&home) {
            return format!("~/{}", rest.display());
        }
    }
    path.display().to_string()
}
