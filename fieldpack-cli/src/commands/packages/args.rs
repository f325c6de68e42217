//! Argument types for package commands.

use std::path::PathBuf;

use clap::Args;
use fieldpack::Bounds;

/// Arguments for `fieldpack prepare`.
#[derive(Debug, Args)]
pub struct PrepareArgs {
    /// Package identifier, unique per device
    pub package_id: String,

    /// Region as WEST,SOUTH,EAST,NORTH in decimal degrees
    #[arg(long, value_parser = parse_bounds, allow_hyphen_values = true)]
    pub bounds: Bounds,

    /// Display name (defaults to the package id)
    #[arg(long)]
    pub name: Option<String>,

    /// Style reference (defaults to packages.default_style)
    #[arg(long)]
    pub style: Option<String>,

    /// Lowest zoom level to download
    #[arg(long)]
    pub min_zoom: Option<u8>,

    /// Highest zoom level to download
    #[arg(long)]
    pub max_zoom: Option<u8>,

    /// Owning company
    #[arg(long)]
    pub company: Option<String>,

    /// Owning farm
    #[arg(long)]
    pub farm: Option<String>,

    /// GeoJSON file with field boundaries
    #[arg(long)]
    pub boundary: Option<PathBuf>,

    /// GeoJSON file with trap locations
    #[arg(long)]
    pub traps: Option<PathBuf>,
}

/// Parse `WEST,SOUTH,EAST,NORTH`.
pub fn parse_bounds(value: &str) -> Result<Bounds, String> {
    let parts = value
        .split(',')
        .map(|p| p.trim().parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| format!("invalid coordinate: {}", e))?;

    match parts.as_slice() {
        [west, south, east, north] => {
            let bounds = Bounds::new(*west, *south, *east, *north);
            bounds.check()?;
            Ok(bounds)
        }
        _ => Err(format!(
            "expected 4 comma-separated values, got {}",
            parts.len()
        )),
    }
}
