//! Configuration for the package controller.

use std::time::Duration;

use crate::inspector::DEFAULT_INSPECTOR_TIMEOUT;
use crate::package::{DEFAULT_MAX_ZOOM, DEFAULT_MIN_ZOOM, DEFAULT_STYLE_REFERENCE};

/// Default bound on each asset removal step.
pub const DEFAULT_REMOVAL_TIMEOUT: Duration = Duration::from_secs(4);

/// Configuration for the package controller.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Wait for each asset removal before treating it as failed.
    pub removal_timeout: Duration,

    /// Wait for each store enumeration before the snapshot half is
    /// considered inconclusive.
    pub inspector_timeout: Duration,

    /// Style used when a prepare request names none.
    pub default_style_reference: String,

    pub default_min_zoom: u8,
    pub default_max_zoom: u8,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            removal_timeout: DEFAULT_REMOVAL_TIMEOUT,
            inspector_timeout: DEFAULT_INSPECTOR_TIMEOUT,
            default_style_reference: DEFAULT_STYLE_REFERENCE.to_string(),
            default_min_zoom: DEFAULT_MIN_ZOOM,
            default_max_zoom: DEFAULT_MAX_ZOOM,
        }
    }
}

impl ControllerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the removal step timeout.
    pub fn with_removal_timeout(mut self, timeout: Duration) -> Self {
        self.removal_timeout = timeout;
        self
    }

    /// Set the enumeration timeout.
    pub fn with_inspector_timeout(mut self, timeout: Duration) -> Self {
        self.inspector_timeout = timeout;
        self
    }

    /// Set the default style reference.
    pub fn with_default_style(mut self, style_reference: impl Into<String>) -> Self {
        self.default_style_reference = style_reference.into();
        self
    }

    /// Set the default zoom range.
    pub fn with_default_zoom(mut self, min_zoom: u8, max_zoom: u8) -> Self {
        self.default_min_zoom = min_zoom;
        self.default_max_zoom = max_zoom;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ControllerConfig::default();
        assert_eq!(config.removal_timeout, Duration::from_secs(4));
        assert_eq!(config.inspector_timeout, Duration::from_secs(4));
        assert_eq!(
            config.default_style_reference,
            "mapbox://styles/mapbox/standard-satellite"
        );
        assert_eq!((config.default_min_zoom, config.default_max_zoom), (12, 16));
    }

    #[test]
    fn test_builder_pattern() {
        let config = ControllerConfig::new()
            .with_removal_timeout(Duration::from_millis(250))
            .with_default_style("https://styles.example.com/sat.json")
            .with_default_zoom(8, 13);

        assert_eq!(config.removal_timeout, Duration::from_millis(250));
        assert_eq!(config.default_style_reference, "https://styles.example.com/sat.json");
        assert_eq!(config.default_min_zoom, 8);
        assert_eq!(config.default_max_zoom, 13);
    }
}
