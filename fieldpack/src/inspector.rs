//! Runtime asset inspection.
//!
//! Asks both asset stores which ids they currently hold, so a record's
//! readiness can be checked against what is really on disk rather than what
//! the record last claimed.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::assets::{AssetError, AssetKind, BoxFuture, StyleAssetStore, TileAssetStore};

/// Default bound on each store enumeration.
pub const DEFAULT_INSPECTOR_TIMEOUT: Duration = Duration::from_secs(4);

/// Point-in-time view of the asset ids each store reports.
///
/// A half whose enumeration timed out or failed is empty and marked
/// inconclusive; an empty conclusive half really is empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetSnapshot {
    pub present_style_asset_ids: HashSet<String>,
    pub present_tile_asset_ids: HashSet<String>,
    pub style_conclusive: bool,
    pub tile_conclusive: bool,
}

impl AssetSnapshot {
    /// A fully conclusive snapshot of the given ids.
    pub fn new<S, T>(style_ids: S, tile_ids: T) -> Self
    where
        S: IntoIterator,
        S::Item: Into<String>,
        T: IntoIterator,
        T::Item: Into<String>,
    {
        Self {
            present_style_asset_ids: style_ids.into_iter().map(Into::into).collect(),
            present_tile_asset_ids: tile_ids.into_iter().map(Into::into).collect(),
            style_conclusive: true,
            tile_conclusive: true,
        }
    }

    /// True when both halves were enumerated successfully.
    pub fn is_conclusive(&self) -> bool {
        self.style_conclusive && self.tile_conclusive
    }

    pub fn has_style(&self, id: &str) -> bool {
        self.present_style_asset_ids.contains(id)
    }

    pub fn has_tile(&self, id: &str) -> bool {
        self.present_tile_asset_ids.contains(id)
    }
}

/// Enumerates both asset stores under a bounded wait.
#[derive(Clone)]
pub struct AssetInspector {
    styles: Arc<dyn StyleAssetStore>,
    tiles: Arc<dyn TileAssetStore>,
    timeout: Duration,
}

impl AssetInspector {
    pub fn new(styles: Arc<dyn StyleAssetStore>, tiles: Arc<dyn TileAssetStore>) -> Self {
        Self {
            styles,
            tiles,
            timeout: DEFAULT_INSPECTOR_TIMEOUT,
        }
    }

    /// Set the per-store enumeration timeout (builder pattern).
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Take a snapshot, querying both stores concurrently.
    pub async fn snapshot(&self) -> AssetSnapshot {
        let (styles, tiles) = tokio::join!(
            enumerate(AssetKind::Style, self.styles.list_all(), self.timeout),
            enumerate(AssetKind::Tile, self.tiles.list_all(), self.timeout),
        );

        debug!(
            styles = styles.0.len(),
            tiles = tiles.0.len(),
            style_conclusive = styles.1,
            tile_conclusive = tiles.1,
            "Asset snapshot taken"
        );

        AssetSnapshot {
            present_style_asset_ids: styles.0,
            present_tile_asset_ids: tiles.0,
            style_conclusive: styles.1,
            tile_conclusive: tiles.1,
        }
    }
}

async fn enumerate(
    kind: AssetKind,
    listing: BoxFuture<'_, Result<Vec<String>, AssetError>>,
    timeout: Duration,
) -> (HashSet<String>, bool) {
    match tokio::time::timeout(timeout, listing).await {
        Ok(Ok(ids)) => (
            ids.into_iter().filter(|id| !id.trim().is_empty()).collect(),
            true,
        ),
        Ok(Err(e)) => {
            warn!(kind = %kind, error = %e, "Asset enumeration failed, snapshot inconclusive");
            (HashSet::new(), false)
        }
        Err(_) => {
            warn!(
                kind = %kind,
                timeout_ms = timeout.as_millis() as u64,
                "Asset enumeration timed out, snapshot inconclusive"
            );
            (HashSet::new(), false)
        }
    }
}
