//! Removal pipeline: tiles, then style, then the record.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use super::error::{PackageError, PackageResult};
use super::events::{EventSink, Operation, PackageEvents};
use super::progress::{COMPLETE_PROGRESS, STYLE_REMOVED_PROGRESS, TILES_REMOVED_PROGRESS};
use super::PackageController;
use crate::assets::{AssetError, AssetKind, BoxFuture};
use crate::package::{PackageRecord, PackageStatus};

impl PackageController {
    /// Mark a package `REMOVING` and tear it down in the background.
    ///
    /// The record is deleted when the pipeline ends even if an asset could
    /// not be removed; in that case the terminal status is `ERROR`.
    pub async fn remove_package(&self, package_id: &str) -> PackageResult<PackageEvents> {
        let mut record = self
            .store
            .find_by_id(package_id)?
            .ok_or_else(|| PackageError::NotFound(package_id.to_string()))?;

        record.set_status(PackageStatus::Removing);
        self.store.upsert(&record)?;
        info!(package_id = %package_id, "Package removal started");

        let (sink, events) =
            EventSink::channel(package_id, Operation::Removal, self.fanout.clone());
        sink.progress(PackageStatus::Removing, 0);

        tokio::spawn(self.clone().run_removal(record, sink));
        Ok(events)
    }

    pub(super) async fn run_removal(self, mut record: PackageRecord, sink: Arc<EventSink>) {
        let package_id = record.package_id.clone();
        let timeout = self.config.removal_timeout;
        let mut failures = Vec::new();

        let tiles = bounded(AssetKind::Tile, self.tiles.remove(&record.tile_asset_id), timeout);
        if let Err(message) = tiles.await {
            failures.push(message);
        }
        sink.progress(PackageStatus::Removing, TILES_REMOVED_PROGRESS);

        let style = bounded(
            AssetKind::Style,
            self.styles.remove(&record.style_asset_id),
            timeout,
        );
        if let Err(message) = style.await {
            failures.push(message);
        }
        sink.progress(PackageStatus::Removing, STYLE_REMOVED_PROGRESS);

        record.readiness.has_tile_asset = false;
        record.readiness.has_style_asset = false;
        if failures.is_empty() {
            record.set_status(PackageStatus::Removed);
        } else {
            record.fail(failures.join("; "));
        }

        if let Err(e) = self.store.remove(&package_id) {
            error!(package_id = %package_id, error = %e, "Failed to delete package record");
            failures.push(format!("failed to delete package record: {}", e));
            record.fail(failures.join("; "));
        }

        info!(
            package_id = %package_id,
            status = %record.status,
            error = record.error_message.as_deref().unwrap_or("none"),
            "Package removal finished"
        );
        sink.finish(&record, Some(COMPLETE_PROGRESS));
    }
}

/// Run one removal step under `timeout`, turning any failure into a
/// message for the record.
async fn bounded(
    kind: AssetKind,
    step: BoxFuture<'_, Result<(), AssetError>>,
    timeout: Duration,
) -> Result<(), String> {
    match tokio::time::timeout(timeout, step).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => {
            warn!(kind = %kind, error = %e, "Asset removal failed");
            Err(format!("{} asset removal failed: {}", kind, e))
        }
        Err(_) => {
            warn!(kind = %kind, timeout_ms = timeout.as_millis() as u64, "Asset removal timed out");
            Err(format!(
                "{} asset removal timed out after {}ms",
                kind,
                timeout.as_millis()
            ))
        }
    }
}
