//! Download pipeline: style, then tiles, then validation.

use std::sync::Arc;

use tracing::{error, info, warn};

use super::events::EventSink;
use super::progress::{
    style_progress, tile_progress, COMPLETE_PROGRESS, DOWNLOAD_PROGRESS_CEILING,
    VALIDATING_PROGRESS,
};
use super::{apply_validation, PackageController};
use crate::assets::{
    LoadProgress, NetworkRestriction, ProgressFn, StyleFetchOptions, TileFetchOptions,
    TileRegionRequest, TilesetDescriptor,
};
use crate::package::{PackageRecord, PackageStatus, ReadinessFlags};
use crate::store::StoreError;
use crate::validator::validate_after_fetch;

impl PackageController {
    /// Run one package from its queued state to a terminal status.
    pub(super) async fn run_download(self, mut record: PackageRecord, sink: Arc<EventSink>) {
        let package_id = record.package_id.clone();

        if record.status == PackageStatus::UpdateAvailable {
            record.set_status(PackageStatus::Queued);
            if let Err(e) = self.store.upsert(&record) {
                return self.abort_on_store(record, &sink, e);
            }
            sink.progress(PackageStatus::Queued, 0);
        }

        record.set_status(PackageStatus::Downloading);
        record.readiness = ReadinessFlags::default();
        if let Err(e) = self.store.upsert(&record) {
            return self.abort_on_store(record, &sink, e);
        }
        sink.progress(PackageStatus::Downloading, 0);
        info!(
            package_id = %package_id,
            style = %record.style_reference,
            "Starting package download"
        );

        // Style
        let on_style = progress_callback(&sink, PackageStatus::Downloading, style_progress);
        let style = self
            .styles
            .fetch(
                &record.style_reference,
                StyleFetchOptions {
                    accept_expired: true,
                },
                on_style,
            )
            .await;
        if let Err(e) = style {
            error!(package_id = %package_id, error = %e, "Style asset fetch failed");
            record.fail(format!("style asset fetch failed: {}", e));
            return self.finish_failed(record, &sink);
        }
        record.readiness.has_style_asset = true;
        if let Err(e) = self.store.upsert(&record) {
            return self.abort_on_store(record, &sink, e);
        }
        info!(package_id = %package_id, "Style asset stored");

        // Tiles
        let request = TileRegionRequest {
            polygon: record.bounds.to_polygon(),
            descriptor: TilesetDescriptor {
                style_reference: record.style_reference.clone(),
                min_zoom: record.min_zoom,
                max_zoom: record.max_zoom,
                pixel_ratio: 1.0,
            },
            options: TileFetchOptions {
                accept_expired: true,
                network_restriction: NetworkRestriction::None,
            },
        };
        let on_tiles = progress_callback(&sink, PackageStatus::Downloading, tile_progress);
        let tiles = self
            .tiles
            .fetch(&record.tile_asset_id, request, on_tiles)
            .await;
        if let Err(e) = tiles {
            error!(package_id = %package_id, error = %e, "Tile asset fetch failed");
            record.fail(format!("tile asset fetch failed: {}", e));
            return self.finish_failed(record, &sink);
        }
        record.readiness.has_tile_asset = true;
        record.set_status(PackageStatus::Validating);
        if let Err(e) = self.store.upsert(&record) {
            return self.abort_on_store(record, &sink, e);
        }
        sink.progress(PackageStatus::Validating, VALIDATING_PROGRESS);
        info!(package_id = %package_id, "Tile asset stored, validating");

        // Validation
        let snapshot = self.inspector.snapshot().await;
        if !snapshot.is_conclusive() {
            warn!(
                package_id = %package_id,
                "Snapshot inconclusive, keeping fetch results for the unanswered store"
            );
        }
        let verdict = validate_after_fetch(&record, &snapshot);
        apply_validation(&mut record, &verdict);
        if let Err(e) = self.store.upsert(&record) {
            return self.abort_on_store(record, &sink, e);
        }

        info!(
            package_id = %package_id,
            status = %record.status,
            error = record.error_message.as_deref().unwrap_or("none"),
            "Package download finished"
        );
        sink.finish(&record, Some(COMPLETE_PROGRESS));
    }

    /// Persist a failed record and send the terminal event.
    fn finish_failed(&self, record: PackageRecord, sink: &EventSink) {
        if let Err(e) = self.store.upsert(&record) {
            error!(
                package_id = %record.package_id,
                error = %e,
                "Failed to persist failed package"
            );
        }
        sink.finish(&record, None);
    }

    /// End a pipeline whose store write failed.
    ///
    /// The record is marked `ERROR` and written once more on a best-effort
    /// basis; the terminal event carries it either way.
    pub(super) fn abort_on_store(&self, mut record: PackageRecord, sink: &EventSink, e: StoreError) {
        error!(
            package_id = %record.package_id,
            status = %record.status,
            error = %e,
            "Failed to persist package record"
        );
        record.fail(format!("failed to persist package record: {}", e));
        if let Err(e) = self.store.upsert(&record) {
            error!(
                package_id = %record.package_id,
                error = %e,
                "Final write of failed package also failed"
            );
        }
        sink.finish(&record, None);
    }
}

fn progress_callback(
    sink: &Arc<EventSink>,
    status: PackageStatus,
    map: fn(LoadProgress) -> u8,
) -> ProgressFn {
    let sink = Arc::clone(sink);
    Arc::new(move |progress: LoadProgress| {
        sink.progress(status, map(progress).min(DOWNLOAD_PROGRESS_CEILING))
    })
}
