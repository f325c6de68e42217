//! Package lifecycle controller.
//!
//! Drives every package through its state machine and is the only writer of
//! [`PackageRecord`]s besides validation passes.
//!
//! # Download
//!
//! ```text
//! QUEUED ──► DOWNLOADING ──► VALIDATING ──► READY | INCOMPLETE
//!                 │               │
//!                 └───────────────┴──► ERROR
//! ```
//!
//! `UPDATE_AVAILABLE` replaces `QUEUED` when a prepare targets a package that
//! is already `READY`.
//!
//! # Removal
//!
//! ```text
//! any ──► REMOVING ──► REMOVED | ERROR   (record deleted either way)
//! ```
//!
//! Pipelines run as independent tokio tasks and are never cancelled. There
//! is no per-id locking: two pipelines for the same id race and the last
//! store write wins.

mod config;
mod download;
mod error;
mod events;
mod progress;
mod removal;
mod request;

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{info, warn};

pub use config::{ControllerConfig, DEFAULT_REMOVAL_TIMEOUT};
pub use error::{PackageError, PackageResult};
pub use events::{Operation, PackageEvent, PackageEvents};
pub use progress::{style_progress, tile_progress};
pub use request::PrepareRequest;

use crate::assets::{StyleAssetStore, TileAssetStore};
use crate::inspector::{AssetInspector, AssetSnapshot};
use crate::package::{PackageRecord, PackageStatus};
use crate::store::RecordStore;
use crate::validator::{validate, ValidationResult};
use events::EventSink;
use progress::COMPLETE_PROGRESS;

/// Buffer of the broadcast channel behind [`PackageController::subscribe`].
const EVENT_BROADCAST_CAPACITY: usize = 256;

/// What [`PackageController::recover`] did with records left mid-flight.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecoveryReport {
    /// Download records re-classified, with their new status.
    pub revalidated: Vec<(String, PackageStatus)>,
    /// Records whose interrupted removal was run again.
    pub removed: Vec<String>,
    /// Records left untouched because the snapshot was inconclusive.
    pub skipped: Vec<String>,
}

impl RecoveryReport {
    pub fn is_empty(&self) -> bool {
        self.revalidated.is_empty() && self.removed.is_empty() && self.skipped.is_empty()
    }
}

/// Orchestrates download, removal and validation of packages.
///
/// Cheap to clone; clones share the store, asset stores and event channel.
#[derive(Clone)]
pub struct PackageController {
    store: Arc<RecordStore>,
    styles: Arc<dyn StyleAssetStore>,
    tiles: Arc<dyn TileAssetStore>,
    inspector: AssetInspector,
    config: ControllerConfig,
    fanout: broadcast::Sender<PackageEvent>,
}

impl PackageController {
    pub fn new(
        store: Arc<RecordStore>,
        styles: Arc<dyn StyleAssetStore>,
        tiles: Arc<dyn TileAssetStore>,
        config: ControllerConfig,
    ) -> Self {
        let inspector = AssetInspector::new(Arc::clone(&styles), Arc::clone(&tiles))
            .with_timeout(config.inspector_timeout);
        let (fanout, _) = broadcast::channel(EVENT_BROADCAST_CAPACITY);
        Self {
            store,
            styles,
            tiles,
            inspector,
            config,
            fanout,
        }
    }

    pub fn store(&self) -> &Arc<RecordStore> {
        &self.store
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn inspector(&self) -> &AssetInspector {
        &self.inspector
    }

    /// Receive every event from every pipeline.
    pub fn subscribe(&self) -> broadcast::Receiver<PackageEvent> {
        self.fanout.subscribe()
    }

    /// Validate a request, persist its queued record and start downloading.
    ///
    /// Returns the record as first persisted plus the pipeline's event
    /// stream. Parameter and persistence failures are returned here and no
    /// pipeline is started; fetch failures arrive as an `ERROR` terminal
    /// event instead.
    pub async fn prepare_package(
        &self,
        request: PrepareRequest,
    ) -> PackageResult<(PackageRecord, PackageEvents)> {
        let mut record = request.into_record(&self.config)?;

        if let Some(existing) = self.store.find_by_id(&record.package_id)? {
            record.created_at = existing.created_at;
            record.updated_at = record.updated_at.max(existing.updated_at);
            record.last_validated_at = existing.last_validated_at;
            if existing.is_ready() {
                record.status = PackageStatus::UpdateAvailable;
            }
        }

        self.store.upsert(&record)?;
        info!(
            package_id = %record.package_id,
            status = %record.status,
            min_zoom = record.min_zoom,
            max_zoom = record.max_zoom,
            "Package queued"
        );

        let (sink, events) =
            EventSink::channel(&record.package_id, Operation::Download, self.fanout.clone());
        sink.progress(record.status, 0);

        tokio::spawn(self.clone().run_download(record.clone(), sink));
        Ok((record, events))
    }

    /// Re-check a stored package against the asset stores.
    ///
    /// An inconclusive snapshot leaves the record untouched and returns
    /// [`PackageError::InconclusiveSnapshot`], so a store that is slow to
    /// answer never downgrades a ready package.
    pub async fn revalidate(&self, package_id: &str) -> PackageResult<PackageRecord> {
        let mut record = self
            .store
            .find_by_id(package_id)?
            .ok_or_else(|| PackageError::NotFound(package_id.to_string()))?;

        if record.status == PackageStatus::Removing {
            warn!(package_id = %package_id, "Package is being removed, not revalidating");
            return Ok(record);
        }

        let snapshot = self.inspector.snapshot().await;
        if !snapshot.is_conclusive() {
            warn!(package_id = %package_id, "Snapshot inconclusive, record left unchanged");
            return Err(PackageError::InconclusiveSnapshot);
        }

        let verdict = validate(&record, &snapshot);
        apply_validation(&mut record, &verdict);
        self.store.upsert(&record)?;
        info!(
            package_id = %package_id,
            status = %record.status,
            "Package revalidated"
        );

        EventSink::detached(package_id, Operation::Validation, self.fanout.clone())
            .finish(&record, Some(COMPLETE_PROGRESS));
        Ok(record)
    }

    /// Settle records left in flight by a previous process.
    ///
    /// Download states are re-classified against a fresh snapshot; removals
    /// are run again to completion. Call once at startup.
    pub async fn recover(&self) -> PackageResult<RecoveryReport> {
        let records = self.store.read_all()?;
        let mut report = RecoveryReport::default();

        let (in_flight, removing): (Vec<_>, Vec<_>) = records
            .into_iter()
            .filter(|r| r.status.is_download_in_flight() || r.status == PackageStatus::Removing)
            .partition(|r| r.status.is_download_in_flight());

        if !in_flight.is_empty() {
            let snapshot = self.inspector.snapshot().await;
            for record in in_flight {
                self.recover_download(record, &snapshot, &mut report)?;
            }
        }

        for record in removing {
            info!(package_id = %record.package_id, "Resuming interrupted removal");
            let sink =
                EventSink::detached(&record.package_id, Operation::Removal, self.fanout.clone());
            report.removed.push(record.package_id.clone());
            self.clone().run_removal(record, sink).await;
        }

        if !report.is_empty() {
            info!(
                revalidated = report.revalidated.len(),
                removed = report.removed.len(),
                skipped = report.skipped.len(),
                "Recovery finished"
            );
        }
        Ok(report)
    }

    fn recover_download(
        &self,
        mut record: PackageRecord,
        snapshot: &AssetSnapshot,
        report: &mut RecoveryReport,
    ) -> PackageResult<()> {
        if !snapshot.is_conclusive() {
            warn!(
                package_id = %record.package_id,
                status = %record.status,
                "Cannot recover package, snapshot inconclusive"
            );
            report.skipped.push(record.package_id);
            return Ok(());
        }

        let previous = record.status;
        let verdict = validate(&record, snapshot);
        apply_validation(&mut record, &verdict);
        self.store.upsert(&record)?;
        info!(
            package_id = %record.package_id,
            from = %previous,
            to = %record.status,
            "Recovered interrupted download"
        );

        EventSink::detached(&record.package_id, Operation::Validation, self.fanout.clone())
            .finish(&record, Some(COMPLETE_PROGRESS));
        report.revalidated.push((record.package_id, record.status));
        Ok(())
    }
}

/// Copy a verdict into the record and classify it.
fn apply_validation(record: &mut PackageRecord, result: &ValidationResult) {
    record.readiness = result.flags;
    if result.is_ready() {
        record.set_status(PackageStatus::Ready);
    } else {
        record.status = PackageStatus::Incomplete;
        record.error_message = result.error_message.clone();
    }
    record.mark_validated();
}
