//! External-facing package operations.
//!
//! [`PackageService`] is what a UI bridge or the CLI talks to. It turns
//! requests into controller calls and serves reads from a [`SessionCache`].

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::broadcast;

use crate::controller::{
    PackageController, PackageError, PackageEvent, PackageEvents, PackageResult, PrepareRequest,
    RecoveryReport,
};
use crate::package::PackageRecord;
use crate::session::SessionCache;

/// Result of a prepare call.
#[derive(Debug)]
pub struct PrepareTicket {
    /// The record as first persisted.
    pub record: PackageRecord,
    pub events: PackageEvents,
}

/// Result of a remove call.
#[derive(Debug)]
pub struct RemoveTicket {
    /// False when no such package existed.
    pub removed: bool,
    pub events: Option<PackageEvents>,
}

/// Overview of every stored package.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSummary {
    pub packages: Vec<PackageRecord>,
    pub total_count: usize,
    pub ready_count: usize,
}

/// Command surface over the package controller.
pub struct PackageService {
    controller: PackageController,
    cache: SessionCache,
}

impl PackageService {
    pub fn new(controller: PackageController) -> Self {
        let cache = SessionCache::new(Arc::clone(controller.store()));
        Self { controller, cache }
    }

    pub fn controller(&self) -> &PackageController {
        &self.controller
    }

    /// Start preparing a package.
    pub async fn prepare_package(&self, request: PrepareRequest) -> PackageResult<PrepareTicket> {
        let (record, events) = self.controller.prepare_package(request).await?;
        Ok(PrepareTicket { record, events })
    }

    /// Every stored package.
    pub fn list_packages(&self) -> PackageResult<Vec<PackageRecord>> {
        Ok(self.cache.records()?.as_ref().clone())
    }

    /// One stored package.
    pub fn get_package(&self, package_id: &str) -> PackageResult<Option<PackageRecord>> {
        Ok(self.cache.get(package_id)?)
    }

    /// Start removing a package. Unknown ids are not an error.
    pub async fn remove_package(&self, package_id: &str) -> PackageResult<RemoveTicket> {
        match self.controller.remove_package(package_id).await {
            Ok(events) => Ok(RemoveTicket {
                removed: true,
                events: Some(events),
            }),
            Err(PackageError::NotFound(_)) => Ok(RemoveTicket {
                removed: false,
                events: None,
            }),
            Err(e) => Err(e),
        }
    }

    /// Counts plus every stored package.
    pub fn get_status(&self) -> PackageResult<StatusSummary> {
        let packages = self.list_packages()?;
        let ready_count = packages.iter().filter(|p| p.is_ready()).count();
        Ok(StatusSummary {
            total_count: packages.len(),
            ready_count,
            packages,
        })
    }

    pub async fn revalidate(&self, package_id: &str) -> PackageResult<PackageRecord> {
        self.controller.revalidate(package_id).await
    }

    /// Settle records an earlier process left mid-pipeline.
    ///
    /// The blob may have been written by that process, so the session
    /// mirror is dropped and the next read goes to the store.
    pub async fn recover(&self) -> PackageResult<RecoveryReport> {
        self.cache.invalidate();
        self.controller.recover().await
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PackageEvent> {
        self.controller.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::MemoryAssetStore;
    use crate::controller::ControllerConfig;
    use crate::package::{Bounds, PackageStatus};
    use crate::store::{MemoryBlobStorage, RecordStore};

    fn service() -> PackageService {
        let controller = PackageController::new(
            Arc::new(RecordStore::new(Arc::new(MemoryBlobStorage::new()))),
            Arc::new(MemoryAssetStore::new()),
            Arc::new(MemoryAssetStore::new()),
            ControllerConfig::default(),
        );
        PackageService::new(controller)
    }

    fn request(id: &str, complete: bool) -> PrepareRequest {
        let request = PrepareRequest::new(id, Bounds::new(-49.0, -22.0, -48.5, -21.5))
            .with_boundary("{}");
        if complete {
            request.with_traps("{}")
        } else {
            request
        }
    }

    #[tokio::test]
    async fn test_status_counts_ready_packages() {
        let service = service();
        for (id, complete) in [("a", true), ("b", false), ("c", true)] {
            let ticket = service.prepare_package(request(id, complete)).await.unwrap();
            ticket.events.wait_terminal().await.unwrap();
        }

        let status = service.get_status().unwrap();

        assert_eq!(status.total_count, 3);
        assert_eq!(status.ready_count, 2);
        let b = status.packages.iter().find(|p| p.package_id == "b").unwrap();
        assert_eq!(b.status, PackageStatus::Incomplete);
        assert_eq!(b.error_message.as_deref(), Some("trap data missing"));
    }

    #[tokio::test]
    async fn test_list_sees_queued_record_immediately() {
        let service = service();
        let ticket = service.prepare_package(request("a", true)).await.unwrap();

        assert!(service.get_package("a").unwrap().is_some());
        ticket.events.wait_terminal().await.unwrap();
        assert!(service.get_package("a").unwrap().unwrap().is_ready());
    }

    #[tokio::test]
    async fn test_remove_unknown_reports_not_removed() {
        let service = service();
        let ticket = service.remove_package("ghost").await.unwrap();
        assert!(!ticket.removed);
        assert!(ticket.events.is_none());
    }

    #[tokio::test]
    async fn test_remove_then_list_is_empty() {
        let service = service();
        let ticket = service.prepare_package(request("a", true)).await.unwrap();
        ticket.events.wait_terminal().await.unwrap();

        let removal = service.remove_package("a").await.unwrap();
        assert!(removal.removed);
        removal.events.unwrap().wait_terminal().await.unwrap();

        assert!(service.list_packages().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_subscribe_sees_pipeline_events() {
        let service = service();
        let mut listener = service.subscribe();

        let ticket = service.prepare_package(request("a", true)).await.unwrap();
        ticket.events.wait_terminal().await.unwrap();

        let mut saw_terminal = false;
        while let Ok(event) = listener.try_recv() {
            assert_eq!(event.package_id, "a");
            saw_terminal |= event.terminal;
        }
        assert!(saw_terminal);
    }

    #[tokio::test]
    async fn test_recover_rereads_blob_written_elsewhere() {
        let storage = Arc::new(MemoryBlobStorage::new());
        let service = PackageService::new(PackageController::new(
            Arc::new(RecordStore::new(storage.clone())),
            Arc::new(MemoryAssetStore::new()),
            Arc::new(MemoryAssetStore::new()),
            ControllerConfig::default(),
        ));
        assert!(service.list_packages().unwrap().is_empty());

        // Another process finished a package without this one noticing
        let mut stale = PackageRecord::new(
            "a",
            "a",
            "style",
            Bounds::new(-49.0, -22.0, -48.5, -21.5),
            10,
            14,
        );
        stale.status = PackageStatus::Ready;
        let blob = serde_json::to_string(&vec![stale]).unwrap();
        crate::store::BlobStorage::save(storage.as_ref(), crate::store::PACKAGES_KEY, &blob)
            .unwrap();

        let report = service.recover().await.unwrap();

        assert!(report.is_empty());
        let listed = service.list_packages().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].status, PackageStatus::Ready);
    }
}
