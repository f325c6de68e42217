//! The package record store.

use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, error, warn};

use super::blob::BlobStorage;
use super::StoreError;
use crate::package::PackageRecord;

/// Storage key holding the package collection.
pub const PACKAGES_KEY: &str = "packages";

/// Durable collection of [`PackageRecord`]s keyed by `package_id`.
///
/// Reads tolerate damage: entries that fail to parse are logged and skipped,
/// but they are kept verbatim in the blob when other records are written, so
/// a newer build's records survive a round trip through an older one.
pub struct RecordStore {
    storage: Arc<dyn BlobStorage>,
    key: String,
    lock: Mutex<()>,
    revision: watch::Sender<u64>,
}

impl RecordStore {
    /// Create a store over `storage` using the default key.
    pub fn new(storage: Arc<dyn BlobStorage>) -> Self {
        Self::with_key(storage, PACKAGES_KEY)
    }

    /// Create a store over `storage` using a custom key.
    pub fn with_key(storage: Arc<dyn BlobStorage>, key: impl Into<String>) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            storage,
            key: key.into(),
            lock: Mutex::new(()),
            revision,
        }
    }

    /// Current write revision. Starts at zero.
    pub fn revision(&self) -> u64 {
        *self.revision.borrow()
    }

    /// Watch the write revision.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    /// All readable records in stored order.
    pub fn read_all(&self) -> Result<Vec<PackageRecord>, StoreError> {
        let _guard = self.lock.lock();
        let entries = self.load_entries()?;
        Ok(entries.into_iter().filter_map(parse_entry).collect())
    }

    /// Find a record by id.
    pub fn find_by_id(&self, package_id: &str) -> Result<Option<PackageRecord>, StoreError> {
        Ok(self
            .read_all()?
            .into_iter()
            .find(|r| r.package_id == package_id))
    }

    /// Insert or replace a record.
    ///
    /// An existing entry with the same id is replaced in place; otherwise the
    /// record is appended.
    pub fn upsert(&self, record: &PackageRecord) -> Result<(), StoreError> {
        let _guard = self.lock.lock();
        let mut entries = self.load_entries()?;
        let value = serde_json::to_value(record)?;

        match entries
            .iter()
            .position(|e| entry_id(e) == Some(record.package_id.as_str()))
        {
            Some(index) => entries[index] = value,
            None => entries.push(value),
        }

        self.save_entries(&entries)?;
        debug!(
            package_id = %record.package_id,
            status = %record.status,
            "Persisted package record"
        );
        Ok(())
    }

    /// Delete a record by id.
    ///
    /// Returns whether a record was removed. Removing an unknown id succeeds
    /// without touching the blob.
    pub fn remove(&self, package_id: &str) -> Result<bool, StoreError> {
        let _guard = self.lock.lock();
        let mut entries = self.load_entries()?;
        let before = entries.len();
        entries.retain(|e| entry_id(e) != Some(package_id));

        if entries.len() == before {
            return Ok(false);
        }

        self.save_entries(&entries)?;
        debug!(package_id = %package_id, "Removed package record");
        Ok(true)
    }

    fn load_entries(&self) -> Result<Vec<Value>, StoreError> {
        let Some(raw) = self.storage.load(&self.key)? else {
            return Ok(Vec::new());
        };
        if raw.trim().is_empty() {
            return Ok(Vec::new());
        }

        match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Array(entries)) => Ok(entries),
            Ok(_) => {
                error!(key = %self.key, "Stored package blob is not an array, ignoring it");
                Ok(Vec::new())
            }
            Err(e) => {
                error!(key = %self.key, error = %e, "Failed to parse stored package blob");
                Ok(Vec::new())
            }
        }
    }

    fn save_entries(&self, entries: &[Value]) -> Result<(), StoreError> {
        let raw = serde_json::to_string(entries)?;
        self.storage.save(&self.key, &raw)?;
        self.revision.send_modify(|r| *r += 1);
        Ok(())
    }
}

fn entry_id(entry: &Value) -> Option<&str> {
    entry.get("packageId").and_then(Value::as_str)
}

fn parse_entry(entry: Value) -> Option<PackageRecord> {
    let id = entry_id(&entry).map(str::to_string);
    match serde_json::from_value::<PackageRecord>(entry) {
        Ok(record) if record.package_id.trim().is_empty() => {
            warn!("Skipping stored package entry with blank id");
            None
        }
        Ok(record) => Some(record.normalize()),
        Err(e) => {
            warn!(
                package_id = id.as_deref().unwrap_or("<unknown>"),
                error = %e,
                "Skipping malformed package entry"
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::{Bounds, PackageStatus};
    use crate::store::MemoryBlobStorage;

    fn record(id: &str) -> PackageRecord {
        PackageRecord::new(
            id,
            id,
            "mapbox://styles/test/sat",
            Bounds::new(-49.0, -22.0, -48.5, -21.5),
            10,
            14,
        )
    }

    fn memory_store() -> (Arc<MemoryBlobStorage>, RecordStore) {
        let storage = Arc::new(MemoryBlobStorage::new());
        let store = RecordStore::new(storage.clone());
        (storage, store)
    }

    #[test]
    fn test_empty_store_reads_empty() {
        let (_, store) = memory_store();
        assert!(store.read_all().unwrap().is_empty());
        assert!(store.find_by_id("nope").unwrap().is_none());
    }

    #[test]
    fn test_upsert_then_find_returns_equal_record() {
        let (_, store) = memory_store();
        let written = record("farm1-north");

        store.upsert(&written).unwrap();

        assert_eq!(store.find_by_id("farm1-north").unwrap(), Some(written));
    }

    #[test]
    fn test_upsert_same_id_replaces_in_place() {
        let (_, store) = memory_store();
        store.upsert(&record("a")).unwrap();
        store.upsert(&record("b")).unwrap();
        store.upsert(&record("c")).unwrap();

        let mut updated = record("b");
        updated.set_status(PackageStatus::Ready);
        store.upsert(&updated).unwrap();

        let all = store.read_all().unwrap();
        let ids: Vec<_> = all.iter().map(|r| r.package_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(all[1].status, PackageStatus::Ready);
    }

    #[test]
    fn test_remove_deletes_only_target() {
        let (_, store) = memory_store();
        store.upsert(&record("a")).unwrap();
        store.upsert(&record("b")).unwrap();

        assert!(store.remove("a").unwrap());
        assert!(!store.remove("a").unwrap());

        let ids: Vec<_> = store
            .read_all()
            .unwrap()
            .into_iter()
            .map(|r| r.package_id)
            .collect();
        assert_eq!(ids, vec!["b".to_string()]);
    }

    #[test]
    fn test_malformed_entries_are_skipped_but_preserved() {
        let blob = r#"[
            {"packageId": "good", "status": "ready"},
            {"packageId": "bad", "bounds": "not-an-array"},
            42
        ]"#;
        let storage = Arc::new(MemoryBlobStorage::with_blob(PACKAGES_KEY, blob));
        let store = RecordStore::new(storage.clone());

        let all = store.read_all().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].package_id, "good");

        store.upsert(&record("new")).unwrap();

        let raw: Vec<Value> = serde_json::from_str(&storage.raw(PACKAGES_KEY).unwrap()).unwrap();
        assert_eq!(raw.len(), 4);
        assert_eq!(store.read_all().unwrap().len(), 2);
    }

    #[test]
    fn test_non_array_blob_reads_empty() {
        let storage = Arc::new(MemoryBlobStorage::with_blob(PACKAGES_KEY, "{oops"));
        let store = RecordStore::new(storage);
        assert!(store.read_all().unwrap().is_empty());
    }

    #[test]
    fn test_write_failure_surfaces_and_keeps_revision() {
        let (storage, store) = memory_store();
        store.upsert(&record("a")).unwrap();
        assert_eq!(store.revision(), 1);

        storage.set_read_only(true);
        assert!(store.upsert(&record("b")).is_err());
        assert_eq!(store.revision(), 1);
        assert_eq!(store.read_all().unwrap().len(), 1);
    }

    #[test]
    fn test_revision_advances_on_every_write() {
        let (_, store) = memory_store();
        let rx = store.subscribe();

        store.upsert(&record("a")).unwrap();
        store.upsert(&record("a")).unwrap();
        store.remove("a").unwrap();

        assert_eq!(store.revision(), 3);
        assert_eq!(*rx.borrow(), 3);
    }
}
