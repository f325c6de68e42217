//! Read-through session cache over the record store.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::trace;

use crate::package::PackageRecord;
use crate::store::{RecordStore, StoreError};

struct Cached {
    revision: u64,
    records: Arc<Vec<PackageRecord>>,
}

/// In-memory mirror of the record store for fast UI reads.
///
/// Every read compares the cached revision with the store's; any write since
/// the mirror was filled triggers a reload, so callers never see records older
/// than the last completed write.
pub struct SessionCache {
    store: Arc<RecordStore>,
    cached: Mutex<Option<Cached>>,
}

impl SessionCache {
    pub fn new(store: Arc<RecordStore>) -> Self {
        Self {
            store,
            cached: Mutex::new(None),
        }
    }

    /// All records, reloading from the store when it has changed.
    pub fn records(&self) -> Result<Arc<Vec<PackageRecord>>, StoreError> {
        let mut cached = self.cached.lock();
        let revision = self.store.revision();

        if let Some(c) = cached.as_ref() {
            if c.revision == revision {
                return Ok(Arc::clone(&c.records));
            }
        }

        let records = Arc::new(self.store.read_all()?);
        trace!(revision, count = records.len(), "Session cache reloaded");
        *cached = Some(Cached {
            revision,
            records: Arc::clone(&records),
        });
        Ok(records)
    }

    /// One record by id.
    pub fn get(&self, package_id: &str) -> Result<Option<PackageRecord>, StoreError> {
        Ok(self
            .records()?
            .iter()
            .find(|r| r.package_id == package_id)
            .cloned())
    }

    /// Drop the mirror so the next read goes to the store.
    pub fn invalidate(&self) {
        *self.cached.lock() = None;
    }
}
