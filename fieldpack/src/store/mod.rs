//! Durable package record persistence.
//!
//! All records live in a single serialized JSON array stored under one key of
//! a [`BlobStorage`]. There are no per-record files: every write rewrites the
//! whole collection while holding the store lock, so the blob on disk is
//! always a complete snapshot.
//!
//! ```text
//! RecordStore ──► BlobStorage (trait)
//!                  ├── FileBlobStorage   <dir>/<key>.json, temp + rename
//!                  └── MemoryBlobStorage in-process map
//! ```
//!
//! Every successful write bumps a revision counter that readers can watch;
//! the session cache uses it to know when its mirror is stale.

mod blob;
mod records;

use std::io;

use thiserror::Error;

pub use blob::{BlobStorage, FileBlobStorage, MemoryBlobStorage};
pub use records::{RecordStore, PACKAGES_KEY};

/// Errors raised by the record store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The storage medium failed.
    #[error("storage I/O error for '{key}': {source}")]
    Io {
        key: String,
        #[source]
        source: io::Error,
    },

    /// A record could not be turned into JSON.
    #[error("failed to serialize package records: {0}")]
    Serialize(#[from] serde_json::Error),
}
