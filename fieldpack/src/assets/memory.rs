//! In-memory asset store.
//!
//! Holds asset ids in a set and never touches the network. Every outcome can
//! be scripted, which makes it the building block for pipeline tests.

use std::future;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

use parking_lot::Mutex;

use super::{
    AssetError, BoxFuture, LoadProgress, ProgressFn, StyleAsset, StyleAssetStore,
    StyleFetchOptions, TileAsset, TileAssetStore, TileRegionRequest,
};

const DEFAULT_RESOURCE_COUNT: u64 = 4;

/// Scriptable in-memory store. Implements both [`StyleAssetStore`] and
/// [`TileAssetStore`]; use one instance per role.
pub struct MemoryAssetStore {
    present: Mutex<Vec<String>>,
    fetch_error: Mutex<Option<AssetError>>,
    remove_error: Mutex<Option<AssetError>>,
    list_error: Mutex<Option<AssetError>>,
    hang_remove: AtomicBool,
    hang_list: AtomicBool,
    keep_on_fetch: AtomicBool,
    resource_count: AtomicU64,
    fetch_calls: AtomicUsize,
    remove_calls: AtomicUsize,
    style_options: Mutex<Vec<StyleFetchOptions>>,
    tile_requests: Mutex<Vec<TileRegionRequest>>,
}

impl Default for MemoryAssetStore {
    fn default() -> Self {
        Self {
            present: Mutex::new(Vec::new()),
            fetch_error: Mutex::new(None),
            remove_error: Mutex::new(None),
            list_error: Mutex::new(None),
            hang_remove: AtomicBool::new(false),
            hang_list: AtomicBool::new(false),
            keep_on_fetch: AtomicBool::new(true),
            resource_count: AtomicU64::new(DEFAULT_RESOURCE_COUNT),
            fetch_calls: AtomicUsize::new(0),
            remove_calls: AtomicUsize::new(0),
            style_options: Mutex::new(Vec::new()),
            tile_requests: Mutex::new(Vec::new()),
        }
    }
}

impl MemoryAssetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store already holding `ids`.
    pub fn with_assets<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let store = Self::new();
        for id in ids {
            store.insert(id);
        }
        store
    }

    /// Add an asset id.
    pub fn insert(&self, id: impl Into<String>) {
        let id = id.into();
        let mut present = self.present.lock();
        if !present.contains(&id) {
            present.push(id);
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.present.lock().iter().any(|p| p == id)
    }

    /// Make every fetch fail with `error`.
    pub fn fail_fetch(&self, error: AssetError) {
        *self.fetch_error.lock() = Some(error);
    }

    /// Make every remove fail with `error`.
    pub fn fail_remove(&self, error: AssetError) {
        *self.remove_error.lock() = Some(error);
    }

    /// Make every enumeration fail with `error`.
    pub fn fail_list(&self, error: AssetError) {
        *self.list_error.lock() = Some(error);
    }

    /// Make removals never complete.
    pub fn hang_remove(&self) {
        self.hang_remove.store(true, Ordering::SeqCst);
    }

    /// Make enumerations never complete.
    pub fn hang_list(&self) {
        self.hang_list.store(true, Ordering::SeqCst);
    }

    /// Report success on fetch without recording the asset, like a store
    /// that evicts right after loading.
    pub fn forget_on_fetch(&self) {
        self.keep_on_fetch.store(false, Ordering::SeqCst);
    }

    /// Number of resources each fetch reports. Zero reports a single
    /// `0/0` update.
    pub fn set_resource_count(&self, count: u64) {
        self.resource_count.store(count, Ordering::SeqCst);
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    pub fn remove_calls(&self) -> usize {
        self.remove_calls.load(Ordering::SeqCst)
    }

    /// Options passed to each style fetch, oldest first.
    pub fn style_options(&self) -> Vec<StyleFetchOptions> {
        self.style_options.lock().clone()
    }

    /// Requests passed to each tile fetch, oldest first.
    pub fn tile_requests(&self) -> Vec<TileRegionRequest> {
        self.tile_requests.lock().clone()
    }

    fn run_fetch(&self, id: &str, progress: &ProgressFn) -> Result<u64, AssetError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        let required = self.resource_count.load(Ordering::SeqCst);

        if let Some(error) = self.fetch_error.lock().clone() {
            progress(LoadProgress::new(0, required));
            return Err(error);
        }

        if required == 0 {
            progress(LoadProgress::new(0, 0));
        }
        for completed in 1..=required {
            progress(LoadProgress::new(completed, required));
        }

        if self.keep_on_fetch.load(Ordering::SeqCst) {
            self.insert(id);
        }
        Ok(required)
    }

    async fn run_remove(&self, id: String) -> Result<(), AssetError> {
        self.remove_calls.fetch_add(1, Ordering::SeqCst);
        if self.hang_remove.load(Ordering::SeqCst) {
            future::pending::<()>().await;
        }
        if let Some(error) = self.remove_error.lock().clone() {
            return Err(error);
        }
        self.present.lock().retain(|p| *p != id);
        Ok(())
    }

    async fn run_list(&self) -> Result<Vec<String>, AssetError> {
        if self.hang_list.load(Ordering::SeqCst) {
            future::pending::<()>().await;
        }
        if let Some(error) = self.list_error.lock().clone() {
            return Err(error);
        }
        Ok(self.present.lock().clone())
    }
}

impl StyleAssetStore for MemoryAssetStore {
    fn fetch(
        &self,
        style_reference: &str,
        options: StyleFetchOptions,
        progress: ProgressFn,
    ) -> BoxFuture<'_, Result<StyleAsset, AssetError>> {
        let id = style_reference.to_string();
        Box::pin(async move {
            self.style_options.lock().push(options);
            let count = self.run_fetch(&id, &progress)?;
            Ok(StyleAsset {
                id,
                completed_resources: count,
                required_resources: count,
            })
        })
    }

    fn remove(&self, id: &str) -> BoxFuture<'_, Result<(), AssetError>> {
        Box::pin(self.run_remove(id.to_string()))
    }

    fn list_all(&self) -> BoxFuture<'_, Result<Vec<String>, AssetError>> {
        Box::pin(self.run_list())
    }
}

impl TileAssetStore for MemoryAssetStore {
    fn fetch(
        &self,
        tile_asset_id: &str,
        request: TileRegionRequest,
        progress: ProgressFn,
    ) -> BoxFuture<'_, Result<TileAsset, AssetError>> {
        let id = tile_asset_id.to_string();
        Box::pin(async move {
            self.tile_requests.lock().push(request);
            let count = self.run_fetch(&id, &progress)?;
            Ok(TileAsset {
                id,
                completed_resources: count,
                required_resources: count,
            })
        })
    }

    fn remove(&self, id: &str) -> BoxFuture<'_, Result<(), AssetError>> {
        Box::pin(self.run_remove(id.to_string()))
    }

    fn list_all(&self) -> BoxFuture<'_, Result<Vec<String>, AssetError>> {
        Box::pin(self.run_list())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_fetch_reports_progress_and_records_asset() {
        let store = MemoryAssetStore::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let progress: ProgressFn = Arc::new(move |p: LoadProgress| sink.lock().push(p));

        let asset = StyleAssetStore::fetch(&store, "style-a", StyleFetchOptions::default(), progress)
            .await
            .unwrap();

        assert_eq!(asset.id, "style-a");
        assert!(store.contains("style-a"));
        assert_eq!(seen.lock().last(), Some(&LoadProgress::new(4, 4)));
        assert_eq!(store.fetch_calls(), 1);
    }

    #[tokio::test]
    async fn test_scripted_failures() {
        let store = MemoryAssetStore::with_assets(["a"]);
        store.fail_remove(AssetError::Storage("locked".into()));
        store.fail_list(AssetError::Network("down".into()));

        assert!(StyleAssetStore::remove(&store, "a").await.is_err());
        assert!(store.contains("a"));
        assert!(StyleAssetStore::list_all(&store).await.is_err());
    }

    #[tokio::test]
    async fn test_remove_missing_is_ok() {
        let store = MemoryAssetStore::new();
        assert!(TileAssetStore::remove(&store, "nope").await.is_ok());
        assert_eq!(store.remove_calls(), 1);
    }
}
