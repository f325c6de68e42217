//! Common setup shared across CLI commands.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use fieldpack::assets::{DiskStyleStore, DiskTileStore, HttpClient, ReqwestClient};
use fieldpack::config::{config_file_path, ConfigFile};
use fieldpack::controller::RecoveryReport;
use fieldpack::logging::{init_logging, LoggingGuard};
use fieldpack::store::{FileBlobStorage, RecordStore};
use fieldpack::{PackageController, PackageService};
use tokio::runtime::Runtime;
use tracing::{info, warn};

use crate::error::CliError;

/// Resolve the config path from `--config` or the default location.
pub fn config_path(cli_path: Option<&Path>) -> PathBuf {
    cli_path.map(Path::to_path_buf).unwrap_or_else(config_file_path)
}

/// Load config, falling back to defaults when the file is absent.
pub fn load_config(cli_path: Option<&Path>) -> Result<ConfigFile, CliError> {
    Ok(ConfigFile::load_from(&config_path(cli_path))?)
}

/// Start file logging as configured.
pub fn start_logging(config: &ConfigFile) -> Result<LoggingGuard, CliError> {
    init_logging(&config.logging.log_dir, &config.logging.log_file)
        .map_err(|e| CliError::LoggingInit(e.to_string()))
}

/// Wire the disk-backed stores into a service.
pub fn build_service(config: &ConfigFile) -> Result<PackageService, CliError> {
    let http: Arc<dyn HttpClient> = Arc::new(
        ReqwestClient::with_timeout(Duration::from_secs(config.assets.http_timeout))
            .map_err(CliError::AssetSetup)?,
    );

    let styles = DiskStyleStore::new(config.style_dir(), Arc::clone(&http))
        .with_access_token(config.assets.access_token.clone());
    let tiles = DiskTileStore::new(config.tile_dir(), http)
        .with_url_template(config.assets.tile_url_template.clone())
        .with_max_tiles(config.assets.max_tiles);

    let store = RecordStore::new(Arc::new(FileBlobStorage::new(&config.storage.data_dir)));
    let controller = PackageController::new(
        Arc::new(store),
        Arc::new(styles),
        Arc::new(tiles),
        config.controller_config(),
    );
    Ok(PackageService::new(controller))
}

/// Everything a package command needs, torn down in field order.
///
/// Opening a session settles whatever an interrupted earlier run left
/// mid-pipeline, so every command sees terminal states only.
///
/// The runtime goes first so the blocking HTTP client inside the service is
/// never dropped from an async context; the logging guard goes last so the
/// final events are flushed.
pub struct Session {
    runtime: Runtime,
    pub service: PackageService,
    /// What startup recovery did.
    pub recovered: RecoveryReport,
    _logging: LoggingGuard,
}

impl Session {
    pub fn open(cli_path: Option<&Path>) -> Result<Self, CliError> {
        let config = load_config(cli_path)?;
        let logging = start_logging(&config)?;
        info!(
            data_dir = %config.storage.data_dir.display(),
            asset_dir = %config.assets.asset_dir.display(),
            "Opening package store"
        );
        let service = build_service(&config)?;
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .map_err(CliError::Runtime)?;

        let recovered = runtime.block_on(service.recover())?;
        if !recovered.skipped.is_empty() {
            warn!(
                skipped = recovered.skipped.len(),
                "Asset stores did not answer, some packages left as they were"
            );
        }

        Ok(Self {
            runtime,
            service,
            recovered,
            _logging: logging,
        })
    }

    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }
}
