//! Crawler module for harvesting card pages
//!
//! This module contains the crawl pipeline, including:
//! - Transports for static and rendered retrieval
//! - The polite fetcher (rate limit, timeouts, retries, block detection)
//! - The frontier of pending list and detail pages
//! - The writer that commits records and hands off assets
//! - The session controller that drives all of the above

mod assets;
mod coordinator;
mod fetcher;
mod frontier;
mod rate_limit;
mod retry;
mod transport;
mod writer;

pub use assets::{AssetError, AssetStore, FsAssetStore};
pub use coordinator::{Session, SessionOptions, SessionReport, SessionSnapshot, StopSignal};
pub use fetcher::{build_fetcher, build_http_client, FetchError, Fetcher, PoliteFetcher};
pub use frontier::Frontier;
pub use rate_limit::RateLimiter;
pub use retry::RetryPolicy;
pub use transport::{HttpTransport, RawResponse, RenderTransport, Transport, TransportError};
pub use writer::{CommitOutcome, Writer};

use crate::config::Config;
use crate::storage::{open_storage, SessionLock};
use crate::url::CatalogUrls;
use crate::DokkanError;
use std::path::Path;
use std::sync::Arc;

/// Runs one crawl session against the configured dataset
///
/// This is the main entry point for a crawl. It will:
/// 1. Take the dataset lock
/// 2. Open the storage layer
/// 3. Build the fetcher for the configured strategy
/// 4. Run a session until it reaches a terminal state
///
/// # Arguments
///
/// * `config` - The validated configuration
/// * `config_hash` - Hash of the configuration file, recorded with the run
/// * `stop` - Triggered to end the session gracefully
///
/// # Returns
///
/// * `Ok(SessionReport)` - The session ended in `Done`, `BudgetReached` or `Stopped`
/// * `Err(DokkanError)` - The dataset is locked or the session ended in `Fatal`
pub async fn crawl(
    config: &Config,
    config_hash: &str,
    stop: StopSignal,
) -> Result<SessionReport, DokkanError> {
    let database_path = Path::new(&config.output.database_path);
    let _lock = SessionLock::acquire(database_path)?;

    let storage = open_storage(database_path).map_err(|e| DokkanError::IndexCorruption(e.to_string()))?;
    let fetcher = build_fetcher(config)?;
    let urls = CatalogUrls::from_config(&config.source)?;
    let options = SessionOptions::from_config(&config.crawler, config_hash);

    let mut session = Session::new(storage, fetcher, urls, options).with_stop_signal(stop);

    if config.output.download_assets {
        let client = build_http_client(&config.user_agent, config.crawler.request_timeout())?;
        tracing::info!("Downloading card assets into {}", config.output.assets_dir);
        session = session.with_asset_store(Arc::new(FsAssetStore::new(
            client,
            &config.output.assets_dir,
        )));
    }

    session.run().await
}

/// Triggers `stop` when the process receives Ctrl-C
pub fn stop_on_ctrl_c(stop: StopSignal) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, finishing the current batch");
            stop.trigger();
        }
    });
}
