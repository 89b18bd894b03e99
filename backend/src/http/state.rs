//! Application state for the HTTP server.

use std::sync::Arc;
use std::time::Instant;

use crate::batch::BatchFetcher;
use crate::config::{BatchSettings, GatewayConfig, ServerConfig};
use crate::upstream::UpstreamClient;

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Catalog backend for single-resource endpoints
    pub upstream: Arc<dyn UpstreamClient>,
    /// Batch orchestrator sharing the same upstream
    pub fetcher: BatchFetcher,
    /// Longest accepted `chapterIdList`
    pub max_batch_size: usize,
    /// Reported by `/api/stats`
    pub server: ServerConfig,
    pub started_at: Instant,
}

impl AppState {
    /// State with default server and batch settings.
    pub fn new(upstream: Arc<dyn UpstreamClient>) -> Self {
        Self::from_config(upstream, &GatewayConfig::default(), ServerConfig::default())
    }

    pub fn from_config(
        upstream: Arc<dyn UpstreamClient>,
        config: &GatewayConfig,
        server: ServerConfig,
    ) -> Self {
        Self::with_batch_settings(upstream, &config.batch, server)
    }

    pub fn with_batch_settings(
        upstream: Arc<dyn UpstreamClient>,
        batch: &BatchSettings,
        server: ServerConfig,
    ) -> Self {
        let fetcher = BatchFetcher::new(Arc::clone(&upstream)).with_deadline(batch.deadline());
        Self {
            upstream,
            fetcher,
            max_batch_size: batch.max_batch_size,
            server,
            started_at: Instant::now(),
        }
    }
}
