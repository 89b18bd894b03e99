//! Upstream factory for dependency injection.
//!
//! Builds the configured [`UpstreamClient`] implementation behind an
//! `Arc<dyn UpstreamClient>` so the HTTP layer never names a concrete type.

use std::str::FromStr;
use std::sync::Arc;
#[cfg(feature = "http-upstream")]
use std::time::Duration;

use super::error::{UpstreamError, UpstreamResult};
#[cfg(feature = "http-upstream")]
use super::http::HttpUpstream;
use super::local::LocalUpstream;
use super::UpstreamClient;
use crate::config::UpstreamSettings;

/// Upstream implementation selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamType {
    /// In-memory catalog
    Local,
    /// Remote JSON catalog reached over HTTP
    Http,
}

impl FromStr for UpstreamType {
    type Err = String;

    /// Parse upstream type from string ("local", "http").
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "local" | "memory" => Ok(Self::Local),
            "http" | "remote" => Ok(Self::Http),
            _ => Err(format!("Unknown upstream type: {}", s)),
        }
    }
}

/// Factory for creating upstream instances.
pub struct UpstreamFactory;

impl UpstreamFactory {
    /// Create an upstream client from settings.
    ///
    /// # Errors
    /// Returns `UpstreamError::Configuration` when the type is unknown, when an
    /// `http` upstream has no base URL, when the `http-upstream` feature is
    /// disabled, or when local fixtures cannot be loaded.
    pub fn create(settings: &UpstreamSettings) -> UpstreamResult<Arc<dyn UpstreamClient>> {
        let upstream_type = settings
            .upstream_type()
            .map_err(UpstreamError::configuration)?;

        match upstream_type {
            UpstreamType::Local => {
                let local = match settings.fixtures.as_deref() {
                    Some(path) => LocalUpstream::from_file(path)?,
                    None => LocalUpstream::sample(),
                };
                Ok(Arc::new(local))
            }
            UpstreamType::Http => {
                #[cfg(feature = "http-upstream")]
                {
                    let base_url = settings.base_url.as_deref().ok_or_else(|| {
                        UpstreamError::configuration("http upstream requires 'upstream.base_url'")
                    })?;
                    let client =
                        HttpUpstream::new(base_url, Duration::from_millis(settings.timeout_ms))?;
                    Ok(Arc::new(client))
                }
                #[cfg(not(feature = "http-upstream"))]
                {
                    Err(UpstreamError::configuration(
                        "http upstream feature not enabled",
                    ))
                }
            }
        }
    }

    /// Create the built-in sample catalog.
    pub fn create_local() -> Arc<dyn UpstreamClient> {
        Arc::new(LocalUpstream::sample())
    }
}
