//! Server and gateway configuration.
//!
//! Two sources, as in most deployments of this service:
//!
//! - [`ServerConfig`]: bind address and environment name from environment
//!   variables (a `.env` file is honored by the server binary).
//! - [`GatewayConfig`]: upstream selection and batch limits from a TOML file,
//!   with `UPSTREAM_TYPE` / `UPSTREAM_BASE_URL` overriding the file.

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::upstream::UpstreamType;

/// Configuration loading errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Bind address and runtime environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Free-form environment name reported by `/api/stats`
    pub environment: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            environment: "development".to_string(),
        }
    }
}

impl ServerConfig {
    /// Load from environment variables.
    ///
    /// # Environment Variables
    /// - `HOST` (optional, default: `0.0.0.0`)
    /// - `PORT` (optional, default: `3000`)
    /// - `APP_ENV` (optional, default: `development`)
    ///
    /// # Errors
    /// Returns an error if `PORT` is not a valid port number.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let host = env::var("HOST").unwrap_or(defaults.host);
        let port = match env::var("PORT") {
            Ok(raw) => raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid(format!("PORT must be a valid port number, got '{}'", raw)))?,
            Err(_) => defaults.port,
        };
        let environment = env::var("APP_ENV").unwrap_or(defaults.environment);

        Ok(Self {
            host,
            port,
            environment,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Gateway configuration file (`gateway.toml`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default)]
    pub upstream: UpstreamSettings,
    #[serde(default)]
    pub batch: BatchSettings,
}

/// `[upstream]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpstreamSettings {
    /// `local` or `http`
    #[serde(rename = "type", default = "default_upstream_type")]
    pub kind: String,
    /// Remote catalog root (required for `http`)
    #[serde(default)]
    pub base_url: Option<String>,
    /// Per-request timeout for the `http` upstream
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// JSON catalog fixtures for the `local` upstream
    #[serde(default)]
    pub fixtures: Option<PathBuf>,
}

/// `[batch]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSettings {
    /// Overall deadline for one batch download; `0` disables it
    #[serde(default = "default_deadline_ms")]
    pub deadline_ms: u64,
    /// Longest accepted `chapterIdList`
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,
}

fn default_upstream_type() -> String {
    "local".to_string()
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_deadline_ms() -> u64 {
    30_000
}

fn default_max_batch_size() -> usize {
    100
}

impl Default for UpstreamSettings {
    fn default() -> Self {
        Self {
            kind: default_upstream_type(),
            base_url: None,
            timeout_ms: default_timeout_ms(),
            fixtures: None,
        }
    }
}

impl UpstreamSettings {
    pub fn upstream_type(&self) -> Result<UpstreamType, String> {
        UpstreamType::from_str(&self.kind)
    }
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            deadline_ms: default_deadline_ms(),
            max_batch_size: default_max_batch_size(),
        }
    }
}

impl BatchSettings {
    pub fn deadline(&self) -> Option<Duration> {
        (self.deadline_ms > 0).then(|| Duration::from_millis(self.deadline_ms))
    }
}

impl GatewayConfig {
    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Resolve the configuration the server should run with.
    ///
    /// Uses `GATEWAY_CONFIG` when set, otherwise the first `gateway.toml`
    /// found in the current directory, `backend/` or the parent directory,
    /// otherwise built-in defaults. Environment overrides are applied last and
    /// the result is validated.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match env::var("GATEWAY_CONFIG") {
            Ok(path) => Self::from_file(path)?,
            Err(_) => match Self::default_location() {
                Some(path) => Self::from_file(path)?,
                None => Self::default(),
            },
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn default_location() -> Option<PathBuf> {
        [
            PathBuf::from("gateway.toml"),
            PathBuf::from("backend/gateway.toml"),
            PathBuf::from("../gateway.toml"),
        ]
        .into_iter()
        .find(|p| p.exists())
    }

    /// Apply `UPSTREAM_TYPE` and `UPSTREAM_BASE_URL`.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(kind) = env::var("UPSTREAM_TYPE") {
            self.upstream.kind = kind;
        }
        if let Ok(url) = env::var("UPSTREAM_BASE_URL") {
            self.upstream.base_url = Some(url);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let kind = self
            .upstream
            .upstream_type()
            .map_err(ConfigError::Invalid)?;
        if kind == UpstreamType::Http
            && self.upstream.base_url.as_deref().map_or(true, |u| u.trim().is_empty())
        {
            return Err(ConfigError::Invalid(
                "http upstream requires 'upstream.base_url'".to_string(),
            ));
        }
        if self.batch.max_batch_size == 0 {
            return Err(ConfigError::Invalid(
                "'batch.max_batch_size' must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
