//! # DramaBox Gateway
//!
//! JSON façade over a short-drama catalog, built around a batch chapter
//! downloader.
//!
//! ## Features
//!
//! - **Catalog relay**: drama lists, categories, recommendations, details,
//!   chapter lists, search and hot searches, each wrapped in a uniform
//!   `{success, data | error}` envelope
//! - **Batch download**: fetch many chapters of one book concurrently, keep
//!   request order, report per-chapter failures instead of failing the batch
//! - **Pretty printing**: `pretty=true`, `format=pretty` or `p=1` on any
//!   request, with an optional `indent`
//!
//! ## Architecture
//!
//! - [`api`]: identifiers and the opaque payload type
//! - [`upstream`]: the catalog client trait, its local and HTTP implementations
//! - [`batch`]: the batch fetch orchestrator
//! - [`config`]: server and gateway configuration
//! - [`http`]: Axum-based HTTP server and request handlers

pub mod api;
pub mod batch;
pub mod config;
pub mod upstream;

#[cfg(feature = "http-server")]
pub mod http;
