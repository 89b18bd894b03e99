//! HTTP server module for the gateway.
//!
//! Exposes the upstream catalog and the batch orchestrator as a JSON REST API.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │  HTTP Layer (axum handlers)                               │
//! │  - Query/path/body extraction and validation              │
//! │  - Response envelope, pretty printing                     │
//! │  - CORS, compression, tracing, panic recovery             │
//! └───────────────────┬──────────────────────────────────────┘
//!                     │
//! ┌───────────────────▼──────────────────────────────────────┐
//! │  Batch orchestrator (batch/)                              │
//! │  - Concurrent per-chapter fan-out, ordered fan-in         │
//! └───────────────────┬──────────────────────────────────────┘
//!                     │
//! ┌───────────────────▼──────────────────────────────────────┐
//! │  Upstream client (upstream/)                              │
//! │  - LocalUpstream / HttpUpstream                           │
//! └──────────────────────────────────────────────────────────┘
//! ```

pub mod dto;
pub mod envelope;
pub mod error;
pub mod handlers;
pub mod router;
pub mod state;

pub use envelope::{Envelope, PrettyOptions};
pub use error::AppError;
pub use router::create_router;
pub use state::AppState;
