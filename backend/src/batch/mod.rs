//! Batch chapter download.
//!
//! A batch names one book and an ordered list of chapter ids. Every chapter is
//! fetched from the upstream concurrently and the answers are reassembled in
//! request order:
//!
//! 1. **Attempt everything, report everything**: a failing chapter becomes a
//!    failure entry and never aborts its siblings.
//! 2. **Positional results**: `results[i]` answers `chapter_ids[i]`, duplicates
//!    included, regardless of completion order.
//! 3. **Bounded wait**: an optional deadline caps the whole batch; chapters
//!    still pending when it fires are reported as timeouts.

mod fetcher;
mod types;

pub use fetcher::BatchFetcher;
pub use types::{
    BatchError, BatchOutcome, BatchRequest, FailureReason, FetchResult, OverallStatus,
};
