//! Upstream catalog client.
//!
//! The gateway never parses or scrapes catalog content itself. Everything it
//! serves comes from an [`UpstreamClient`], selected at startup through the
//! [`UpstreamFactory`]:
//!
//! - [`LocalUpstream`]: in-memory catalog for development and tests
//! - `HttpUpstream`: relay to a remote JSON catalog (feature `http-upstream`)

use async_trait::async_trait;

use crate::api::{BookId, ChapterId, Payload};

pub mod error;
pub mod factory;
#[cfg(feature = "http-upstream")]
pub mod http;
pub mod local;

pub use error::{ErrorContext, UpstreamError, UpstreamResult};
pub use factory::{UpstreamFactory, UpstreamType};
#[cfg(feature = "http-upstream")]
pub use http::HttpUpstream;
pub use local::{LocalBook, LocalUpstream};

/// Catalog operations consumed by the HTTP layer and the batch orchestrator.
///
/// Each call is independent and may fail on its own. The `log` flags are
/// forwarded from the caller untouched; implementations may use them to raise
/// their own verbosity for that call.
///
/// # Thread Safety
/// Implementations must be `Send + Sync`; one instance is shared by every
/// request and every concurrent batch item.
#[async_trait]
pub trait UpstreamClient: Send + Sync {
    /// One page of the drama listing (`page_no` is 1-based).
    async fn fetch_drama_list(&self, page_no: u32, log: bool) -> UpstreamResult<Vec<Payload>>;

    /// One page of the category listing.
    async fn fetch_categories(&self, page_no: u32) -> UpstreamResult<Payload>;

    /// Books belonging to a second-level category.
    async fn fetch_category_books(
        &self,
        type_two_id: i64,
        page_no: u32,
    ) -> UpstreamResult<Vec<Payload>>;

    async fn fetch_recommended(&self, log: bool) -> UpstreamResult<Vec<Payload>>;

    async fn fetch_drama_detail(
        &self,
        book_id: &BookId,
        need_recommend: bool,
    ) -> UpstreamResult<Payload>;

    async fn fetch_drama_detail_v2(&self, book_id: &BookId) -> UpstreamResult<Payload>;

    /// All chapters of a book, in reading order.
    async fn fetch_chapter_list(&self, book_id: &BookId, log: bool)
        -> UpstreamResult<Vec<Payload>>;

    /// A single chapter. This is the unit of work of a batch download.
    async fn fetch_chapter(&self, book_id: &BookId, chapter_id: &ChapterId)
        -> UpstreamResult<Payload>;

    async fn search(&self, keyword: &str, log: bool) -> UpstreamResult<Vec<Payload>>;

    async fn fetch_hot_searches(&self, log: bool) -> UpstreamResult<Vec<Payload>>;

    /// Whether the upstream is currently reachable.
    async fn health_check(&self) -> UpstreamResult<bool>;
}
