//! Relay upstream backed by a remote JSON catalog.
//!
//! Every operation becomes one GET against `base_url`, using the same path
//! layout this gateway exposes under `/api` (`/drama/list`, `/chapter/{bookId}`,
//! `/chapter/{bookId}/{chapterId}`, ...), so `base_url` may point at another
//! gateway's `/api`. The health check is the exception: it hits
//! `{base_url}/health`, while a gateway serves `/health` at its root.
//! Responses wrapped in a `{"success": .., "data": ..}` envelope are unwrapped
//! to their `data`.

use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use std::time::Duration;

use super::error::{ErrorContext, UpstreamError, UpstreamResult};
use super::UpstreamClient;
use crate::api::{BookId, ChapterId, Payload};

/// Longest error body excerpt kept in an error message.
const MAX_ERROR_BODY: usize = 200;

/// HTTP relay [`UpstreamClient`].
#[derive(Debug, Clone)]
pub struct HttpUpstream {
    base_url: Url,
    client: reqwest::Client,
}

impl HttpUpstream {
    /// Create a relay for `base_url` with a per-request timeout.
    pub fn new(base_url: &str, timeout: Duration) -> UpstreamResult<Self> {
        let base_url = Url::parse(base_url).map_err(|e| {
            UpstreamError::configuration(format!("Invalid upstream base URL '{}': {}", base_url, e))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(UpstreamError::configuration(format!(
                "Upstream base URL '{}' cannot carry a path",
                base_url
            )));
        }
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| UpstreamError::configuration(format!("HTTP client: {}", e)))?;
        Ok(Self { base_url, client })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url(&self, segments: &[&str]) -> UpstreamResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| UpstreamError::configuration("upstream base URL cannot carry a path"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get(
        &self,
        segments: &[&str],
        query: &[(&str, String)],
        context: ErrorContext,
    ) -> UpstreamResult<Payload> {
        let url = self.url(segments)?;
        log::debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| classify(e, context.clone()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(UpstreamError::not_found("resource not found upstream", context));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let excerpt: String = body.chars().take(MAX_ERROR_BODY).collect();
            return Err(UpstreamError::status(status.as_u16(), excerpt, context));
        }

        let body: Payload = response
            .json()
            .await
            .map_err(|e| UpstreamError::decode(e.to_string(), context.clone()))?;
        unwrap_envelope(body, context)
    }

    async fn get_list(
        &self,
        segments: &[&str],
        query: &[(&str, String)],
        context: ErrorContext,
    ) -> UpstreamResult<Vec<Payload>> {
        match self.get(segments, query, context.clone()).await? {
            Payload::Array(items) => Ok(items),
            other => Err(UpstreamError::decode(
                format!("expected a JSON array, got {}", kind_of(&other)),
                context,
            )),
        }
    }
}

fn classify(err: reqwest::Error, context: ErrorContext) -> UpstreamError {
    if err.is_timeout() {
        UpstreamError::timeout(err.to_string(), context)
    } else if err.is_connect() {
        UpstreamError::connection(err.to_string(), context)
    } else if err.is_decode() {
        UpstreamError::decode(err.to_string(), context)
    } else {
        UpstreamError::internal(err.to_string(), context)
    }
}

/// Strip a `{"success": true, "data": ..}` wrapper; surface `success: false`
/// as an error.
fn unwrap_envelope(body: Payload, context: ErrorContext) -> UpstreamResult<Payload> {
    let success = match body.get("success").and_then(Payload::as_bool) {
        Some(flag) => flag,
        None => return Ok(body),
    };
    let mut body = body;
    if !success {
        let message = body
            .get("error")
            .and_then(Payload::as_str)
            .unwrap_or("upstream reported failure")
            .to_string();
        return Err(UpstreamError::internal(message, context));
    }
    Ok(body
        .as_object_mut()
        .and_then(|o| o.remove("data"))
        .unwrap_or(Payload::Null))
}

fn kind_of(value: &Payload) -> &'static str {
    match value {
        Payload::Null => "null",
        Payload::Bool(_) => "a boolean",
        Payload::Number(_) => "a number",
        Payload::String(_) => "a string",
        Payload::Array(_) => "an array",
        Payload::Object(_) => "an object",
    }
}

fn flag(value: bool) -> String {
    value.to_string()
}

#[async_trait]
impl UpstreamClient for HttpUpstream {
    async fn fetch_drama_list(&self, page_no: u32, log: bool) -> UpstreamResult<Vec<Payload>> {
        self.get_list(
            &["drama", "list"],
            &[("pageNo", page_no.to_string()), ("log", flag(log))],
            ErrorContext::new("fetch_drama_list"),
        )
        .await
    }

    async fn fetch_categories(&self, page_no: u32) -> UpstreamResult<Payload> {
        self.get(
            &["drama", "categories"],
            &[("pageNo", page_no.to_string())],
            ErrorContext::new("fetch_categories"),
        )
        .await
    }

    async fn fetch_category_books(
        &self,
        type_two_id: i64,
        page_no: u32,
    ) -> UpstreamResult<Vec<Payload>> {
        let id = type_two_id.to_string();
        self.get_list(
            &["drama", "category", &id],
            &[("pageNo", page_no.to_string())],
            ErrorContext::new("fetch_category_books").with_resource(&id),
        )
        .await
    }

    async fn fetch_recommended(&self, log: bool) -> UpstreamResult<Vec<Payload>> {
        self.get_list(
            &["drama", "recommended"],
            &[("log", flag(log))],
            ErrorContext::new("fetch_recommended"),
        )
        .await
    }

    async fn fetch_drama_detail(
        &self,
        book_id: &BookId,
        need_recommend: bool,
    ) -> UpstreamResult<Payload> {
        self.get(
            &["drama", book_id.as_str()],
            &[("needRecommend", flag(need_recommend))],
            ErrorContext::new("fetch_drama_detail").with_resource(book_id),
        )
        .await
    }

    async fn fetch_drama_detail_v2(&self, book_id: &BookId) -> UpstreamResult<Payload> {
        self.get(
            &["drama", book_id.as_str(), "v2"],
            &[],
            ErrorContext::new("fetch_drama_detail_v2").with_resource(book_id),
        )
        .await
    }

    async fn fetch_chapter_list(
        &self,
        book_id: &BookId,
        log: bool,
    ) -> UpstreamResult<Vec<Payload>> {
        self.get_list(
            &["chapter", book_id.as_str()],
            &[("log", flag(log))],
            ErrorContext::new("fetch_chapter_list").with_resource(book_id),
        )
        .await
    }

    async fn fetch_chapter(
        &self,
        book_id: &BookId,
        chapter_id: &ChapterId,
    ) -> UpstreamResult<Payload> {
        let chapter = chapter_id.to_string();
        self.get(
            &["chapter", book_id.as_str(), &chapter],
            &[],
            ErrorContext::new("fetch_chapter").with_resource(&chapter),
        )
        .await
    }

    async fn search(&self, keyword: &str, log: bool) -> UpstreamResult<Vec<Payload>> {
        self.get_list(
            &["search"],
            &[("keyword", keyword.to_string()), ("log", flag(log))],
            ErrorContext::new("search"),
        )
        .await
    }

    async fn fetch_hot_searches(&self, log: bool) -> UpstreamResult<Vec<Payload>> {
        self.get_list(
            &["search", "hot"],
            &[("log", flag(log))],
            ErrorContext::new("fetch_hot_searches"),
        )
        .await
    }

    async fn health_check(&self) -> UpstreamResult<bool> {
        let url = self.url(&["health"])?;
        match self.client.get(url).send().await {
            Ok(response) => Ok(response.status().is_success()),
            Err(e) if e.is_connect() || e.is_timeout() => Ok(false),
            Err(e) => Err(classify(e, ErrorContext::new("health_check"))),
        }
    }
}
