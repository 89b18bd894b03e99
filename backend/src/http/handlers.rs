//! HTTP handlers for the REST API.
//!
//! Each public handler extracts its inputs, delegates to a private function
//! returning [`HandlerResult`], and renders that result with
//! [`envelope::format`] so every response (errors included) honors the
//! caller's pretty-print options.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{OriginalUri, Path, Query, State};
use axum::response::Response;
use axum::Json;
use chrono::Utc;
use serde_json::json;

use super::dto::{BatchDownloadRequest, DetailQuery, LogQuery, PageQuery, SearchQuery};
use super::envelope::{self, Envelope, PrettyOptions};
use super::error::AppError;
use super::router::ENDPOINTS;
use super::state::AppState;
use crate::api::{BookId, ChapterId, Payload};
use crate::batch::BatchRequest;

/// Result type for handlers.
pub type HandlerResult = Result<Envelope, AppError>;

const INVALID_BATCH: &str = "Invalid request. Requires bookId and chapterIdList array";
const KEYWORD_REQUIRED: &str = "Keyword is required";

fn list(items: Vec<Payload>) -> (usize, Payload) {
    (items.len(), Payload::Array(items))
}

// =============================================================================
// Service
// =============================================================================

/// GET /
///
/// Endpoint index.
pub async fn index(pretty: PrettyOptions) -> Response {
    let endpoints: Vec<Payload> = ENDPOINTS
        .iter()
        .map(|(method, path, description)| {
            json!({ "method": method, "path": path, "description": description })
        })
        .collect();
    let data = json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": endpoints,
    });
    envelope::format(Ok(Envelope::success(data)), &pretty)
}

/// GET /health
///
/// Liveness plus upstream reachability. Always 200; a dead upstream is
/// reported in the body.
pub async fn health_check(State(state): State<AppState>, pretty: PrettyOptions) -> Response {
    let upstream = match state.upstream.health_check().await {
        Ok(true) => "connected".to_string(),
        Ok(false) => "unavailable".to_string(),
        Err(e) => format!("error: {}", e),
    };
    let data = json!({ "status": "ok", "upstream": upstream });
    envelope::format(Ok(Envelope::success(data)), &pretty)
}

/// GET /api/stats
pub async fn stats(State(state): State<AppState>, pretty: PrettyOptions) -> Response {
    let data = json!({
        "status": "online",
        "timestamp": Utc::now().to_rfc3339(),
        "server": {
            "port": state.server.port,
            "environment": state.server.environment,
            "version": env!("CARGO_PKG_VERSION"),
            "platform": std::env::consts::OS,
            "arch": std::env::consts::ARCH,
        },
        "uptimeSeconds": state.started_at.elapsed().as_secs_f64(),
        "endpoints": {
            "total": ENDPOINTS.len(),
            "active": true,
        },
    });
    envelope::format(Ok(Envelope::success(data)), &pretty)
}

/// Fallback for unknown paths and for known paths hit with the wrong method.
/// Echoes the request target, query string included.
pub async fn not_found(OriginalUri(uri): OriginalUri, pretty: PrettyOptions) -> Response {
    let path = uri
        .path_and_query()
        .map_or_else(|| uri.path().to_string(), |target| target.as_str().to_string());
    envelope::format(Err(AppError::NotFound { path }), &pretty)
}

// =============================================================================
// Dramas
// =============================================================================

/// GET /api/drama/list?pageNo=&log=
pub async fn list_dramas(
    State(state): State<AppState>,
    pretty: PrettyOptions,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> Response {
    envelope::format(drama_list(&state, query).await, &pretty)
}

async fn drama_list(state: &AppState, query: Result<Query<PageQuery>, QueryRejection>) -> HandlerResult {
    let Query(query) = query?;
    let page = query.page();
    let dramas = state.upstream.fetch_drama_list(page, query.log).await?;
    Ok(Envelope::success(Payload::Array(dramas)).with("page", page))
}

/// GET /api/drama/categories?pageNo=
pub async fn list_categories(
    State(state): State<AppState>,
    pretty: PrettyOptions,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> Response {
    envelope::format(categories(&state, query).await, &pretty)
}

async fn categories(state: &AppState, query: Result<Query<PageQuery>, QueryRejection>) -> HandlerResult {
    let Query(query) = query?;
    let page = query.page();
    let categories = state.upstream.fetch_categories(page).await?;
    Ok(Envelope::success(categories).with("page", page))
}

/// GET /api/drama/category/{type_two_id}?pageNo=
pub async fn list_category_books(
    State(state): State<AppState>,
    pretty: PrettyOptions,
    path: Result<Path<i64>, PathRejection>,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> Response {
    envelope::format(category_books(&state, path, query).await, &pretty)
}

async fn category_books(
    state: &AppState,
    path: Result<Path<i64>, PathRejection>,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> HandlerResult {
    let Path(type_two_id) = path?;
    let Query(query) = query?;
    let page = query.page();
    let books = state.upstream.fetch_category_books(type_two_id, page).await?;
    Ok(Envelope::success(Payload::Array(books))
        .with("categoryId", type_two_id)
        .with("page", page))
}

/// GET /api/drama/recommended?log=
pub async fn list_recommended(
    State(state): State<AppState>,
    pretty: PrettyOptions,
    query: Result<Query<LogQuery>, QueryRejection>,
) -> Response {
    envelope::format(recommended(&state, query).await, &pretty)
}

async fn recommended(state: &AppState, query: Result<Query<LogQuery>, QueryRejection>) -> HandlerResult {
    let Query(query) = query?;
    let (total, data) = list(state.upstream.fetch_recommended(query.log).await?);
    Ok(Envelope::success(data).with("total", total))
}

/// GET /api/drama/{book_id}?needRecommend=
pub async fn get_drama_detail(
    State(state): State<AppState>,
    pretty: PrettyOptions,
    path: Result<Path<String>, PathRejection>,
    query: Result<Query<DetailQuery>, QueryRejection>,
) -> Response {
    envelope::format(drama_detail(&state, path, query).await, &pretty)
}

async fn drama_detail(
    state: &AppState,
    path: Result<Path<String>, PathRejection>,
    query: Result<Query<DetailQuery>, QueryRejection>,
) -> HandlerResult {
    let Path(book_id) = path?;
    let Query(query) = query?;
    let book_id = BookId::new(book_id);
    let detail = state
        .upstream
        .fetch_drama_detail(&book_id, query.need_recommend)
        .await?;
    Ok(Envelope::success(detail).with("bookId", book_id.as_str()))
}

/// GET /api/drama/{book_id}/v2
pub async fn get_drama_detail_v2(
    State(state): State<AppState>,
    pretty: PrettyOptions,
    path: Result<Path<String>, PathRejection>,
) -> Response {
    envelope::format(drama_detail_v2(&state, path).await, &pretty)
}

async fn drama_detail_v2(state: &AppState, path: Result<Path<String>, PathRejection>) -> HandlerResult {
    let Path(book_id) = path?;
    let book_id = BookId::new(book_id);
    let detail = state.upstream.fetch_drama_detail_v2(&book_id).await?;
    Ok(Envelope::success(detail).with("bookId", book_id.as_str()))
}

// =============================================================================
// Chapters
// =============================================================================

/// GET /api/chapter/{book_id}?log=
pub async fn list_chapters(
    State(state): State<AppState>,
    pretty: PrettyOptions,
    path: Result<Path<String>, PathRejection>,
    query: Result<Query<LogQuery>, QueryRejection>,
) -> Response {
    envelope::format(chapters(&state, path, query).await, &pretty)
}

async fn chapters(
    state: &AppState,
    path: Result<Path<String>, PathRejection>,
    query: Result<Query<LogQuery>, QueryRejection>,
) -> HandlerResult {
    let Path(book_id) = path?;
    let Query(query) = query?;
    let book_id = BookId::new(book_id);
    let (total, data) = list(state.upstream.fetch_chapter_list(&book_id, query.log).await?);
    Ok(Envelope::success(data)
        .with("bookId", book_id.as_str())
        .with("total", total))
}

/// GET /api/chapter/{book_id}/{chapter_id}
///
/// One chapter. The same call a batch download makes per entry, and the path
/// an [`HttpUpstream`](crate::upstream::HttpUpstream) relay expects from its
/// catalog, so one gateway can relay another.
pub async fn get_chapter(
    State(state): State<AppState>,
    pretty: PrettyOptions,
    path: Result<Path<(String, String)>, PathRejection>,
) -> Response {
    envelope::format(chapter(&state, path).await, &pretty)
}

async fn chapter(state: &AppState, path: Result<Path<(String, String)>, PathRejection>) -> HandlerResult {
    let Path((book_id, chapter_id)) = path?;
    let book_id = BookId::new(book_id);
    let chapter_id = ChapterId::Text(chapter_id);
    let payload = state.upstream.fetch_chapter(&book_id, &chapter_id).await?;
    Ok(Envelope::success(payload)
        .with("bookId", book_id.as_str())
        .with("chapterId", chapter_id.to_string()))
}

/// POST /api/chapter/batch-download
///
/// Fetches every requested chapter concurrently. Per-chapter failures are
/// reported inside `data`; the response is 200 as long as the request itself
/// was valid.
pub async fn batch_download(
    State(state): State<AppState>,
    pretty: PrettyOptions,
    body: Result<Json<BatchDownloadRequest>, JsonRejection>,
) -> Response {
    envelope::format(batch(&state, body).await, &pretty)
}

async fn batch(state: &AppState, body: Result<Json<BatchDownloadRequest>, JsonRejection>) -> HandlerResult {
    let Json(body) = body.map_err(|rejection| {
        tracing::debug!(error = %rejection.body_text(), "unreadable batch body");
        AppError::BadRequest(INVALID_BATCH.to_string())
    })?;
    let (Some(book_id), Some(chapter_ids)) = (body.book_id, body.chapter_id_list) else {
        return Err(AppError::BadRequest(INVALID_BATCH.to_string()));
    };

    let request = BatchRequest::from_payloads(book_id, &chapter_ids)?;
    request.validate(state.max_batch_size)?;

    tracing::info!(book_id = %request.book_id, chapters = request.len(), "batch download");
    let outcome = state.fetcher.fetch(&request).await;
    Envelope::from_batch(&outcome)
}

// =============================================================================
// Search
// =============================================================================

/// GET /api/search?keyword=&log=
pub async fn search(
    State(state): State<AppState>,
    pretty: PrettyOptions,
    query: Result<Query<SearchQuery>, QueryRejection>,
) -> Response {
    envelope::format(search_books(&state, query).await, &pretty)
}

async fn search_books(state: &AppState, query: Result<Query<SearchQuery>, QueryRejection>) -> HandlerResult {
    let Query(query) = query?;
    let keyword = query
        .keyword()
        .ok_or_else(|| AppError::BadRequest(KEYWORD_REQUIRED.to_string()))?;
    let (total, data) = list(state.upstream.search(keyword, query.log).await?);
    Ok(Envelope::success(data)
        .with("keyword", keyword)
        .with("total", total))
}

/// GET /api/search/hot?log=
pub async fn hot_searches(
    State(state): State<AppState>,
    pretty: PrettyOptions,
    query: Result<Query<LogQuery>, QueryRejection>,
) -> Response {
    envelope::format(hot(&state, query).await, &pretty)
}

async fn hot(state: &AppState, query: Result<Query<LogQuery>, QueryRejection>) -> HandlerResult {
    let Query(query) = query?;
    let (total, data) = list(state.upstream.fetch_hot_searches(query.log).await?);
    Ok(Envelope::success(data).with("total", total))
}
