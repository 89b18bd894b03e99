//! Router configuration for the HTTP API.
//!
//! This module sets up all routes, middleware (CORS, compression, tracing,
//! panic recovery), and creates the axum router ready for serving.

use axum::{
    extract::DefaultBodyLimit,
    http::StatusCode,
    response::Response,
    routing::{get, post},
    Router,
};
use std::any::Any;
use tower_http::{
    catch_panic::CatchPanicLayer,
    compression::CompressionLayer,
    cors::{Any as AnyOrigin, CorsLayer},
    trace::TraceLayer,
};

use super::envelope::{self, PrettyOptions};
use super::error::AppError;
use super::handlers;
use super::state::AppState;

/// Every route served, as `(method, path, description)`.
pub const ENDPOINTS: &[(&str, &str, &str)] = &[
    ("GET", "/", "Endpoint index"),
    ("GET", "/health", "Service and upstream health"),
    ("GET", "/api/drama/list", "Paginated drama list"),
    ("GET", "/api/drama/categories", "Paginated category list"),
    ("GET", "/api/drama/category/{typeTwoId}", "Dramas in one category"),
    ("GET", "/api/drama/recommended", "Recommended dramas"),
    ("GET", "/api/drama/{bookId}", "Drama detail"),
    ("GET", "/api/drama/{bookId}/v2", "Drama detail, v2 shape"),
    ("GET", "/api/chapter/{bookId}", "Chapter list of a drama"),
    ("GET", "/api/chapter/{bookId}/{chapterId}", "A single chapter"),
    ("POST", "/api/chapter/batch-download", "Fetch many chapters concurrently"),
    ("GET", "/api/search", "Keyword search"),
    ("GET", "/api/search/hot", "Hot searches"),
    ("GET", "/api/stats", "Server statistics"),
];

/// Create the main application router with all routes and middleware.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AnyOrigin)
        .allow_methods(AnyOrigin)
        .allow_headers(AnyOrigin);

    let api = Router::new()
        // Dramas
        .route("/drama/list", get(handlers::list_dramas))
        .route("/drama/categories", get(handlers::list_categories))
        .route("/drama/category/{type_two_id}", get(handlers::list_category_books))
        .route("/drama/recommended", get(handlers::list_recommended))
        .route("/drama/{book_id}", get(handlers::get_drama_detail))
        .route("/drama/{book_id}/v2", get(handlers::get_drama_detail_v2))
        // Chapters
        .route("/chapter/batch-download", post(handlers::batch_download))
        .route("/chapter/{book_id}", get(handlers::list_chapters))
        .route("/chapter/{book_id}/{chapter_id}", get(handlers::get_chapter))
        // Search
        .route("/search", get(handlers::search))
        .route("/search/hot", get(handlers::hot_searches))
        .route("/stats", get(handlers::stats))
        .method_not_allowed_fallback(handlers::not_found);

    Router::new()
        .route("/", get(handlers::index))
        .route("/health", get(handlers::health_check))
        .nest("/api", api)
        .fallback(handlers::not_found)
        .method_not_allowed_fallback(handlers::not_found)
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Last-resort 500 for a handler that panicked.
fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let message = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "handler panicked".to_string()
    };
    tracing::error!(%message, "handler panicked");
    envelope::render(
        StatusCode::INTERNAL_SERVER_ERROR,
        &AppError::Internal(message).into_envelope(),
        &PrettyOptions::default(),
    )
}
