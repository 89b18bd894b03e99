#![cfg(feature = "http-server")]

mod support;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use serde_json::{json, Value};
use std::time::Duration;

use dramabox_gateway::config::BatchSettings;
use dramabox_gateway::upstream::LocalUpstream;
use support::app::{get, post_json, router, router_with, send};

fn ids(data: &Value) -> Vec<Value> {
    data.as_array()
        .unwrap()
        .iter()
        .map(|entry| entry["id"].clone())
        .collect()
}

// =============================================================================
// Batch download
// =============================================================================

#[tokio::test]
async fn test_batch_download_partial_failure_keeps_order() {
    let upstream = LocalUpstream::sample();
    upstream.fail_chapter(99);

    let response = post_json(
        router(&upstream),
        "/api/chapter/batch-download",
        json!({"bookId": "41000100", "chapterIdList": [10, 99, 30]}),
    )
    .await;

    assert_eq!(response.status, StatusCode::OK);
    let body = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["bookId"], "41000100");
    assert_eq!(body["chaptersCount"], 3);
    assert_eq!(body["succeededCount"], 2);
    assert_eq!(body["failedCount"], 1);
    assert_eq!(body["status"], "partialFailure");
    assert_eq!(ids(&body["data"]), vec![json!(10), json!(99), json!(30)]);

    assert_eq!(body["data"][0]["ok"], true);
    assert_eq!(body["data"][0]["data"]["chapterId"], 10);
    assert_eq!(body["data"][1]["ok"], false);
    assert_eq!(body["data"][1]["reason"], "upstream");
    assert!(body["data"][1]["error"].as_str().unwrap().contains("99"));
    assert_eq!(body["data"][2]["data"]["chapterId"], 30);
}

#[tokio::test]
async fn test_batch_download_all_failed_is_still_200() {
    let upstream = LocalUpstream::sample();
    let response = post_json(
        router(&upstream),
        "/api/chapter/batch-download",
        json!({"bookId": "41000100", "chapterIdList": [1, 2]}),
    )
    .await;

    assert_eq!(response.status, StatusCode::OK);
    let body = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["status"], "allFailed");
    assert_eq!(body["failedCount"], 2);
    assert_eq!(body["data"][0]["reason"], "notFound");
}

#[tokio::test]
async fn test_batch_download_echoes_id_forms() {
    let upstream = LocalUpstream::sample();
    let response = post_json(
        router(&upstream),
        "/api/chapter/batch-download",
        json!({"bookId": 41000100, "chapterIdList": ["20", 20]}),
    )
    .await;

    let body = response.json();
    assert_eq!(body["bookId"], "41000100");
    assert_eq!(ids(&body["data"]), vec![json!("20"), json!(20)]);
    assert_eq!(body["succeededCount"], 2);
}

#[tokio::test]
async fn test_batch_download_accepts_ids_beyond_i64() {
    let upstream = LocalUpstream::sample();
    let response = post_json(
        router(&upstream),
        "/api/chapter/batch-download",
        json!({"bookId": "41000100", "chapterIdList": [10, 18446744073709551615u64]}),
    )
    .await;

    assert_eq!(response.status, StatusCode::OK);
    let body = response.json();
    assert_eq!(body["status"], "partialFailure");
    assert_eq!(body["data"][0]["ok"], true);
    assert_eq!(body["data"][1]["id"], json!(18446744073709551615u64));
    assert_eq!(body["data"][1]["reason"], "notFound");
    assert!(response.text().contains("18446744073709551615"));
}

#[tokio::test]
async fn test_batch_download_accepts_float_ids() {
    let upstream = LocalUpstream::sample();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/chapter/batch-download")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"bookId": "41000100", "chapterIdList": [10, 20.0]}"#))
        .unwrap();
    let response = send(router(&upstream), request).await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(response.text().contains(r#""id":20.0"#));
}

#[tokio::test]
async fn test_batch_download_names_non_id_element() {
    let upstream = LocalUpstream::sample();
    for (list, index) in [
        (json!([10, null]), 1),
        (json!([true, 10]), 0),
        (json!([10, 20, {"id": 30}]), 2),
    ] {
        let response = post_json(
            router(&upstream),
            "/api/chapter/batch-download",
            json!({"bookId": "41000100", "chapterIdList": list}),
        )
        .await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert_eq!(
            response.json()["error"],
            format!("chapterIdList[{}] must be a string or a number", index)
        );
    }
    assert_eq!(upstream.chapter_fetches(), 0);
}

#[tokio::test]
async fn test_batch_download_rejects_invalid_requests() {
    let upstream = LocalUpstream::sample();
    let cases = [
        json!({"bookId": "41000100", "chapterIdList": []}),
        json!({"bookId": "41000100"}),
        json!({"chapterIdList": [10]}),
        json!({"bookId": "41000100", "chapterIdList": "10"}),
        json!({"bookId": "  ", "chapterIdList": [10]}),
        json!({"bookId": "41000100", "chapterIdList": [10, " "]}),
    ];

    for case in cases {
        let response = post_json(router(&upstream), "/api/chapter/batch-download", case.clone()).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST, "case {}", case);
        let body = response.json();
        assert_eq!(body["success"], false);
        assert!(body["error"].is_string());
        assert!(body.get("data").is_none());
    }
    assert_eq!(upstream.chapter_fetches(), 0);
}

#[tokio::test]
async fn test_batch_download_missing_fields_message() {
    let upstream = LocalUpstream::sample();
    let response = post_json(
        router(&upstream),
        "/api/chapter/batch-download",
        json!({"bookId": "41000100"}),
    )
    .await;
    assert_eq!(
        response.json()["error"],
        "Invalid request. Requires bookId and chapterIdList array"
    );
}

#[tokio::test]
async fn test_batch_download_without_json_body() {
    let upstream = LocalUpstream::sample();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/chapter/batch-download")
        .body(Body::from("bookId=1"))
        .unwrap();
    let response = send(router(&upstream), request).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.json()["success"], false);
}

#[tokio::test]
async fn test_batch_download_size_limit() {
    let upstream = LocalUpstream::sample();
    let settings = BatchSettings {
        deadline_ms: 0,
        max_batch_size: 2,
    };
    let response = post_json(
        router_with(&upstream, &settings),
        "/api/chapter/batch-download",
        json!({"bookId": "41000100", "chapterIdList": [10, 20, 30]}),
    )
    .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        response.json()["error"],
        "chapterIdList has 3 entries, maximum is 2"
    );
}

#[tokio::test]
async fn test_batch_download_deadline_reports_timeouts() {
    let upstream = LocalUpstream::sample();
    upstream.delay_chapter(20, Duration::from_secs(10));
    let settings = BatchSettings {
        deadline_ms: 100,
        max_batch_size: 10,
    };

    let response = post_json(
        router_with(&upstream, &settings),
        "/api/chapter/batch-download",
        json!({"bookId": "41000100", "chapterIdList": [10, 20, 30]}),
    )
    .await;

    assert_eq!(response.status, StatusCode::OK);
    let body = response.json();
    assert_eq!(body["status"], "partialFailure");
    assert_eq!(body["deadlineExceeded"], true);
    assert_eq!(body["data"][1]["reason"], "timeout");
    assert_eq!(body["data"][0]["ok"], true);
    assert_eq!(body["data"][2]["ok"], true);
}

#[tokio::test]
async fn test_batch_download_get_is_not_found() {
    let upstream = LocalUpstream::sample();
    let request = Request::builder()
        .method(Method::DELETE)
        .uri("/api/chapter/batch-download")
        .body(Body::empty())
        .unwrap();
    let response = send(router(&upstream), request).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.json()["error"], "Endpoint not found");
}

// =============================================================================
// Catalog endpoints
// =============================================================================

#[tokio::test]
async fn test_drama_list_echoes_page() {
    let upstream = LocalUpstream::sample();
    let body = get(router(&upstream), "/api/drama/list").await.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["page"], 1);
    assert_eq!(body["data"].as_array().unwrap().len(), 3);

    let body = get(router(&upstream), "/api/drama/list?pageNo=2&log=true").await.json();
    assert_eq!(body["page"], 2);
    assert_eq!(body["data"], json!([]));
}

#[tokio::test]
async fn test_non_numeric_page_is_bad_request() {
    let upstream = LocalUpstream::sample();
    let response = get(router(&upstream), "/api/drama/list?pageNo=abc").await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.json()["success"], false);
}

#[tokio::test]
async fn test_category_books() {
    let upstream = LocalUpstream::sample();
    let body = get(router(&upstream), "/api/drama/category/9").await.json();
    assert_eq!(body["categoryId"], 9);
    assert_eq!(body["page"], 1);
    assert_eq!(body["data"][0]["bookId"], "41000102");

    let response = get(router(&upstream), "/api/drama/category/romance").await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_categories_and_recommended() {
    let upstream = LocalUpstream::sample();
    let body = get(router(&upstream), "/api/drama/categories?pageNo=1").await.json();
    assert_eq!(body["page"], 1);
    assert!(body["data"].is_array());

    let body = get(router(&upstream), "/api/drama/recommended").await.json();
    assert_eq!(body["total"], 2);
}

#[tokio::test]
async fn test_drama_detail_routes() {
    let upstream = LocalUpstream::sample();
    let body = get(router(&upstream), "/api/drama/41000100?needRecommend=true").await.json();
    assert_eq!(body["bookId"], "41000100");
    assert_eq!(body["data"]["book"]["bookId"], "41000100");
    assert!(body["data"]["recommendList"].is_array());

    let body = get(router(&upstream), "/api/drama/41000100?needRecommend=yes").await.json();
    assert!(body["data"].get("recommendList").is_none());

    let body = get(router(&upstream), "/api/drama/41000100/v2").await.json();
    assert_eq!(body["bookId"], "41000100");
    assert_eq!(body["data"]["chapterList"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_chapter_list() {
    let upstream = LocalUpstream::sample();
    let body = get(router(&upstream), "/api/chapter/41000102").await.json();
    assert_eq!(body["bookId"], "41000102");
    assert_eq!(body["total"], 4);
}

#[tokio::test]
async fn test_single_chapter() {
    let upstream = LocalUpstream::sample();
    let response = get(router(&upstream), "/api/chapter/41000100/20").await;
    assert_eq!(response.status, StatusCode::OK);
    let body = response.json();
    assert_eq!(body["bookId"], "41000100");
    assert_eq!(body["chapterId"], "20");
    assert_eq!(body["data"]["chapterId"], 20);
    assert_eq!(upstream.chapter_fetches(), 1);

    let response = get(router(&upstream), "/api/chapter/41000100/21").await;
    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.json()["error"], "chapter 21 not found in book 41000100");
}

#[tokio::test]
async fn test_unknown_book_is_upstream_error() {
    let upstream = LocalUpstream::sample();
    let response = get(router(&upstream), "/api/drama/404404").await;
    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    let body = response.json();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "book 404404 not found");
}

#[tokio::test]
async fn test_unavailable_upstream_is_500() {
    let upstream = LocalUpstream::sample();
    upstream.set_available(false);
    let response = get(router(&upstream), "/api/search/hot").await;
    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.json()["error"], "upstream unavailable");
}

// =============================================================================
// Search
// =============================================================================

#[tokio::test]
async fn test_search() {
    let upstream = LocalUpstream::sample();
    let body = get(router(&upstream), "/api/search?keyword=dragon").await.json();
    assert_eq!(body["keyword"], "dragon");
    assert_eq!(body["total"], 1);
    assert_eq!(body["data"][0]["bookId"], "41000102");
}

#[tokio::test]
async fn test_search_requires_keyword() {
    let upstream = LocalUpstream::sample();
    for uri in ["/api/search", "/api/search?keyword="] {
        let response = get(router(&upstream), uri).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert_eq!(
            response.json(),
            json!({"success": false, "error": "Keyword is required", "code": "BAD_REQUEST"})
        );
    }
}

#[tokio::test]
async fn test_hot_searches() {
    let upstream = LocalUpstream::sample();
    let body = get(router(&upstream), "/api/search/hot").await.json();
    assert_eq!(body["total"], 3);
}

// =============================================================================
// Service endpoints
// =============================================================================

#[tokio::test]
async fn test_unknown_path_is_not_found_envelope() {
    let upstream = LocalUpstream::sample();
    let response = get(router(&upstream), "/api/nope").await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    let body = response.json();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Endpoint not found");
    assert_eq!(body["path"], "/api/nope");
}

#[tokio::test]
async fn test_not_found_echoes_query_string() {
    let upstream = LocalUpstream::sample();
    let response = get(router(&upstream), "/api/nope?pretty=true&x=1").await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert!(response.text().contains('\n'));
    assert_eq!(response.json()["path"], "/api/nope?pretty=true&x=1");
}

#[tokio::test]
async fn test_stats() {
    let upstream = LocalUpstream::sample();
    let body = get(router(&upstream), "/api/stats").await.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["status"], "online");
    assert_eq!(body["data"]["server"]["port"], 3000);
    assert_eq!(body["data"]["server"]["environment"], "development");
    assert_eq!(body["data"]["endpoints"]["active"], true);
    assert_eq!(body["data"]["endpoints"]["total"], 14);
    assert!(body["data"]["uptimeSeconds"].as_f64().unwrap() >= 0.0);
    assert!(body["data"]["timestamp"].is_string());
}

#[tokio::test]
async fn test_health_reports_upstream() {
    let upstream = LocalUpstream::sample();
    let body = get(router(&upstream), "/health").await.json();
    assert_eq!(body["data"], json!({"status": "ok", "upstream": "connected"}));

    upstream.set_available(false);
    let response = get(router(&upstream), "/health").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()["data"]["upstream"], "unavailable");
}

#[tokio::test]
async fn test_index_lists_endpoints() {
    let upstream = LocalUpstream::sample();
    let body = get(router(&upstream), "/").await.json();
    assert_eq!(body["data"]["name"], "dramabox-gateway");
    assert_eq!(body["data"]["endpoints"].as_array().unwrap().len(), 14);
}

// =============================================================================
// Presentation
// =============================================================================

#[tokio::test]
async fn test_pretty_output_matches_compact() {
    let upstream = LocalUpstream::sample();
    let compact = get(router(&upstream), "/api/chapter/41000100").await;
    for query in ["pretty=true", "format=pretty", "p=1", "pretty=true&indent=4", "p=1&indent=abc"] {
        let pretty = get(router(&upstream), &format!("/api/chapter/41000100?{}", query)).await;
        assert_eq!(pretty.status, StatusCode::OK);
        assert_eq!(pretty.content_type.as_deref(), Some("application/json"));
        assert!(pretty.text().contains('\n'), "{} should be pretty", query);
        assert_eq!(pretty.json(), compact.json());
    }
    assert!(!compact.text().contains('\n'));
}

#[tokio::test]
async fn test_pretty_indent_width() {
    let upstream = LocalUpstream::sample();
    let response = get(router(&upstream), "/api/search/hot?pretty=true&indent=4").await;
    assert!(response.text().contains("\n    \"success\": true"));

    let response = get(router(&upstream), "/api/search/hot?pretty=true&indent=4px").await;
    assert!(response.text().contains("\n    \"success\": true"));

    let response = get(router(&upstream), "/api/search/hot?pretty=true").await;
    assert!(response.text().contains("\n  \"success\": true"));
}

#[tokio::test]
async fn test_errors_honor_pretty() {
    let upstream = LocalUpstream::sample();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/chapter/batch-download?pretty=true")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"bookId": "1", "chapterIdList": []}"#))
        .unwrap();
    let response = send(router(&upstream), request).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.text().contains("\n  \"success\": false"));
}
