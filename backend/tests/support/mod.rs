#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::Mutex;

static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Runs `f` with environment variables temporarily modified.
///
/// Restores the previous values on unwind and serializes access to the
/// process environment across tests in the same binary.
///
/// `changes` is a list of `(key, value)` pairs:
/// - `Some(v)` sets the variable to `v`
/// - `None` removes the variable
pub fn with_scoped_env<F, R>(changes: &[(&str, Option<&str>)], f: F) -> R
where
    F: FnOnce() -> R,
{
    let _lock = ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    let _guard = ScopedEnv::new(changes);
    f()
}

/// Clears every variable the gateway reads, then applies `changes`.
pub fn with_gateway_env<F, R>(changes: &[(&str, Option<&str>)], f: F) -> R
where
    F: FnOnce() -> R,
{
    const KEYS: [&str; 6] = [
        "HOST",
        "PORT",
        "APP_ENV",
        "GATEWAY_CONFIG",
        "UPSTREAM_TYPE",
        "UPSTREAM_BASE_URL",
    ];
    let mut all: Vec<(&str, Option<&str>)> = KEYS
        .iter()
        .filter(|k| changes.iter().all(|(c, _)| c != *k))
        .map(|k| (*k, None))
        .collect();
    all.extend_from_slice(changes);
    with_scoped_env(&all, f)
}

struct ScopedEnv {
    snapshot: Vec<(String, Option<String>)>,
}

impl ScopedEnv {
    fn new(changes: &[(&str, Option<&str>)]) -> Self {
        let keys: HashSet<&str> = changes.iter().map(|(k, _)| *k).collect();
        let snapshot = keys
            .into_iter()
            .map(|k| (k.to_string(), std::env::var(k).ok()))
            .collect::<Vec<_>>();

        for (k, v) in changes {
            match v {
                Some(val) => std::env::set_var(k, val),
                None => std::env::remove_var(k),
            }
        }

        Self { snapshot }
    }
}

impl Drop for ScopedEnv {
    fn drop(&mut self) {
        for (k, v) in self.snapshot.drain(..) {
            match v {
                Some(val) => std::env::set_var(&k, val),
                None => std::env::remove_var(&k),
            }
        }
    }
}

#[cfg(feature = "http-server")]
pub mod app {
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Method, Request, StatusCode};
    use axum::Router;
    use serde_json::Value;
    use std::sync::Arc;
    use tower::ServiceExt;

    use dramabox_gateway::config::{BatchSettings, ServerConfig};
    use dramabox_gateway::http::{create_router, AppState};
    use dramabox_gateway::upstream::LocalUpstream;

    /// Router over `upstream` with default limits and no batch deadline.
    pub fn router(upstream: &LocalUpstream) -> Router {
        router_with(upstream, &BatchSettings { deadline_ms: 0, ..Default::default() })
    }

    pub fn router_with(upstream: &LocalUpstream, batch: &BatchSettings) -> Router {
        let state = AppState::with_batch_settings(
            Arc::new(upstream.clone()),
            batch,
            ServerConfig::default(),
        );
        create_router(state)
    }

    /// A response with its body read in full.
    pub struct TestResponse {
        pub status: StatusCode,
        pub content_type: Option<String>,
        pub body: Vec<u8>,
    }

    impl TestResponse {
        pub fn json(&self) -> Value {
            serde_json::from_slice(&self.body).unwrap_or_else(|e| {
                panic!("body is not JSON ({}): {}", e, String::from_utf8_lossy(&self.body))
            })
        }

        pub fn text(&self) -> String {
            String::from_utf8_lossy(&self.body).into_owned()
        }
    }

    pub async fn send(router: Router, request: Request<Body>) -> TestResponse {
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap().to_vec();
        TestResponse {
            status,
            content_type,
            body,
        }
    }

    pub async fn get(router: Router, uri: &str) -> TestResponse {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        send(router, request).await
    }

    pub async fn post_json(router: Router, uri: &str, body: Value) -> TestResponse {
        let request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        send(router, request).await
    }
}
