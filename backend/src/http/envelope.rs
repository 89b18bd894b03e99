//! Uniform response envelope and its rendering.
//!
//! Every response body is `{"success": bool, "data" | "error", ...echo}`.
//! Handlers build an [`Envelope`] (or fail with an [`AppError`]) and finish by
//! calling [`format`] with the caller's [`PrettyOptions`]; nothing else
//! touches serialization.

use axum::extract::{FromRequestParts, Query};
use axum::http::header::CONTENT_TYPE;
use axum::http::request::Parts;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use serde_json::ser::PrettyFormatter;
use serde_json::{Map, Value};
use std::convert::Infallible;

use super::error::AppError;
use crate::api::Payload;
use crate::batch::BatchOutcome;

/// Indentation used when pretty printing without an explicit `indent`.
pub const DEFAULT_INDENT: usize = 2;
/// Widest accepted `indent`.
pub const MAX_INDENT: usize = 10;

/// Response body wrapper.
///
/// Built only through [`Envelope::success`] / [`Envelope::failure`], so a
/// successful envelope always has `data` and never `error`, and the reverse.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Envelope {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Payload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(flatten)]
    echo: Map<String, Value>,
}

impl Envelope {
    pub fn success(data: Payload) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            echo: Map::new(),
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            echo: Map::new(),
        }
    }

    /// Batch results are a transport-level success even when every chapter
    /// failed; per-chapter failures stay visible in `data`.
    pub fn from_batch(outcome: &BatchOutcome) -> Result<Self, AppError> {
        let data = serde_json::to_value(&outcome.results)?;
        let status = serde_json::to_value(outcome.status)?;
        Ok(Self::success(data)
            .with("bookId", outcome.book_id.as_str())
            .with("chaptersCount", outcome.len())
            .with("succeededCount", outcome.succeeded)
            .with("failedCount", outcome.failed)
            .with("status", status)
            .with("deadlineExceeded", outcome.deadline_exceeded))
    }

    /// Add a request-echo field (`page`, `bookId`, `total`, ...).
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.echo.insert(key.to_string(), value.into());
        self
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn data(&self) -> Option<&Payload> {
        self.data.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn echo(&self, key: &str) -> Option<&Value> {
        self.echo.get(key)
    }
}

/// Raw presentation toggles as they appear in the query string.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PrettyQuery {
    #[serde(default)]
    pub pretty: Option<String>,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub p: Option<String>,
    #[serde(default)]
    pub indent: Option<String>,
}

/// How to serialize the envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrettyOptions {
    pub enabled: bool,
    pub indent: usize,
}

impl Default for PrettyOptions {
    fn default() -> Self {
        Self {
            enabled: false,
            indent: DEFAULT_INDENT,
        }
    }
}

impl PrettyOptions {
    pub fn pretty(indent: usize) -> Self {
        Self {
            enabled: true,
            indent: indent.min(MAX_INDENT),
        }
    }
}

/// Width named by the leading digits of `raw`, after optional whitespace and
/// `+`. Trailing text is ignored (`4px` is 4). Too many digits saturate.
fn leading_indent(raw: &str) -> Option<usize> {
    let raw = raw.trim_start();
    let raw = raw.strip_prefix('+').unwrap_or(raw);
    let end = raw.find(|c: char| !c.is_ascii_digit()).unwrap_or(raw.len());
    let digits = &raw[..end];
    if digits.is_empty() {
        return None;
    }
    Some(digits.parse::<usize>().unwrap_or(usize::MAX))
}

impl From<PrettyQuery> for PrettyOptions {
    /// `pretty=true`, `format=pretty` or `p=1` switch pretty printing on.
    /// `indent` is read from its leading digits; a missing, non-numeric,
    /// negative or zero value means [`DEFAULT_INDENT`].
    fn from(query: PrettyQuery) -> Self {
        let enabled = query.pretty.as_deref() == Some("true")
            || query.format.as_deref() == Some("pretty")
            || query.p.as_deref() == Some("1");
        let indent = query
            .indent
            .as_deref()
            .and_then(leading_indent)
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_INDENT);
        Self {
            enabled,
            indent: indent.min(MAX_INDENT),
        }
    }
}

impl<S> FromRequestParts<S> for PrettyOptions
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    /// Presentation never rejects a request; a query string that cannot be
    /// read falls back to compact output.
    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Query::<PrettyQuery>::try_from_uri(&parts.uri)
            .map(|Query(q)| q.into())
            .unwrap_or_default())
    }
}

/// Serialize a value compactly or with the requested indentation.
pub fn to_body<T: Serialize>(value: &T, options: &PrettyOptions) -> serde_json::Result<Vec<u8>> {
    if !options.enabled {
        return serde_json::to_vec(value);
    }
    let indent = vec![b' '; options.indent];
    let mut out = Vec::new();
    let mut serializer =
        serde_json::Serializer::with_formatter(&mut out, PrettyFormatter::with_indent(&indent));
    value.serialize(&mut serializer)?;
    Ok(out)
}

/// Render an envelope with an explicit status.
pub fn render(status: StatusCode, envelope: &Envelope, options: &PrettyOptions) -> Response {
    match to_body(envelope, options) {
        Ok(body) => (
            status,
            [(CONTENT_TYPE, HeaderValue::from_static("application/json"))],
            body,
        )
            .into_response(),
        Err(err) => {
            tracing::error!(error = %err, "failed to serialize response envelope");
            (StatusCode::INTERNAL_SERVER_ERROR, "response serialization failed").into_response()
        }
    }
}

/// Turn a handler result into the HTTP response: 200 for any envelope the
/// handler produced, the error's own status otherwise.
pub fn format(result: Result<Envelope, AppError>, options: &PrettyOptions) -> Response {
    match result {
        Ok(envelope) => render(StatusCode::OK, &envelope, options),
        Err(err) => {
            let status = err.status_code();
            if status.is_server_error() {
                tracing::error!(%status, error = %err, "request failed");
            } else {
                tracing::debug!(%status, error = %err, "request rejected");
            }
            render(status, &err.into_envelope(), options)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{BookId, ChapterId};
    use crate::batch::{FailureReason, FetchResult};
    use proptest::prelude::*;
    use serde_json::json;
    use std::time::Duration;

    fn query(pretty: Option<&str>, format: Option<&str>, p: Option<&str>, indent: Option<&str>) -> PrettyQuery {
        PrettyQuery {
            pretty: pretty.map(String::from),
            format: format.map(String::from),
            p: p.map(String::from),
            indent: indent.map(String::from),
        }
    }

    #[test]
    fn test_success_and_failure_are_exclusive() {
        let ok = Envelope::success(json!([1]));
        assert!(ok.is_success());
        assert!(ok.data().is_some() && ok.error().is_none());

        let err = Envelope::failure("boom");
        assert!(!err.is_success());
        assert!(err.data().is_none() && err.error() == Some("boom"));
        assert_eq!(
            serde_json::to_value(&err).unwrap(),
            json!({"success": false, "error": "boom"})
        );
    }

    #[test]
    fn test_echo_fields_are_flattened() {
        let envelope = Envelope::success(json!([])).with("page", 2).with("total", 0);
        assert_eq!(
            serde_json::to_value(&envelope).unwrap(),
            json!({"success": true, "data": [], "page": 2, "total": 0})
        );
    }

    #[test]
    fn test_pretty_toggles() {
        assert!(!PrettyOptions::from(query(None, None, None, None)).enabled);
        assert!(PrettyOptions::from(query(Some("true"), None, None, None)).enabled);
        assert!(PrettyOptions::from(query(None, Some("pretty"), None, None)).enabled);
        assert!(PrettyOptions::from(query(None, None, Some("1"), None)).enabled);
        assert!(!PrettyOptions::from(query(Some("yes"), Some("compact"), Some("0"), None)).enabled);
    }

    #[test]
    fn test_indent_parsing() {
        let indent = |raw| PrettyOptions::from(query(Some("true"), None, None, raw)).indent;
        assert_eq!(indent(None), 2);
        assert_eq!(indent(Some("4")), 4);
        assert_eq!(indent(Some("0")), 2);
        assert_eq!(indent(Some("abc")), 2);
        assert_eq!(indent(Some("-3")), 2);
        assert_eq!(indent(Some("64")), MAX_INDENT);
        assert_eq!(indent(Some("99999999999999999999999")), MAX_INDENT);
    }

    #[test]
    fn test_indent_reads_leading_digits() {
        let indent = |raw| PrettyOptions::from(query(Some("true"), None, None, Some(raw))).indent;
        assert_eq!(indent("4px"), 4);
        assert_eq!(indent(" 3"), 3);
        assert_eq!(indent("+5"), 5);
        assert_eq!(indent("6.9"), 6);
        assert_eq!(indent("px4"), 2);
        assert_eq!(indent(""), 2);
    }

    #[test]
    fn test_pretty_body_uses_requested_indent() {
        let envelope = Envelope::success(json!({"a": 1}));
        let body = to_body(&envelope, &PrettyOptions::pretty(4)).unwrap();
        let text = String::from_utf8(body).unwrap();
        assert!(text.contains("\n    \"success\": true"));
        assert!(text.contains("\n        \"a\": 1"));

        let compact = to_body(&envelope, &PrettyOptions::default()).unwrap();
        assert_eq!(compact, br#"{"success":true,"data":{"a":1}}"#);
    }

    #[test]
    fn test_batch_envelope() {
        let outcome = BatchOutcome::new(
            BookId::new("1"),
            vec![
                FetchResult::Fetched {
                    id: ChapterId::from(10),
                    payload: json!({"n": 1}),
                },
                FetchResult::Failed {
                    id: ChapterId::from(99),
                    reason: FailureReason::Upstream,
                    message: "upstream exploded".to_string(),
                },
                FetchResult::Fetched {
                    id: ChapterId::from(30),
                    payload: json!({"n": 3}),
                },
            ],
            false,
            Duration::from_millis(5),
        );
        let envelope = Envelope::from_batch(&outcome).unwrap();
        let value = serde_json::to_value(&envelope).unwrap();

        assert_eq!(value["success"], true);
        assert_eq!(value["succeededCount"], 2);
        assert_eq!(value["failedCount"], 1);
        assert_eq!(value["chaptersCount"], 3);
        assert_eq!(value["status"], "partialFailure");
        assert_eq!(value["data"][1], json!({"id": 99, "ok": false, "error": "upstream exploded", "reason": "upstream"}));
        assert!(value.get("error").is_none());
    }

    #[test]
    fn test_format_maps_errors_to_status() {
        let response = format(Err(AppError::BadRequest("nope".into())), &PrettyOptions::default());
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = format(Ok(Envelope::success(json!(null))), &PrettyOptions::pretty(2));
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[CONTENT_TYPE], "application/json");
    }

    fn arb_json() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::from),
            any::<i64>().prop_map(Value::from),
            "[a-zA-Z0-9 ]{0,12}".prop_map(Value::from),
        ];
        leaf.prop_recursive(3, 24, 4, |inner| {
            prop_oneof![
                proptest::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
                proptest::collection::btree_map("[a-z]{1,6}", inner, 0..4)
                    .prop_map(|m| Value::Object(m.into_iter().collect())),
            ]
        })
    }

    proptest! {
        /// Pretty printing changes whitespace only.
        #[test]
        fn prop_pretty_output_parses_to_compact_output(data in arb_json(), indent in 1usize..12, ok in any::<bool>()) {
            let envelope = if ok {
                Envelope::success(data).with("page", 1)
            } else {
                Envelope::failure("failed").with("path", "/x")
            };
            let compact = to_body(&envelope, &PrettyOptions::default()).unwrap();
            let pretty = to_body(&envelope, &PrettyOptions::pretty(indent)).unwrap();

            let compact: Value = serde_json::from_slice(&compact).unwrap();
            let pretty: Value = serde_json::from_slice(&pretty).unwrap();
            prop_assert_eq!(compact, pretty);
        }
    }
}
