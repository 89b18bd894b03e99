//! Identifier and payload types shared by the upstream client, the batch
//! orchestrator and the HTTP layer.
//!
//! Catalog payloads are opaque to this crate: whatever the upstream returns is
//! carried through as a [`Payload`] and never inspected.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Opaque catalog payload (drama, chapter, search hit, ...).
pub type Payload = serde_json::Value;

/// Book (drama) identifier, the parent resource of a batch.
///
/// Accepts either a JSON string or a JSON integer on input; integers are kept
/// in their decimal string form.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct BookId(String);

impl BookId {
    pub fn new(value: impl Into<String>) -> Self {
        BookId(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for BookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BookId {
    fn from(v: &str) -> Self {
        BookId(v.to_string())
    }
}

impl From<String> for BookId {
    fn from(v: String) -> Self {
        BookId(v)
    }
}

impl<'de> Deserialize<'de> for BookId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match ChapterId::deserialize(deserializer)? {
            ChapterId::Number(n) => BookId(n.to_string()),
            ChapterId::Text(s) => BookId(s),
        })
    }
}

/// Chapter identifier, a child resource within a book.
///
/// Callers may send chapter ids as numbers or strings; the JSON form they used
/// is preserved so responses echo ids exactly as they were requested. Numbers
/// are kept as [`serde_json::Number`], so ids past `i64::MAX` survive intact.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChapterId {
    Number(serde_json::Number),
    Text(String),
}

impl ChapterId {
    /// Read an id out of an arbitrary JSON value; only numbers and strings
    /// qualify.
    pub fn from_payload(value: &Payload) -> Option<Self> {
        match value {
            Payload::Number(n) => Some(ChapterId::Number(n.clone())),
            Payload::String(s) => Some(ChapterId::Text(s.clone())),
            _ => None,
        }
    }

    /// A text id made only of whitespace cannot name a chapter.
    pub fn is_blank(&self) -> bool {
        match self {
            ChapterId::Number(_) => false,
            ChapterId::Text(s) => s.trim().is_empty(),
        }
    }

    /// Compare against an id as it appears inside an upstream payload.
    pub fn matches(&self, value: &serde_json::Value) -> bool {
        match value {
            serde_json::Value::Number(n) => n.to_string() == self.to_string(),
            serde_json::Value::String(s) => *s == self.to_string(),
            _ => false,
        }
    }
}

impl fmt::Display for ChapterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChapterId::Number(n) => write!(f, "{}", n),
            ChapterId::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for ChapterId {
    fn from(v: i64) -> Self {
        ChapterId::Number(v.into())
    }
}

impl From<&str> for ChapterId {
    fn from(v: &str) -> Self {
        ChapterId::Text(v.to_string())
    }
}
