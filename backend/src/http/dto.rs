//! Request DTOs for the HTTP API.
//!
//! Query flags (`log`, `needRecommend`) are on only for the literal string
//! `true`; any other value, or no value, is off.

use serde::{Deserialize, Deserializer};

use crate::api::{BookId, Payload};

fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Ok(raw == "true")
}

/// `?pageNo=&log=` for paginated listings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageQuery {
    #[serde(default)]
    pub page_no: Option<u32>,
    #[serde(default, deserialize_with = "flag")]
    pub log: bool,
}

impl PageQuery {
    /// Requested page, 1 when absent.
    pub fn page(&self) -> u32 {
        self.page_no.unwrap_or(1)
    }
}

/// `?log=` alone.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogQuery {
    #[serde(default, deserialize_with = "flag")]
    pub log: bool,
}

/// `?needRecommend=` for drama detail.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailQuery {
    #[serde(default, deserialize_with = "flag")]
    pub need_recommend: bool,
}

/// `?keyword=&log=` for search.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub keyword: Option<String>,
    #[serde(default, deserialize_with = "flag")]
    pub log: bool,
}

impl SearchQuery {
    /// The keyword, unless it is missing or blank.
    pub fn keyword(&self) -> Option<&str> {
        self.keyword.as_deref().filter(|k| !k.trim().is_empty())
    }
}

/// Body of `POST /api/chapter/batch-download`.
///
/// Both fields are optional here so a missing one can be answered with the
/// API's own 400 message instead of a deserializer error. List elements stay
/// raw JSON until [`BatchRequest::from_payloads`](crate::batch::BatchRequest::from_payloads)
/// can point at the one that is not an id.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchDownloadRequest {
    #[serde(default)]
    pub book_id: Option<BookId>,
    #[serde(default)]
    pub chapter_id_list: Option<Vec<Payload>>,
}
