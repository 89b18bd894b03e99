//! Data types for batch chapter downloads.

use serde::ser::{Serialize, SerializeStruct, Serializer};
use serde::Deserialize;
use std::time::Duration;

use crate::api::{BookId, ChapterId, Payload};
use crate::upstream::UpstreamError;

/// A batch download: one book, an ordered list of chapters.
///
/// Duplicated chapter ids are kept; each position is fetched on its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchRequest {
    pub book_id: BookId,
    pub chapter_ids: Vec<ChapterId>,
}

impl BatchRequest {
    pub fn new(book_id: impl Into<BookId>, chapter_ids: Vec<ChapterId>) -> Self {
        Self {
            book_id: book_id.into(),
            chapter_ids,
        }
    }

    /// Build a request from raw JSON list elements, naming the first one
    /// that is neither a number nor a string.
    pub fn from_payloads(
        book_id: impl Into<BookId>,
        chapter_ids: &[Payload],
    ) -> Result<Self, BatchError> {
        let chapter_ids = chapter_ids
            .iter()
            .enumerate()
            .map(|(index, value)| {
                ChapterId::from_payload(value).ok_or(BatchError::InvalidChapterId { index })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(book_id, chapter_ids))
    }

    /// Check the request before any upstream call is made.
    pub fn validate(&self, max_batch_size: usize) -> Result<(), BatchError> {
        if self.book_id.is_blank() {
            return Err(BatchError::MissingBookId);
        }
        if self.chapter_ids.is_empty() {
            return Err(BatchError::EmptyBatch);
        }
        if self.chapter_ids.len() > max_batch_size {
            return Err(BatchError::BatchTooLarge {
                size: self.chapter_ids.len(),
                max: max_batch_size,
            });
        }
        if let Some(index) = self.chapter_ids.iter().position(ChapterId::is_blank) {
            return Err(BatchError::BlankChapterId { index });
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.chapter_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chapter_ids.is_empty()
    }
}

/// Reasons a batch request is rejected before dispatch.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BatchError {
    #[error("bookId cannot be empty")]
    MissingBookId,

    #[error("chapterIdList cannot be empty")]
    EmptyBatch,

    #[error("chapterIdList has {size} entries, maximum is {max}")]
    BatchTooLarge { size: usize, max: usize },

    #[error("chapterIdList[{index}] is blank")]
    BlankChapterId { index: usize },

    #[error("chapterIdList[{index}] must be a string or a number")]
    InvalidChapterId { index: usize },
}

/// Why a single chapter could not be delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FailureReason {
    /// The upstream failed or answered with an error
    Upstream,
    /// The upstream does not know the chapter
    NotFound,
    /// No answer before the batch deadline (or the upstream timed out)
    Timeout,
}

/// Outcome for one position of a batch.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchResult {
    Fetched {
        id: ChapterId,
        payload: Payload,
    },
    Failed {
        id: ChapterId,
        reason: FailureReason,
        message: String,
    },
}

impl FetchResult {
    pub fn from_upstream(id: ChapterId, result: Result<Payload, UpstreamError>) -> Self {
        match result {
            Ok(payload) => FetchResult::Fetched { id, payload },
            Err(err) => {
                let reason = if err.is_not_found() {
                    FailureReason::NotFound
                } else if err.is_timeout() {
                    FailureReason::Timeout
                } else {
                    FailureReason::Upstream
                };
                FetchResult::Failed {
                    id,
                    reason,
                    message: err.message().to_string(),
                }
            }
        }
    }

    /// Failure entry for a chapter still in flight when the deadline hit.
    pub fn timed_out(id: ChapterId, deadline: Duration) -> Self {
        FetchResult::Failed {
            id,
            reason: FailureReason::Timeout,
            message: format!("no response within {} ms", deadline.as_millis()),
        }
    }

    pub fn id(&self) -> &ChapterId {
        match self {
            FetchResult::Fetched { id, .. } | FetchResult::Failed { id, .. } => id,
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, FetchResult::Fetched { .. })
    }

    pub fn payload(&self) -> Option<&Payload> {
        match self {
            FetchResult::Fetched { payload, .. } => Some(payload),
            FetchResult::Failed { .. } => None,
        }
    }

    pub fn reason(&self) -> Option<FailureReason> {
        match self {
            FetchResult::Fetched { .. } => None,
            FetchResult::Failed { reason, .. } => Some(*reason),
        }
    }
}

// {id, ok: true, data} | {id, ok: false, error, reason}
impl Serialize for FetchResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FetchResult::Fetched { id, payload } => {
                let mut s = serializer.serialize_struct("FetchResult", 3)?;
                s.serialize_field("id", id)?;
                s.serialize_field("ok", &true)?;
                s.serialize_field("data", payload)?;
                s.end()
            }
            FetchResult::Failed {
                id,
                reason,
                message,
            } => {
                let mut s = serializer.serialize_struct("FetchResult", 4)?;
                s.serialize_field("id", id)?;
                s.serialize_field("ok", &false)?;
                s.serialize_field("error", message)?;
                s.serialize_field("reason", reason)?;
                s.end()
            }
        }
    }
}

/// Aggregate classification of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OverallStatus {
    AllSucceeded,
    PartialFailure,
    AllFailed,
}

impl OverallStatus {
    /// An empty batch has nothing failed and counts as fully successful.
    pub fn classify(succeeded: usize, failed: usize) -> Self {
        match (succeeded, failed) {
            (_, 0) => OverallStatus::AllSucceeded,
            (0, _) => OverallStatus::AllFailed,
            _ => OverallStatus::PartialFailure,
        }
    }
}

/// Everything one batch produced, in request order.
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    pub book_id: BookId,
    pub results: Vec<FetchResult>,
    pub succeeded: usize,
    pub failed: usize,
    pub status: OverallStatus,
    /// Whether the deadline cut the batch short
    pub deadline_exceeded: bool,
    pub elapsed: Duration,
}

impl BatchOutcome {
    pub fn new(
        book_id: BookId,
        results: Vec<FetchResult>,
        deadline_exceeded: bool,
        elapsed: Duration,
    ) -> Self {
        let succeeded = results.iter().filter(|r| r.is_ok()).count();
        let failed = results.len() - succeeded;
        Self {
            book_id,
            status: OverallStatus::classify(succeeded, failed),
            results,
            succeeded,
            failed,
            deadline_exceeded,
            elapsed,
        }
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn failures(&self) -> impl Iterator<Item = &FetchResult> {
        self.results.iter().filter(|r| !r.is_ok())
    }
}
