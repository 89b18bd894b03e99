//! Batch fetch orchestration.

use futures::stream::{FuturesUnordered, StreamExt};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::types::{BatchOutcome, BatchRequest, FetchResult};
use crate::upstream::UpstreamClient;

/// Fans a batch out to the upstream, one call per chapter, and fans the
/// answers back in by position.
///
/// All calls of a batch run concurrently and none of them can abort its
/// siblings. The fan-in waits for every call or for the deadline, whichever
/// comes first; anything still pending at the deadline is dropped (which
/// cancels the in-flight upstream future) and reported as a timeout.
#[derive(Clone)]
pub struct BatchFetcher {
    upstream: Arc<dyn UpstreamClient>,
    deadline: Option<Duration>,
}

impl BatchFetcher {
    /// Creates a fetcher without a deadline.
    pub fn new(upstream: Arc<dyn UpstreamClient>) -> Self {
        Self {
            upstream,
            deadline: None,
        }
    }

    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline
    }

    /// Executes a batch. The request is expected to be validated already.
    ///
    /// `results[i]` always answers `request.chapter_ids[i]`, whatever order
    /// the upstream calls complete in.
    pub async fn fetch(&self, request: &BatchRequest) -> BatchOutcome {
        let started = Instant::now();
        let book_id = &request.book_id;
        let upstream = self.upstream.as_ref();

        let mut slots: Vec<Option<FetchResult>> = vec![None; request.len()];
        let mut pending: FuturesUnordered<_> = request
            .chapter_ids
            .iter()
            .enumerate()
            .map(|(index, chapter_id)| async move {
                let result = upstream.fetch_chapter(book_id, chapter_id).await;
                (index, FetchResult::from_upstream(chapter_id.clone(), result))
            })
            .collect();

        let cutoff = self
            .deadline
            .map(|d| tokio::time::Instant::from_std(started) + d);
        let mut deadline_exceeded = false;

        loop {
            let next = match cutoff {
                Some(at) => match tokio::time::timeout_at(at, pending.next()).await {
                    Ok(next) => next,
                    Err(_) => {
                        deadline_exceeded = true;
                        break;
                    }
                },
                None => pending.next().await,
            };
            match next {
                Some((index, result)) => slots[index] = Some(result),
                None => break,
            }
        }

        // Cancels whatever is still running.
        drop(pending);

        let deadline = self.deadline.unwrap_or_default();
        let results: Vec<FetchResult> = slots
            .into_iter()
            .zip(&request.chapter_ids)
            .map(|(slot, chapter_id)| {
                slot.unwrap_or_else(|| FetchResult::timed_out(chapter_id.clone(), deadline))
            })
            .collect();

        let outcome = BatchOutcome::new(
            book_id.clone(),
            results,
            deadline_exceeded,
            started.elapsed(),
        );

        if deadline_exceeded {
            log::warn!(
                "batch for book {} hit its {:?} deadline: {}/{} chapters delivered",
                book_id,
                deadline,
                outcome.succeeded,
                outcome.len()
            );
        } else if outcome.failed > 0 {
            log::warn!(
                "batch for book {}: {} of {} chapters failed",
                book_id,
                outcome.failed,
                outcome.len()
            );
        } else {
            log::debug!(
                "batch for book {}: {} chapters in {:?}",
                book_id,
                outcome.len(),
                outcome.elapsed
            );
        }

        outcome
    }
}
