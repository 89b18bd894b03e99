//! In-memory upstream for local development and tests.
//!
//! Serves a fixed catalog held in memory. Chapters can be made to fail or to
//! answer slowly, which is how the batch orchestrator's partial-failure and
//! deadline behavior is exercised without a network.

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::error::{ErrorContext, UpstreamError, UpstreamResult};
use super::UpstreamClient;
use crate::api::{BookId, ChapterId, Payload};

/// Items per page for every paginated listing.
pub const PAGE_SIZE: usize = 10;

/// A book as stored by the local catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalBook {
    pub book_id: BookId,
    pub book_name: String,
    #[serde(default)]
    pub introduction: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub category_id: Option<i64>,
    #[serde(default)]
    pub recommended: bool,
    /// Chapter payloads; each one is expected to carry a `chapterId` field.
    #[serde(default)]
    pub chapters: Vec<Payload>,
}

impl LocalBook {
    pub fn new(book_id: impl Into<BookId>, book_name: impl Into<String>) -> Self {
        Self {
            book_id: book_id.into(),
            book_name: book_name.into(),
            introduction: String::new(),
            tags: Vec::new(),
            category_id: None,
            recommended: false,
            chapters: Vec::new(),
        }
    }

    pub fn with_category(mut self, category_id: i64) -> Self {
        self.category_id = Some(category_id);
        self
    }

    pub fn recommended(mut self) -> Self {
        self.recommended = true;
        self
    }

    pub fn with_tags(mut self, tags: &[&str]) -> Self {
        self.tags = tags.iter().map(|t| t.to_string()).collect();
        self
    }

    /// Append a chapter with a generated name and body.
    pub fn with_chapter(mut self, chapter_id: impl Into<ChapterId>) -> Self {
        let chapter_id = chapter_id.into();
        let index = self.chapters.len() + 1;
        self.chapters.push(json!({
            "chapterId": chapter_id,
            "chapterIndex": index,
            "chapterName": format!("Episode {}", index),
            "content": format!("{} - episode {}", self.book_name, index),
        }));
        self
    }

    fn summary(&self) -> Payload {
        json!({
            "bookId": self.book_id,
            "bookName": self.book_name,
            "introduction": self.introduction,
            "tags": self.tags,
            "categoryId": self.category_id,
            "chapterCount": self.chapters.len(),
        })
    }

    fn matches_keyword(&self, keyword: &str) -> bool {
        self.book_name.to_lowercase().contains(keyword)
            || self.tags.iter().any(|t| t.to_lowercase().contains(keyword))
    }
}

/// Catalog fixture file layout.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogFile {
    #[serde(default)]
    pub books: Vec<LocalBook>,
}

#[derive(Debug, Default)]
struct Faults {
    unavailable: bool,
    failing: HashSet<String>,
    delays: HashMap<String, Duration>,
}

/// In-memory [`UpstreamClient`].
#[derive(Clone)]
pub struct LocalUpstream {
    books: Arc<RwLock<Vec<LocalBook>>>,
    faults: Arc<RwLock<Faults>>,
    chapter_fetches: Arc<AtomicUsize>,
}

impl LocalUpstream {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::with_books(Vec::new())
    }

    pub fn with_books(books: Vec<LocalBook>) -> Self {
        Self {
            books: Arc::new(RwLock::new(books)),
            faults: Arc::new(RwLock::new(Faults::default())),
            chapter_fetches: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Load a catalog from a JSON fixture file (`{"books": [...]}`).
    pub fn from_file<P: AsRef<Path>>(path: P) -> UpstreamResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            UpstreamError::configuration(format!(
                "Failed to read catalog fixtures {}: {}",
                path.display(),
                e
            ))
        })?;
        let catalog: CatalogFile = serde_json::from_str(&content).map_err(|e| {
            UpstreamError::configuration(format!(
                "Failed to parse catalog fixtures {}: {}",
                path.display(),
                e
            ))
        })?;
        log::info!(
            "Loaded {} books from {}",
            catalog.books.len(),
            path.display()
        );
        Ok(Self::with_books(catalog.books))
    }

    /// Small built-in catalog so a fresh checkout serves something.
    pub fn sample() -> Self {
        Self::with_books(vec![
            LocalBook::new("41000100", "The Heiress Returns")
                .with_category(7)
                .with_tags(&["revenge", "romance"])
                .recommended()
                .with_chapter(10)
                .with_chapter(20)
                .with_chapter(30),
            LocalBook::new("41000101", "Midnight Contract")
                .with_category(7)
                .with_tags(&["romance"])
                .with_chapter(11)
                .with_chapter(21),
            LocalBook::new("41000102", "Dragon King's Son-in-Law")
                .with_category(9)
                .with_tags(&["fantasy", "urban"])
                .recommended()
                .with_chapter(12)
                .with_chapter(22)
                .with_chapter(32)
                .with_chapter(42),
        ])
    }

    pub fn insert_book(&self, book: LocalBook) {
        self.books.write().push(book);
    }

    /// Make every operation fail as if the upstream were unreachable.
    pub fn set_available(&self, available: bool) {
        self.faults.write().unavailable = !available;
    }

    /// Make every fetch of this chapter fail.
    pub fn fail_chapter(&self, chapter_id: impl Into<ChapterId>) {
        self.faults
            .write()
            .failing
            .insert(chapter_id.into().to_string());
    }

    /// Delay every fetch of this chapter.
    pub fn delay_chapter(&self, chapter_id: impl Into<ChapterId>, delay: Duration) {
        self.faults
            .write()
            .delays
            .insert(chapter_id.into().to_string(), delay);
    }

    /// Number of `fetch_chapter` calls served so far.
    pub fn chapter_fetches(&self) -> usize {
        self.chapter_fetches.load(Ordering::SeqCst)
    }

    fn ensure_available(&self, operation: &str) -> UpstreamResult<()> {
        if self.faults.read().unavailable {
            return Err(UpstreamError::connection(
                "upstream unavailable",
                ErrorContext::new(operation),
            ));
        }
        Ok(())
    }

    fn find_book(&self, book_id: &BookId, operation: &str) -> UpstreamResult<LocalBook> {
        self.books
            .read()
            .iter()
            .find(|b| &b.book_id == book_id)
            .cloned()
            .ok_or_else(|| {
                UpstreamError::not_found(
                    format!("book {} not found", book_id),
                    ErrorContext::new(operation).with_resource(book_id),
                )
            })
    }

    fn page_of(items: Vec<Payload>, page_no: u32) -> Vec<Payload> {
        let page = page_no.max(1) as usize;
        items
            .into_iter()
            .skip((page - 1) * PAGE_SIZE)
            .take(PAGE_SIZE)
            .collect()
    }
}

impl Default for LocalUpstream {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UpstreamClient for LocalUpstream {
    async fn fetch_drama_list(&self, page_no: u32, log: bool) -> UpstreamResult<Vec<Payload>> {
        self.ensure_available("fetch_drama_list")?;
        let all = self.books.read().iter().map(LocalBook::summary).collect();
        let page = Self::page_of(all, page_no);
        if log {
            log::info!("drama list page {} -> {} items", page_no, page.len());
        }
        Ok(page)
    }

    async fn fetch_categories(&self, page_no: u32) -> UpstreamResult<Payload> {
        self.ensure_available("fetch_categories")?;
        let mut counts: Vec<(i64, usize)> = Vec::new();
        for category in self.books.read().iter().filter_map(|b| b.category_id) {
            match counts.iter_mut().find(|(id, _)| *id == category) {
                Some((_, n)) => *n += 1,
                None => counts.push((category, 1)),
            }
        }
        counts.sort_by_key(|(id, _)| *id);
        let types = counts
            .into_iter()
            .map(|(id, n)| json!({ "typeTwoId": id, "bookCount": n }))
            .collect();
        Ok(Payload::Array(Self::page_of(types, page_no)))
    }

    async fn fetch_category_books(
        &self,
        type_two_id: i64,
        page_no: u32,
    ) -> UpstreamResult<Vec<Payload>> {
        self.ensure_available("fetch_category_books")?;
        let books = self
            .books
            .read()
            .iter()
            .filter(|b| b.category_id == Some(type_two_id))
            .map(LocalBook::summary)
            .collect();
        Ok(Self::page_of(books, page_no))
    }

    async fn fetch_recommended(&self, _log: bool) -> UpstreamResult<Vec<Payload>> {
        self.ensure_available("fetch_recommended")?;
        Ok(self
            .books
            .read()
            .iter()
            .filter(|b| b.recommended)
            .map(LocalBook::summary)
            .collect())
    }

    async fn fetch_drama_detail(
        &self,
        book_id: &BookId,
        need_recommend: bool,
    ) -> UpstreamResult<Payload> {
        self.ensure_available("fetch_drama_detail")?;
        let book = self.find_book(book_id, "fetch_drama_detail")?;
        let mut detail = json!({ "book": book.summary() });
        if need_recommend {
            let recommendations: Vec<Payload> = self
                .books
                .read()
                .iter()
                .filter(|b| b.recommended && b.book_id != book.book_id)
                .map(LocalBook::summary)
                .collect();
            detail["recommendList"] = Payload::Array(recommendations);
        }
        Ok(detail)
    }

    async fn fetch_drama_detail_v2(&self, book_id: &BookId) -> UpstreamResult<Payload> {
        self.ensure_available("fetch_drama_detail_v2")?;
        let book = self.find_book(book_id, "fetch_drama_detail_v2")?;
        let chapters: Vec<Payload> = book
            .chapters
            .iter()
            .map(|c| {
                json!({
                    "chapterId": c.get("chapterId").cloned().unwrap_or(Payload::Null),
                    "chapterName": c.get("chapterName").cloned().unwrap_or(Payload::Null),
                })
            })
            .collect();
        Ok(json!({ "book": book.summary(), "chapterList": chapters }))
    }

    async fn fetch_chapter_list(
        &self,
        book_id: &BookId,
        log: bool,
    ) -> UpstreamResult<Vec<Payload>> {
        self.ensure_available("fetch_chapter_list")?;
        let book = self.find_book(book_id, "fetch_chapter_list")?;
        if log {
            log::info!("book {} has {} chapters", book_id, book.chapters.len());
        }
        Ok(book.chapters)
    }

    async fn fetch_chapter(
        &self,
        book_id: &BookId,
        chapter_id: &ChapterId,
    ) -> UpstreamResult<Payload> {
        self.chapter_fetches.fetch_add(1, Ordering::SeqCst);
        self.ensure_available("fetch_chapter")?;

        let key = chapter_id.to_string();
        let (delay, failing) = {
            let faults = self.faults.read();
            (faults.delays.get(&key).copied(), faults.failing.contains(&key))
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if failing {
            return Err(UpstreamError::status(
                502,
                format!("chapter {} could not be retrieved", chapter_id),
                ErrorContext::new("fetch_chapter").with_resource(chapter_id),
            ));
        }

        let book = self.find_book(book_id, "fetch_chapter")?;
        book.chapters
            .into_iter()
            .find(|c| c.get("chapterId").is_some_and(|v| chapter_id.matches(v)))
            .ok_or_else(|| {
                UpstreamError::not_found(
                    format!("chapter {} not found in book {}", chapter_id, book_id),
                    ErrorContext::new("fetch_chapter").with_resource(chapter_id),
                )
            })
    }

    async fn search(&self, keyword: &str, log: bool) -> UpstreamResult<Vec<Payload>> {
        self.ensure_available("search")?;
        let needle = keyword.to_lowercase();
        let hits: Vec<Payload> = self
            .books
            .read()
            .iter()
            .filter(|b| b.matches_keyword(&needle))
            .map(LocalBook::summary)
            .collect();
        if log {
            log::info!("search '{}' -> {} hits", keyword, hits.len());
        }
        Ok(hits)
    }

    async fn fetch_hot_searches(&self, _log: bool) -> UpstreamResult<Vec<Payload>> {
        self.ensure_available("fetch_hot_searches")?;
        Ok(self
            .books
            .read()
            .iter()
            .rev()
            .take(PAGE_SIZE)
            .map(|b| json!({ "bookId": b.book_id, "bookName": b.book_name }))
            .collect())
    }

    async fn health_check(&self) -> UpstreamResult<bool> {
        Ok(!self.faults.read().unavailable)
    }
}
