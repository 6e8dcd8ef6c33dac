//! Book catalog source trait and the in-memory catalog with simulated latency.

use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use thiserror::Error;

use crate::book::{BookRecord, parse_records};
use crate::filter::GenreFilter;

/// Seed catalog compiled into the binary.
const BUNDLED_CATALOG: &str = include_str!("../data/books.json");

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("failed to read catalog: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid catalog JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unexpected catalog layout: {0}")]
    Layout(String),
    #[error("invalid record #{index}: {reason}")]
    InvalidRecord { index: usize, reason: String },
    #[error("catalog unavailable: {0}")]
    Unavailable(String),
}

/// Parameters of a single catalog listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookQuery {
    pub genre: GenreFilter,
    /// Maximum number of records returned; `None` returns every match.
    pub limit: Option<usize>,
}

impl BookQuery {
    /// Every record, untruncated.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn genre(genre: GenreFilter) -> Self {
        Self { genre, limit: None }
    }

    pub fn with_limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }
}

/// A source of book records, possibly slow and possibly failing.
pub trait CatalogSource: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// List records matching the query's genre filter, in catalog order.
    fn list_books<'a>(
        &'a self,
        query: &'a BookQuery,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<BookRecord>, CatalogError>> + Send + 'a>>;
}

/// Delay provider for simulated network latency.
pub trait Latency: Send + Sync {
    fn next_delay(&self) -> Duration;
}

/// Respond immediately.
pub struct NoLatency;

impl Latency for NoLatency {
    fn next_delay(&self) -> Duration {
        Duration::ZERO
    }
}

/// The same delay for every call.
pub struct FixedLatency(pub Duration);

impl Latency for FixedLatency {
    fn next_delay(&self) -> Duration {
        self.0
    }
}

/// Uniformly random delay in `[0, max)` milliseconds.
pub struct RandomLatency {
    max: Duration,
}

impl RandomLatency {
    pub fn new(max: Duration) -> Self {
        Self { max }
    }
}

impl Latency for RandomLatency {
    fn next_delay(&self) -> Duration {
        let max_ms = self.max.as_millis() as u64;
        if max_ms == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(fastrand::u64(0..max_ms))
    }
}

/// Catalog backed by a fixed list of records.
///
/// Supports:
/// - Genre filtering (case-insensitive membership) and result truncation.
/// - Injectable latency (none unless [`with_latency`](InMemoryCatalog::with_latency) is used).
/// - Call counting via [`call_count()`](InMemoryCatalog::call_count).
pub struct InMemoryCatalog {
    name: String,
    books: Vec<BookRecord>,
    latency: Box<dyn Latency>,
    call_count: AtomicUsize,
    last_query: Mutex<Option<BookQuery>>,
}

impl InMemoryCatalog {
    pub fn from_records(books: Vec<BookRecord>) -> Self {
        Self {
            name: "in-memory".to_string(),
            books,
            latency: Box::new(NoLatency),
            call_count: AtomicUsize::new(0),
            last_query: Mutex::new(None),
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, CatalogError> {
        Ok(Self::from_records(parse_records(json)?))
    }

    pub fn from_path(path: &Path) -> Result<Self, CatalogError> {
        let content = std::fs::read_to_string(path)?;
        let catalog = Self::from_json_str(&content)?.with_name(path.display().to_string());
        tracing::info!(path = %path.display(), books = catalog.len(), "loaded catalog");
        Ok(catalog)
    }

    /// The seed catalog shipped with the crate.
    pub fn bundled() -> Result<Self, CatalogError> {
        Ok(Self::from_json_str(BUNDLED_CATALOG)?.with_name("bundled"))
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_latency(mut self, latency: impl Latency + 'static) -> Self {
        self.latency = Box::new(latency);
        self
    }

    pub fn len(&self) -> usize {
        self.books.len()
    }

    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }

    /// How many times `list_books()` has been called.
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// The query passed to the most recent `list_books()` call.
    pub fn last_query(&self) -> Option<BookQuery> {
        self.last_query
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Synchronous selection used by `list_books()` after the delay.
    pub fn select(&self, query: &BookQuery) -> Vec<BookRecord> {
        let matching = self
            .books
            .iter()
            .filter(|b| query.genre.matches(b))
            .cloned();
        match query.limit {
            Some(n) => matching.take(n).collect(),
            None => matching.collect(),
        }
    }
}

impl CatalogSource for InMemoryCatalog {
    fn name(&self) -> &str {
        &self.name
    }

    fn list_books<'a>(
        &'a self,
        query: &'a BookQuery,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<BookRecord>, CatalogError>> + Send + 'a>> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        *self
            .last_query
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(query.clone());
        let delay = self.latency.next_delay();

        Box::pin(async move {
            tracing::debug!(
                catalog = %self.name,
                genre = %query.genre,
                limit = ?query.limit,
                delay_ms = delay.as_millis() as u64,
                "listing books"
            );
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            Ok(self.select(query))
        })
    }
}
