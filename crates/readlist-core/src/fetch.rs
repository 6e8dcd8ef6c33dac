//! Debounced, sequenced catalog fetching.
//!
//! The UI sends [`BookQuery`] requests through a [`FetchHandle`]. A single
//! scheduler task collapses requests arriving within the quiet window into
//! one fetch of the last value, numbers every issued fetch, and cancels the
//! previous in-flight fetch when a newer one starts. Results flow back as
//! [`CatalogEvent`]s; [`LoadState`] on the receiving side drops anything that
//! is not the latest sequence, so a slow stale response never replaces a
//! fresher list.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::book::BookRecord;
use crate::catalog::{BookQuery, CatalogSource};
use crate::genre::GenreIndex;

/// Requests accepted by the scheduler task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchCommand {
    /// Fetch after the quiet window, superseded by any later request.
    Debounced(BookQuery),
    /// Fetch right away (initial load, manual reload).
    Immediate(BookQuery),
    /// Fetch the untruncated catalog and derive the genre index from it.
    GenreIndex,
}

/// Events flowing from the scheduler back to the UI.
#[derive(Debug, Clone)]
pub enum CatalogEvent {
    /// Fetch `seq` was issued; newer than every earlier `seq`.
    Started { seq: u64, query: BookQuery },
    Loaded {
        seq: u64,
        query: BookQuery,
        books: Vec<BookRecord>,
    },
    Failed {
        seq: u64,
        query: BookQuery,
        error: String,
    },
    /// Always sent once per `Started`, after `Loaded`/`Failed` or on cancel.
    Finished { seq: u64 },
    GenresLoaded(GenreIndex),
    GenresFailed(String),
}

/// Cloneable sender side of the scheduler.
#[derive(Debug, Clone)]
pub struct FetchHandle {
    tx: mpsc::UnboundedSender<FetchCommand>,
}

impl FetchHandle {
    pub fn new(tx: mpsc::UnboundedSender<FetchCommand>) -> Self {
        Self { tx }
    }

    pub fn request(&self, query: BookQuery) {
        self.send(FetchCommand::Debounced(query));
    }

    pub fn request_now(&self, query: BookQuery) {
        self.send(FetchCommand::Immediate(query));
    }

    pub fn load_genre_index(&self) {
        self.send(FetchCommand::GenreIndex);
    }

    fn send(&self, cmd: FetchCommand) {
        if self.tx.send(cmd).is_err() {
            tracing::debug!("fetch scheduler stopped, dropping request");
        }
    }
}

/// Owns the scheduler task.
pub struct FetchScheduler {
    handle: FetchHandle,
    cancel: CancellationToken,
}

impl FetchScheduler {
    /// Spawn the scheduler on the current tokio runtime.
    pub fn spawn(
        catalog: Arc<dyn CatalogSource>,
        window: Duration,
        events: mpsc::UnboundedSender<CatalogEvent>,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        tokio::spawn(run_scheduler(catalog, window, rx, events, cancel.clone()));
        Self {
            handle: FetchHandle::new(tx),
            cancel,
        }
    }

    pub fn handle(&self) -> FetchHandle {
        self.handle.clone()
    }

    /// Stop the scheduler and cancel any in-flight fetch.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

impl Drop for FetchScheduler {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn run_scheduler(
    catalog: Arc<dyn CatalogSource>,
    window: Duration,
    mut rx: mpsc::UnboundedReceiver<FetchCommand>,
    events: mpsc::UnboundedSender<CatalogEvent>,
    cancel: CancellationToken,
) {
    let mut seq: u64 = 0;
    let mut in_flight: Option<CancellationToken> = None;

    loop {
        let cmd = tokio::select! {
            _ = cancel.cancelled() => break,
            cmd = rx.recv() => match cmd {
                Some(cmd) => cmd,
                None => break,
            },
        };

        let query = match cmd {
            FetchCommand::GenreIndex => {
                spawn_genre_load(&catalog, &events, &cancel);
                continue;
            }
            FetchCommand::Immediate(query) => query,
            FetchCommand::Debounced(mut query) => {
                // Restart the window on every new request; fetch the last one.
                let quiet = tokio::time::sleep(window);
                tokio::pin!(quiet);
                loop {
                    tokio::select! {
                        _ = cancel.cancelled() => return,
                        _ = &mut quiet => break query,
                        next = rx.recv() => match next {
                            Some(FetchCommand::Debounced(q)) => {
                                tracing::trace!(genre = %q.genre, "debounce window restarted");
                                query = q;
                                quiet.as_mut().reset(tokio::time::Instant::now() + window);
                            }
                            Some(FetchCommand::Immediate(q)) => break q,
                            Some(FetchCommand::GenreIndex) => {
                                spawn_genre_load(&catalog, &events, &cancel);
                            }
                            None => return,
                        },
                    }
                }
            }
        };

        seq += 1;
        if let Some(previous) = in_flight.take() {
            previous.cancel();
        }
        let token = cancel.child_token();
        in_flight = Some(token.clone());

        tracing::debug!(seq, genre = %query.genre, limit = ?query.limit, "issuing fetch");
        if events
            .send(CatalogEvent::Started {
                seq,
                query: query.clone(),
            })
            .is_err()
        {
            break;
        }
        tokio::spawn(fetch_one(
            seq,
            query,
            catalog.clone(),
            events.clone(),
            token,
        ));
    }

    if let Some(previous) = in_flight {
        previous.cancel();
    }
    tracing::debug!("fetch scheduler stopped");
}

/// Sends `Finished` when dropped, whatever path the fetch took.
struct FinishGuard {
    seq: u64,
    events: mpsc::UnboundedSender<CatalogEvent>,
}

impl Drop for FinishGuard {
    fn drop(&mut self) {
        let _ = self.events.send(CatalogEvent::Finished { seq: self.seq });
    }
}

async fn fetch_one(
    seq: u64,
    query: BookQuery,
    catalog: Arc<dyn CatalogSource>,
    events: mpsc::UnboundedSender<CatalogEvent>,
    token: CancellationToken,
) {
    let _finish = FinishGuard {
        seq,
        events: events.clone(),
    };

    tokio::select! {
        _ = token.cancelled() => {
            tracing::debug!(seq, genre = %query.genre, "fetch superseded");
        }
        result = catalog.list_books(&query) => match result {
            Ok(books) => {
                tracing::debug!(seq, genre = %query.genre, count = books.len(), "fetch complete");
                let _ = events.send(CatalogEvent::Loaded { seq, query, books });
            }
            Err(e) => {
                tracing::warn!(
                    seq,
                    catalog = catalog.name(),
                    genre = %query.genre,
                    error = %e,
                    "failed to fetch books"
                );
                let _ = events.send(CatalogEvent::Failed {
                    seq,
                    query,
                    error: e.to_string(),
                });
            }
        },
    }
}

fn spawn_genre_load(
    catalog: &Arc<dyn CatalogSource>,
    events: &mpsc::UnboundedSender<CatalogEvent>,
    cancel: &CancellationToken,
) {
    tokio::spawn(load_genres(
        catalog.clone(),
        events.clone(),
        cancel.child_token(),
    ));
}

async fn load_genres(
    catalog: Arc<dyn CatalogSource>,
    events: mpsc::UnboundedSender<CatalogEvent>,
    token: CancellationToken,
) {
    let query = BookQuery::all();
    tokio::select! {
        _ = token.cancelled() => {}
        result = catalog.list_books(&query) => {
            let event = match result {
                Ok(books) => {
                    let index = GenreIndex::from_records(&books);
                    tracing::info!(books = books.len(), genres = index.len(), "built genre index");
                    CatalogEvent::GenresLoaded(index)
                }
                Err(e) => {
                    tracing::warn!(
                        catalog = catalog.name(),
                        error = %e,
                        "failed to build genre index"
                    );
                    CatalogEvent::GenresFailed(e.to_string())
                }
            };
            let _ = events.send(event);
        }
    }
}

/// Receiving-side view of the fetch pipeline.
#[derive(Debug, Clone, Default)]
pub struct LoadState {
    latest: u64,
    loading: bool,
    last_error: Option<String>,
}

impl LoadState {
    pub fn new() -> Self {
        Self::default()
    }

    /// True while the latest issued fetch has not finished.
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Error of the latest fetch, if it failed.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn latest_seq(&self) -> u64 {
        self.latest
    }

    /// Fold one event into the state. Returns the books to display when the
    /// event carries the latest fetch's result; stale results return `None`.
    pub fn apply(&mut self, event: CatalogEvent) -> Option<(BookQuery, Vec<BookRecord>)> {
        match event {
            CatalogEvent::Started { seq, .. } => {
                if seq > self.latest {
                    self.latest = seq;
                    self.loading = true;
                    self.last_error = None;
                }
                None
            }
            CatalogEvent::Loaded { seq, query, books } => {
                if seq == self.latest {
                    Some((query, books))
                } else {
                    tracing::debug!(seq, latest = self.latest, "discarding stale response");
                    None
                }
            }
            CatalogEvent::Failed { seq, error, .. } => {
                if seq == self.latest {
                    self.last_error = Some(error);
                }
                None
            }
            CatalogEvent::Finished { seq } => {
                if seq == self.latest {
                    self.loading = false;
                }
                None
            }
            CatalogEvent::GenresLoaded(_) | CatalogEvent::GenresFailed(_) => None,
        }
    }
}
