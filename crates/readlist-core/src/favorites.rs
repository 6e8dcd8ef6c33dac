//! "Currently reading" flags, persisted through a [`StoragePort`].

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;

use crate::book::BookRecord;
use crate::storage::{StorageError, StoragePort};

/// Storage key holding the JSON-encoded favorites map.
pub const FAVORITES_STORAGE_KEY: &str = "favoriteBooks";

/// Favorite flags keyed by [`BookRecord::favorite_key`]. Absent key means
/// not a favorite.
pub struct FavoritesStore {
    storage: Arc<dyn StoragePort>,
    map: BTreeMap<String, bool>,
    last_persist_error: Option<String>,
}

impl FavoritesStore {
    /// Load the persisted map. Missing, unreadable or malformed data yields an
    /// empty map.
    pub fn hydrate(storage: Arc<dyn StoragePort>) -> Self {
        let map = match storage.read(FAVORITES_STORAGE_KEY) {
            Ok(Some(raw)) => match parse_map(&raw) {
                Ok(map) => map,
                Err(e) => {
                    tracing::warn!(error = %e, "ignoring malformed favorites data");
                    BTreeMap::new()
                }
            },
            Ok(None) => BTreeMap::new(),
            Err(e) => {
                tracing::warn!(error = %e, "failed to read favorites, starting empty");
                BTreeMap::new()
            }
        };
        tracing::debug!(entries = map.len(), "hydrated favorites");
        Self {
            storage,
            map,
            last_persist_error: None,
        }
    }

    pub fn is_favorite(&self, key: &str) -> bool {
        self.map.get(key).copied().unwrap_or(false)
    }

    pub fn is_book_favorite(&self, book: &BookRecord) -> bool {
        self.is_favorite(&book.favorite_key())
    }

    /// Flip the flag for `key` and persist the whole map. Returns the new flag.
    ///
    /// A failed write is logged and remembered; the in-memory flag still
    /// changes.
    pub fn toggle(&mut self, key: &str) -> bool {
        let flag = !self.is_favorite(key);
        self.map.insert(key.to_string(), flag);
        self.persist();
        flag
    }

    /// Number of books currently flagged.
    pub fn len(&self) -> usize {
        self.map.values().filter(|&&v| v).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Keys currently flagged, in key order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.map
            .iter()
            .filter(|&(_, &v)| v)
            .map(|(k, _)| k.as_str())
    }

    /// Error from the most recent write, cleared by the next successful one.
    pub fn last_persist_error(&self) -> Option<&str> {
        self.last_persist_error.as_deref()
    }

    fn persist(&mut self) {
        let result = serde_json::to_string(&self.map)
            .map_err(StorageError::from)
            .and_then(|json| self.storage.write(FAVORITES_STORAGE_KEY, &json));
        match result {
            Ok(()) => self.last_persist_error = None,
            Err(e) => {
                tracing::warn!(error = %e, "failed to persist favorites, keeping in-memory state");
                self.last_persist_error = Some(e.to_string());
            }
        }
    }
}

/// Decode a stored map, keeping only boolean entries.
fn parse_map(raw: &str) -> Result<BTreeMap<String, bool>, StorageError> {
    let entries: BTreeMap<String, Value> = serde_json::from_str(raw)?;
    Ok(entries
        .into_iter()
        .filter_map(|(k, v)| v.as_bool().map(|b| (k, b)))
        .collect())
}
