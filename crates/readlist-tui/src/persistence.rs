use std::path::Path;
use std::sync::Arc;

use readlist_core::{FileStorage, MemoryStorage, StoragePort};

/// Open the on-disk key-value store for persisted UI state.
///
/// Falls back to volatile storage when no directory is known or it cannot be
/// created; favorites then last for this session only.
pub fn open_storage(dir: Option<&Path>) -> Arc<dyn StoragePort> {
    let Some(dir) = dir else {
        tracing::warn!("no storage directory available, favorites will not persist");
        return Arc::new(MemoryStorage::new());
    };
    if let Err(e) = std::fs::create_dir_all(dir) {
        tracing::warn!(
            dir = %dir.display(),
            error = %e,
            "cannot create storage directory, favorites will not persist"
        );
        return Arc::new(MemoryStorage::new());
    }
    let storage = FileStorage::new(dir);
    tracing::info!(dir = %storage.dir().display(), "using file storage");
    Arc::new(storage)
}
