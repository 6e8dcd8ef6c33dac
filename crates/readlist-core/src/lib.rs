use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub mod book;
pub mod catalog;
pub mod config_file;
pub mod favorites;
pub mod fetch;
pub mod filter;
pub mod genre;
pub mod sort;
pub mod storage;

// Re-export for convenience
pub use book::{BookId, BookRecord, Year};
pub use catalog::{BookQuery, CatalogError, CatalogSource, InMemoryCatalog};
pub use favorites::{FAVORITES_STORAGE_KEY, FavoritesStore};
pub use fetch::{CatalogEvent, FetchCommand, FetchHandle, FetchScheduler, LoadState};
pub use filter::{FilterController, FilterState, GenreFilter};
pub use genre::{GenreIndex, build_genre_index};
pub use sort::{SortConfig, SortDirection, SortKey, sort_books, sorted_indices};
pub use storage::{FileStorage, MemoryStorage, StorageError, StoragePort};

/// Quiet window for collapsing rapid genre filter changes into one fetch.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

/// How long suggestions stay visible after the search box loses focus.
pub const DEFAULT_BLUR_GRACE: Duration = Duration::from_millis(200);

/// Upper bound of the simulated catalog latency.
pub const DEFAULT_MAX_LATENCY: Duration = Duration::from_millis(1200);

/// Number of records a table fetch returns.
pub const DEFAULT_PAGE_SIZE: usize = 10;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),
    #[error("config error: {0}")]
    Config(#[from] config_file::ConfigError),
}

/// Runtime configuration resolved from CLI flags, environment and config file.
#[derive(Clone, Debug)]
pub struct Config {
    /// Catalog JSON file; `None` uses the bundled seed catalog.
    pub data_path: Option<PathBuf>,
    /// Directory holding persisted key-value entries (favorites).
    pub storage_dir: Option<PathBuf>,
    /// Records per table fetch; `None` disables truncation.
    pub page_size: Option<usize>,
    pub debounce: Duration,
    pub blur_grace: Duration,
    /// Upper bound for the simulated latency; zero disables it.
    pub max_latency: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_path: None,
            storage_dir: None,
            page_size: Some(DEFAULT_PAGE_SIZE),
            debounce: DEFAULT_DEBOUNCE,
            blur_grace: DEFAULT_BLUR_GRACE,
            max_latency: DEFAULT_MAX_LATENCY,
        }
    }
}

impl Config {
    /// Apply values present in a config file over the current settings.
    pub fn apply_file(&mut self, file_cfg: &config_file::ConfigFile) {
        if let Some(catalog) = &file_cfg.catalog {
            if let Some(ref path) = catalog.data_path
                && !path.is_empty()
            {
                self.data_path = Some(PathBuf::from(path));
            }
            if let Some(size) = catalog.page_size {
                // 0 means "no truncation"
                self.page_size = (size > 0).then_some(size);
            }
            if let Some(ms) = catalog.max_latency_ms {
                self.max_latency = Duration::from_millis(ms);
            }
        }
        if let Some(filter) = &file_cfg.filter {
            if let Some(ms) = filter.debounce_ms {
                self.debounce = Duration::from_millis(ms);
            }
            if let Some(ms) = filter.blur_grace_ms {
                self.blur_grace = Duration::from_millis(ms);
            }
        }
        if let Some(storage) = &file_cfg.storage
            && let Some(ref dir) = storage.dir
            && !dir.is_empty()
        {
            self.storage_dir = Some(PathBuf::from(dir));
        }
    }

    /// These settings as a config file; the inverse of [`apply_file`](Self::apply_file).
    pub fn to_file(&self) -> config_file::ConfigFile {
        use config_file::{CatalogConfig, ConfigFile, FilterConfig, StorageConfig};

        ConfigFile {
            catalog: Some(CatalogConfig {
                data_path: self.data_path.as_ref().map(|p| p.display().to_string()),
                page_size: Some(self.page_size.unwrap_or(0)),
                max_latency_ms: Some(self.max_latency.as_millis() as u64),
            }),
            filter: Some(FilterConfig {
                debounce_ms: Some(self.debounce.as_millis() as u64),
                blur_grace_ms: Some(self.blur_grace.as_millis() as u64),
            }),
            storage: Some(StorageConfig {
                dir: self.storage_dir.as_ref().map(|p| p.display().to_string()),
            }),
            display: None,
        }
    }

    /// Write these settings and `display` to the platform config file.
    pub fn save(&self, display: config_file::DisplayConfig) -> Result<PathBuf, CoreError> {
        let mut file = self.to_file();
        file.display = Some(display);
        Ok(config_file::save_config(&file)?)
    }

    /// Storage directory, falling back to `<data_dir>/readlist`.
    pub fn resolved_storage_dir(&self) -> Option<PathBuf> {
        self.storage_dir
            .clone()
            .or_else(|| dirs::data_dir().map(|d| d.join("readlist")))
    }
}

/// Open the catalog `config` points at (the bundled seed when unset), with
/// the configured simulated latency.
pub fn open_catalog(config: &Config) -> Result<InMemoryCatalog, CoreError> {
    let catalog = match &config.data_path {
        Some(path) => InMemoryCatalog::from_path(path)?,
        None => InMemoryCatalog::bundled()?,
    };
    Ok(catalog.with_latency(catalog::RandomLatency::new(config.max_latency)))
}
