use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Name of the per-directory config overlay.
pub const CWD_CONFIG_NAME: &str = ".readlist.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not determine config directory")]
    NoConfigDir,
    #[error("failed to access config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// On-disk TOML configuration structure.
/// All fields are optional so partial configs work (merge with defaults).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    pub catalog: Option<CatalogConfig>,
    pub filter: Option<FilterConfig>,
    pub storage: Option<StorageConfig>,
    pub display: Option<DisplayConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogConfig {
    pub data_path: Option<String>,
    /// 0 disables truncation.
    pub page_size: Option<usize>,
    pub max_latency_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterConfig {
    pub debounce_ms: Option<u64>,
    pub blur_grace_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    pub dir: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DisplayConfig {
    pub theme: Option<String>,
    pub fps: Option<u32>,
}

/// Platform config directory path: `<config_dir>/readlist/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("readlist").join("config.toml"))
}

/// Load config by cascading CWD `.readlist.toml` over platform config.
/// CWD values override platform values.
pub fn load_config() -> ConfigFile {
    let platform = config_path().and_then(|p| load_from_path(&p));
    let cwd = load_from_path(Path::new(CWD_CONFIG_NAME));

    match (platform, cwd) {
        (None, None) => ConfigFile::default(),
        (Some(p), None) => p,
        (None, Some(c)) => c,
        (Some(p), Some(c)) => merge(p, c),
    }
}

/// Load a config from a specific path. Returns `None` if the file doesn't
/// exist or can't be parsed; parse failures are logged.
pub fn load_from_path(path: &Path) -> Option<ConfigFile> {
    let content = std::fs::read_to_string(path).ok()?;
    match toml::from_str(&content) {
        Ok(cfg) => {
            tracing::debug!(path = %path.display(), "loaded config file");
            Some(cfg)
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "ignoring unparseable config file");
            None
        }
    }
}

fn pick<S, T>(
    overlay: Option<&S>,
    base: Option<&S>,
    field: impl Fn(&S) -> Option<T>,
) -> Option<T> {
    overlay.and_then(&field).or_else(|| base.and_then(&field))
}

/// Merge two configs: `overlay` values take precedence over `base`.
pub fn merge(base: ConfigFile, overlay: ConfigFile) -> ConfigFile {
    let (bc, oc) = (base.catalog.as_ref(), overlay.catalog.as_ref());
    let (bf, of) = (base.filter.as_ref(), overlay.filter.as_ref());
    let (bs, os) = (base.storage.as_ref(), overlay.storage.as_ref());
    let (bd, od) = (base.display.as_ref(), overlay.display.as_ref());

    ConfigFile {
        catalog: Some(CatalogConfig {
            data_path: pick(oc, bc, |c| c.data_path.clone()),
            page_size: pick(oc, bc, |c| c.page_size),
            max_latency_ms: pick(oc, bc, |c| c.max_latency_ms),
        }),
        filter: Some(FilterConfig {
            debounce_ms: pick(of, bf, |f| f.debounce_ms),
            blur_grace_ms: pick(of, bf, |f| f.blur_grace_ms),
        }),
        storage: Some(StorageConfig {
            dir: pick(os, bs, |s| s.dir.clone()),
        }),
        display: Some(DisplayConfig {
            theme: pick(od, bd, |d| d.theme.clone()),
            fps: pick(od, bd, |d| d.fps),
        }),
    }
}

/// Write `config` to `path`, creating parent directories.
pub fn save_to_path(config: &ConfigFile, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}

/// Save the current config to the platform config directory.
pub fn save_config(config: &ConfigFile) -> Result<PathBuf, ConfigError> {
    let path = config_path().ok_or(ConfigError::NoConfigDir)?;
    save_to_path(config, &path)?;
    tracing::info!(path = %path.display(), "saved config");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_deserializes() {
        let toml_str = "[filter]\ndebounce_ms = 150\n";
        let parsed: ConfigFile = toml::from_str(toml_str).unwrap();
        let filter = parsed.filter.unwrap();
        assert_eq!(filter.debounce_ms, Some(150));
        assert!(filter.blur_grace_ms.is_none());
        assert!(parsed.catalog.is_none());
    }

    #[test]
    fn merge_overlay_wins_and_base_fills_gaps() {
        let base = ConfigFile {
            catalog: Some(CatalogConfig {
                data_path: Some("/base/books.json".to_string()),
                page_size: Some(20),
                ..Default::default()
            }),
            display: Some(DisplayConfig {
                theme: Some("modern".to_string()),
                fps: Some(30),
            }),
            ..Default::default()
        };
        let overlay = ConfigFile {
            catalog: Some(CatalogConfig {
                page_size: Some(5),
                ..Default::default()
            }),
            display: Some(DisplayConfig {
                theme: Some("hacker".to_string()),
                fps: None,
            }),
            ..Default::default()
        };
        let merged = merge(base, overlay);
        let catalog = merged.catalog.unwrap();
        assert_eq!(catalog.data_path.as_deref(), Some("/base/books.json"));
        assert_eq!(catalog.page_size, Some(5));
        let display = merged.display.unwrap();
        assert_eq!(display.theme.as_deref(), Some("hacker"));
        assert_eq!(display.fps, Some(30));
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let config = ConfigFile {
            storage: Some(StorageConfig {
                dir: Some("/var/lib/readlist".to_string()),
            }),
            ..Default::default()
        };
        save_to_path(&config, &path).unwrap();
        let loaded = load_from_path(&path).unwrap();
        assert_eq!(
            loaded.storage.unwrap().dir.as_deref(),
            Some("/var/lib/readlist")
        );
    }

    #[test]
    fn unparseable_file_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[filter\ndebounce_ms = ").unwrap();
        assert!(load_from_path(&path).is_none());
        assert!(load_from_path(&dir.path().join("missing.toml")).is_none());
    }
}
