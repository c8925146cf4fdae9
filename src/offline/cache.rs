//! Cache configuration and on-disk layout.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{CacheError, io_at};

const SIDECAR_SUFFIX: &str = ".dataInfo";

/// Response metadata stored next to each cached body.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataInfo {
    pub content_type: Option<String>,
    pub content_encoding: Option<String>,
    #[serde(default)]
    pub headers: BTreeMap<String, Vec<String>>,
}

#[derive(Default)]
struct Settings {
    directory: Option<PathBuf>,
    active: bool,
    no_cache: Vec<Regex>,
}

/// Disk cache configuration. Shared between clients through `Arc`.
#[derive(Default)]
pub struct OfflineCache {
    settings: RwLock<Settings>,
}

impl OfflineCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Settings> {
        self.settings.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Settings> {
        self.settings.write().unwrap_or_else(PoisonError::into_inner)
    }

    // =========================================================================
    // CONFIGURATION
    // =========================================================================

    /// # Errors
    ///
    /// [`CacheError::InvalidArgument`] unless `directory` is an existing,
    /// writable directory.
    pub fn set_cache_directory(&self, directory: impl AsRef<Path>) -> Result<(), CacheError> {
        let directory = directory.as_ref();
        let metadata = std::fs::metadata(directory)
            .map_err(|e| CacheError::InvalidArgument(format!("{}: {e}", directory.display())))?;
        if !metadata.is_dir() {
            return Err(CacheError::InvalidArgument(format!("{} is not a directory", directory.display())));
        }
        check_writable(directory)
            .map_err(|e| CacheError::InvalidArgument(format!("{} is not writable: {e}", directory.display())))?;
        self.write().directory = Some(directory.to_path_buf());
        info!(directory = %directory.display(), "cache directory set");
        Ok(())
    }

    #[must_use]
    pub fn cache_directory(&self) -> Option<PathBuf> {
        self.read().directory.clone()
    }

    /// # Errors
    ///
    /// [`CacheError::InvalidArgument`] when activating without a cache
    /// directory; the cache stays inactive.
    pub fn set_active(&self, active: bool) -> Result<(), CacheError> {
        let mut settings = self.write();
        if active && settings.directory.is_none() {
            return Err(CacheError::InvalidArgument("cannot activate the cache without a cache directory".into()));
        }
        settings.active = active;
        Ok(())
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.read().active
    }

    /// Replace the no-cache filters. Each pattern must match the whole URL.
    ///
    /// # Errors
    ///
    /// [`CacheError::InvalidPattern`] for the first pattern that does not
    /// compile; the previous filters stay in place.
    pub fn set_no_cache_filters<I, S>(&self, patterns: I) -> Result<(), CacheError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let compiled = patterns
            .into_iter()
            .map(|p| {
                let pattern = p.as_ref();
                Regex::new(&format!("^(?:{pattern})$"))
                    .map_err(|source| CacheError::InvalidPattern { pattern: pattern.to_owned(), source })
            })
            .collect::<Result<Vec<_>, _>>()?;
        self.write().no_cache = compiled;
        Ok(())
    }

    /// Filters as given, without the anchoring added on compile.
    #[must_use]
    pub fn no_cache_filters(&self) -> Vec<String> {
        self.read()
            .no_cache
            .iter()
            .map(|r| {
                let s = r.as_str();
                s.strip_prefix("^(?:")
                    .and_then(|s| s.strip_suffix(")$"))
                    .unwrap_or(s)
                    .to_owned()
            })
            .collect()
    }

    // =========================================================================
    // LAYOUT
    // =========================================================================

    /// Cache file for `url`: the cache directory joined with the URL encoded
    /// as `application/x-www-form-urlencoded`. Depends on nothing else.
    ///
    /// # Errors
    ///
    /// [`CacheError::NoDirectory`] without a cache directory.
    pub fn filename_for_url(&self, url: &str) -> Result<PathBuf, CacheError> {
        let directory = self.cache_directory().ok_or(CacheError::NoDirectory)?;
        let encoded: String = url::form_urlencoded::byte_serialize(url.as_bytes()).collect();
        Ok(directory.join(encoded))
    }

    /// Active and not excluded by any filter.
    #[must_use]
    pub fn should_cache(&self, url: &str) -> bool {
        let settings = self.read();
        settings.active && !settings.no_cache.iter().any(|r| r.is_match(url))
    }

    /// Non-empty cache file with a readable sidecar.
    #[must_use]
    pub fn is_cached(&self, url: &str) -> bool {
        let Ok(file) = self.filename_for_url(url) else {
            return false;
        };
        let has_body = std::fs::metadata(&file).is_ok_and(|m| m.is_file() && m.len() > 0);
        has_body && read_data_info(&file).is_ok()
    }

    // =========================================================================
    // CLEAR
    // =========================================================================

    /// Delete every file and subdirectory in the cache directory, keeping the
    /// directory. Keeps going past failures and returns the count removed.
    ///
    /// # Errors
    ///
    /// [`CacheError::NoDirectory`] without a cache directory, otherwise the
    /// first I/O error hit.
    pub async fn clear(&self) -> Result<usize, CacheError> {
        let directory = self.cache_directory().ok_or(CacheError::NoDirectory)?;
        let mut entries = tokio::fs::read_dir(&directory).await.map_err(io_at(&directory))?;

        let mut removed = 0;
        let mut first_error = None;
        while let Some(entry) = entries.next_entry().await.map_err(io_at(&directory))? {
            let path = entry.path();
            let result = match entry.file_type().await {
                Ok(kind) if kind.is_dir() => tokio::fs::remove_dir_all(&path).await,
                Ok(_) => tokio::fs::remove_file(&path).await,
                Err(e) => Err(e),
            };
            match result {
                Ok(()) => removed += 1,
                Err(source) => {
                    warn!(path = %path.display(), error = %source, "could not remove cache entry");
                    if first_error.is_none() {
                        first_error = Some(CacheError::Io { path, source });
                    }
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => {
                info!(removed, directory = %directory.display(), "cache cleared");
                Ok(removed)
            }
        }
    }
}

/// Create and remove a scratch file; permission bits alone do not say whether
/// this process may write.
fn check_writable(directory: &Path) -> std::io::Result<()> {
    let scratch = scratch_sibling(&directory.join(".mapview-write-check"));
    std::fs::OpenOptions::new().write(true).create_new(true).open(&scratch)?;
    std::fs::remove_file(&scratch)
}

/// `path` with a `.part` suffix unique to this process and call.
pub(crate) fn scratch_sibling(path: &Path) -> PathBuf {
    static NEXT: AtomicU64 = AtomicU64::new(0);
    let n = NEXT.fetch_add(1, Ordering::Relaxed);
    let mut name = path.as_os_str().to_owned();
    name.push(format!(".{}-{n}.part", std::process::id()));
    PathBuf::from(name)
}

pub(crate) fn sidecar_path(file: &Path) -> PathBuf {
    let mut name = file.as_os_str().to_owned();
    name.push(SIDECAR_SUFFIX);
    PathBuf::from(name)
}

pub(crate) fn read_data_info(file: &Path) -> Result<DataInfo, CacheError> {
    let sidecar = sidecar_path(file);
    let bytes = std::fs::read(&sidecar).map_err(io_at(&sidecar))?;
    Ok(serde_json::from_slice(&bytes)?)
}

#[cfg(test)]
#[path = "cache_test.rs"]
mod tests;
