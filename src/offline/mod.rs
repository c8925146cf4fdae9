//! Offline tile cache.
//!
//! DESIGN
//! ======
//! A read-through disk cache for HTTP(S) fetches. [`OfflineCache`] holds the
//! configuration (directory, active flag, no-cache filters) and owns the
//! on-disk layout: one file per URL, named by form-encoding the URL, plus a
//! `<file>.dataInfo` JSON sidecar with content type, content encoding and
//! response headers. [`CachingClient`] is the interception layer: a reqwest
//! client scoped to one cache instance that serves hits from disk and tees
//! misses into the cache while handing the body back.
//!
//! There is no process-wide handler; each client is bound to exactly one
//! cache, and several caches can coexist.
//!
//! | Module | Role |
//! |--------|------|
//! | `cache` | Configuration, filename mapping, sidecar metadata, clear |
//! | `fetch` | [`CachingClient`] request handling |
//! | `preload` | Bounded-concurrency bulk fetch |

mod cache;
mod fetch;
mod preload;

use std::path::{Path, PathBuf};
use std::time::Duration;

pub use cache::{DataInfo, OfflineCache};
pub use fetch::{CachedResponse, CachingClient, ResponseSource};
pub use preload::PreloadSummary;

use crate::config::env_parse;

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("invalid no-cache filter `{pattern}`: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
    #[error("no cache directory configured")]
    NoDirectory,
    #[error("offline cache is not active")]
    Inactive,
    #[error("unsupported url scheme `{0}`; only http and https are cached")]
    UnsupportedScheme(String),
    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("cache i/o failed for {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("invalid cache metadata: {0}")]
    Metadata(#[from] serde_json::Error),
}

pub(crate) fn io_at(path: &Path) -> impl FnOnce(std::io::Error) -> CacheError + '_ {
    move |source| CacheError::Io { path: path.to_path_buf(), source }
}

/// HTTP tuning for [`CachingClient`], loaded from environment variables.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CacheConfig {
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
        }
    }
}

impl CacheConfig {
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            request_timeout: Duration::from_secs(env_parse(
                "MAPVIEW_CACHE_REQUEST_TIMEOUT_SECS",
                DEFAULT_REQUEST_TIMEOUT_SECS,
            )),
            connect_timeout: Duration::from_secs(env_parse(
                "MAPVIEW_CACHE_CONNECT_TIMEOUT_SECS",
                DEFAULT_CONNECT_TIMEOUT_SECS,
            )),
        }
    }
}
