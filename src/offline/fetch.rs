//! Caching HTTP client.
//!
//! DESIGN
//! ======
//! `fetch` decides per request:
//!
//! 1. Not http/https: rejected.
//! 2. Cache inactive or URL filtered: fetched live, nothing written.
//! 3. Cached: served from disk, no network traffic.
//! 4. Otherwise fetched; a 200 body is streamed to a scratch file chunk by
//!    chunk while being collected for the caller, renamed over the cache
//!    file, then the sidecar is written. Other statuses pass through
//!    uncached.
//!
//! The cache file only ever appears complete: concurrent misses for the same
//! URL each write their own scratch file, and a failed download removes its
//! scratch file without touching an existing entry.

use std::path::Path;
use std::sync::Arc;

use reqwest::header::{CONTENT_ENCODING, CONTENT_TYPE, HeaderMap, HeaderName};
use reqwest::{Response, StatusCode};
use tokio::io::AsyncWriteExt;
use tracing::{debug, trace, warn};
use url::Url;

use super::cache::{DataInfo, scratch_sibling, sidecar_path};
use super::{CacheConfig, CacheError, OfflineCache, io_at};

/// Where a response body came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResponseSource {
    /// Fetched and written to the cache.
    Network,
    /// Read from the cache.
    Cache,
    /// Fetched without touching the cache.
    Live,
}

#[derive(Clone, Debug)]
pub struct CachedResponse {
    pub status: u16,
    pub source: ResponseSource,
    pub info: DataInfo,
    pub body: Vec<u8>,
}

/// HTTP client bound to one [`OfflineCache`].
#[derive(Clone)]
pub struct CachingClient {
    cache: Arc<OfflineCache>,
    http: reqwest::Client,
}

impl CachingClient {
    /// # Errors
    ///
    /// Returns [`CacheError::Http`] when the HTTP client cannot be built.
    pub fn new(cache: Arc<OfflineCache>, config: &CacheConfig) -> Result<Self, CacheError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .build()?;
        Ok(Self { cache, http })
    }

    /// Wrap an already configured reqwest client.
    #[must_use]
    pub fn with_http(cache: Arc<OfflineCache>, http: reqwest::Client) -> Self {
        Self { cache, http }
    }

    #[must_use]
    pub fn cache(&self) -> &OfflineCache {
        &self.cache
    }

    /// # Errors
    ///
    /// Returns [`CacheError::UnsupportedScheme`] for anything but http and
    /// https, [`CacheError::Http`] for transport failures and
    /// [`CacheError::Io`] when the cache file cannot be written.
    pub async fn fetch(&self, url: &str) -> Result<CachedResponse, CacheError> {
        let parsed = Url::parse(url)?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(CacheError::UnsupportedScheme(parsed.scheme().to_owned()));
        }

        if !self.cache.should_cache(url) {
            trace!(%url, "fetching live");
            let response = self.http.get(parsed).send().await?;
            let status = response.status().as_u16();
            let info = data_info(response.headers());
            let body = response.bytes().await?.to_vec();
            return Ok(CachedResponse { status, source: ResponseSource::Live, info, body });
        }

        let file = self.cache.filename_for_url(url)?;
        if self.cache.is_cached(url) {
            match read_entry(&file).await {
                Ok((info, body)) => {
                    trace!(%url, "cache hit");
                    return Ok(CachedResponse { status: StatusCode::OK.as_u16(), source: ResponseSource::Cache, info, body });
                }
                Err(e) => warn!(%url, error = %e, "unreadable cache entry; refetching"),
            }
        }

        let mut response = self.http.get(parsed).send().await?;
        let status = response.status();
        let info = data_info(response.headers());
        if status != StatusCode::OK {
            debug!(%url, %status, "not caching non-200 response");
            let body = response.bytes().await?.to_vec();
            return Ok(CachedResponse { status: status.as_u16(), source: ResponseSource::Live, info, body });
        }

        let partial = scratch_sibling(&file);
        let written = match stream_to_file(&mut response, &partial).await {
            Ok(body) => tokio::fs::rename(&partial, &file).await.map(|()| body).map_err(io_at(&file)),
            Err(e) => Err(e),
        };
        let body = match written {
            Ok(body) => body,
            Err(e) => {
                if let Err(remove) = tokio::fs::remove_file(&partial).await {
                    debug!(path = %partial.display(), error = %remove, "partial cache file not removed");
                }
                return Err(e);
            }
        };

        match serde_json::to_vec(&info) {
            Ok(json) => write_sidecar(&file, &json).await,
            Err(e) => warn!(%url, error = %e, "cache metadata not serialized"),
        }

        debug!(%url, bytes = body.len(), "cached");
        Ok(CachedResponse { status: status.as_u16(), source: ResponseSource::Network, info, body })
    }
}

async fn stream_to_file(response: &mut Response, file: &Path) -> Result<Vec<u8>, CacheError> {
    let mut out = tokio::fs::File::create(file).await.map_err(io_at(file))?;
    let mut body = Vec::new();
    while let Some(chunk) = response.chunk().await? {
        out.write_all(&chunk).await.map_err(io_at(file))?;
        body.extend_from_slice(&chunk);
    }
    out.flush().await.map_err(io_at(file))?;
    Ok(body)
}

async fn write_sidecar(file: &Path, json: &[u8]) {
    let sidecar = sidecar_path(file);
    let partial = scratch_sibling(&sidecar);
    let written = match tokio::fs::write(&partial, json).await {
        Ok(()) => tokio::fs::rename(&partial, &sidecar).await,
        Err(e) => Err(e),
    };
    if let Err(e) = written {
        warn!(path = %sidecar.display(), error = %e, "cache metadata not written");
        let _ = tokio::fs::remove_file(&partial).await;
    }
}

async fn read_entry(file: &Path) -> Result<(DataInfo, Vec<u8>), CacheError> {
    let sidecar = sidecar_path(file);
    let json = tokio::fs::read(&sidecar).await.map_err(io_at(&sidecar))?;
    let info = serde_json::from_slice(&json)?;
    let body = tokio::fs::read(file).await.map_err(io_at(file))?;
    Ok((info, body))
}

fn data_info(headers: &HeaderMap) -> DataInfo {
    let mut info = DataInfo {
        content_type: header_text(headers, &CONTENT_TYPE),
        content_encoding: header_text(headers, &CONTENT_ENCODING),
        ..DataInfo::default()
    };
    for (name, value) in headers {
        if let Ok(value) = value.to_str() {
            info.headers.entry(name.as_str().to_owned()).or_default().push(value.to_owned());
        }
    }
    info
}

fn header_text(headers: &HeaderMap, name: &HeaderName) -> Option<String> {
    headers.get(name).and_then(|v| v.to_str().ok()).map(str::to_owned)
}

#[cfg(test)]
#[path = "fetch_test.rs"]
mod tests;
