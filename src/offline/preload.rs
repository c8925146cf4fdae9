//! Bulk cache warm-up.

use futures_util::{StreamExt, stream};
use tracing::{info, warn};

use super::{CacheError, CachingClient, ResponseSource};

/// Per-URL outcome counts of a [`CachingClient::preload`] run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PreloadSummary {
    /// Downloaded and written to the cache.
    pub fetched: usize,
    /// Already in the cache.
    pub cached: usize,
    /// Excluded by a no-cache filter.
    pub skipped: usize,
    pub failed: usize,
}

enum Outcome {
    Fetched,
    Cached,
    Skipped,
    Failed,
}

impl CachingClient {
    /// Fetch `urls` into the cache with at most `concurrency` requests in
    /// flight. Individual failures are counted, not returned.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Inactive`] when the cache is not active.
    pub async fn preload<I>(&self, urls: I, concurrency: usize) -> Result<PreloadSummary, CacheError>
    where
        I: IntoIterator<Item = String>,
    {
        if !self.cache().is_active() {
            return Err(CacheError::Inactive);
        }

        let outcomes: Vec<Outcome> = stream::iter(urls)
            .map(|url| async move { self.preload_one(&url).await })
            .buffer_unordered(concurrency.max(1))
            .collect()
            .await;

        let mut summary = PreloadSummary::default();
        for outcome in outcomes {
            match outcome {
                Outcome::Fetched => summary.fetched += 1,
                Outcome::Cached => summary.cached += 1,
                Outcome::Skipped => summary.skipped += 1,
                Outcome::Failed => summary.failed += 1,
            }
        }
        info!(
            fetched = summary.fetched,
            cached = summary.cached,
            skipped = summary.skipped,
            failed = summary.failed,
            "preload finished"
        );
        Ok(summary)
    }

    async fn preload_one(&self, url: &str) -> Outcome {
        if !self.cache().should_cache(url) {
            return Outcome::Skipped;
        }
        if self.cache().is_cached(url) {
            return Outcome::Cached;
        }
        match self.fetch(url).await {
            Ok(response) if response.source == ResponseSource::Network => Outcome::Fetched,
            Ok(response) if response.source == ResponseSource::Cache => Outcome::Cached,
            Ok(response) => {
                warn!(%url, status = response.status, "preload not cached");
                Outcome::Failed
            }
            Err(e) => {
                warn!(%url, error = %e, "preload failed");
                Outcome::Failed
            }
        }
    }
}

#[cfg(test)]
#[path = "preload_test.rs"]
mod tests;
