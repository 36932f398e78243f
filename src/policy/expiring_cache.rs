//! Lazy, time-to-live based policy.
//!
//! Nothing happens in the background until a read finds the cache older than
//! the refresh interval. That read either waits for the refresh or, with
//! `async_refresh`, returns the stale value and lets the refresh finish on a
//! spawned task.

use super::{PolicyCore, RefreshPolicy};
use crate::cache::CacheLayer;
use crate::error::{Error, Result};
use crate::fetcher::ConfigFetcher;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

pub const DEFAULT_CACHE_REFRESH_INTERVAL_SECS: u64 = 60;

/// Builder for [`ExpiringCachePolicy`].
pub struct ExpiringCachePolicyBuilder {
    cache_refresh_interval_secs: u64,
    async_refresh: bool,
}

impl Default for ExpiringCachePolicyBuilder {
    fn default() -> Self {
        Self {
            cache_refresh_interval_secs: DEFAULT_CACHE_REFRESH_INTERVAL_SECS,
            async_refresh: false,
        }
    }
}

impl ExpiringCachePolicyBuilder {
    /// How long a fetched configuration stays fresh. Must be at least 1 second.
    pub fn cache_refresh_interval_seconds(mut self, seconds: u64) -> Result<Self> {
        if seconds < 1 {
            return Err(Error::invalid_argument(
                "cacheRefreshIntervalInSeconds cannot be less than 1 second",
            ));
        }
        self.cache_refresh_interval_secs = seconds;
        Ok(self)
    }

    /// Serve the stale value while refreshing in the background.
    pub fn async_refresh(mut self, async_refresh: bool) -> Self {
        self.async_refresh = async_refresh;
        self
    }

    pub fn build(self, fetcher: ConfigFetcher, cache: CacheLayer) -> ExpiringCachePolicy {
        ExpiringCachePolicy {
            inner: Arc::new(Inner {
                core: PolicyCore::new(fetcher, cache),
                refresh_interval: Duration::from_secs(self.cache_refresh_interval_secs),
                async_refresh: self.async_refresh,
                last_refreshed: std::sync::Mutex::new(None),
                refresh_lock: Mutex::new(()),
            }),
        }
    }
}

struct Inner {
    core: PolicyCore,
    refresh_interval: Duration,
    async_refresh: bool,
    last_refreshed: std::sync::Mutex<Option<Instant>>,
    /// Serializes refreshes; expired readers queue behind the one in flight.
    refresh_lock: Mutex<()>,
}

impl Inner {
    fn is_expired(&self) -> bool {
        let last = *self
            .last_refreshed
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        match last {
            Some(at) => at.elapsed() >= self.refresh_interval,
            None => true,
        }
    }

    fn mark_refreshed(&self) {
        *self
            .last_refreshed
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(Instant::now());
    }

    /// Caller must hold `refresh_lock`.
    async fn fetch_and_mark(&self) {
        let outcome = self.core.fetch_and_store().await;
        if !outcome.response.is_failed() {
            self.mark_refreshed();
        }
    }

    async fn refresh(&self) {
        let _guard = self.refresh_lock.lock().await;
        self.fetch_and_mark().await;
    }

    async fn refresh_if_expired(&self) {
        let _guard = self.refresh_lock.lock().await;
        // Another reader may have refreshed while we waited for the lock
        if self.is_expired() {
            self.fetch_and_mark().await;
        }
    }
}

/// Refreshes the cache on read once it is older than the refresh interval.
pub struct ExpiringCachePolicy {
    inner: Arc<Inner>,
}

impl ExpiringCachePolicy {
    pub fn builder() -> ExpiringCachePolicyBuilder {
        ExpiringCachePolicyBuilder::default()
    }
}

#[async_trait]
impl RefreshPolicy for ExpiringCachePolicy {
    async fn configuration_json(&self) -> Option<String> {
        if !self.inner.is_expired() {
            return self.inner.core.cache().get();
        }

        if self.inner.async_refresh {
            if let Some(stale) = self.inner.core.cache().get() {
                debug!("Cache expired, serving stale configuration while refreshing");
                let inner = Arc::clone(&self.inner);
                tokio::spawn(async move {
                    inner.refresh_if_expired().await;
                });
                return Some(stale);
            }
        }

        self.inner.refresh_if_expired().await;
        self.inner.core.cache().get()
    }

    async fn refresh(&self) {
        self.inner.refresh().await;
    }
}
