//! Refresh policies.
//!
//! A policy decides when the configuration is fetched and what a read
//! returns in the meantime. All policies share [`PolicyCore`], which owns the
//! fetcher and the cache and implements the "fetch and store if changed" step.

mod auto_poll;
mod expiring_cache;
mod fetch_always;
mod manual;

pub use auto_poll::{
    AutoPollingPolicy, AutoPollingPolicyBuilder, PollStatus, DEFAULT_AUTO_POLL_INTERVAL_SECS,
};
pub use expiring_cache::{
    ExpiringCachePolicy, ExpiringCachePolicyBuilder, DEFAULT_CACHE_REFRESH_INTERVAL_SECS,
};
pub use fetch_always::FetchAlwaysPolicy;
pub use manual::ManualPollingPolicy;

use crate::cache::CacheLayer;
use crate::fetcher::{ConfigFetcher, FetchResponse};
use crate::parser::ConfigurationParser;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Strategy that keeps the cached configuration up to date.
#[async_trait]
pub trait RefreshPolicy: Send + Sync {
    /// Current configuration JSON, `None` when nothing could be obtained.
    async fn configuration_json(&self) -> Option<String>;

    /// Fetch the latest configuration now.
    async fn refresh(&self);

    /// Stop any background work. Reads after `close` still return the cache.
    async fn close(&self) {}
}

/// Callback invoked with the new configuration whenever it changes.
pub trait ConfigurationChangeListener: Send + Sync {
    fn on_configuration_changed(&self, parser: &ConfigurationParser, new_configuration: &str);
}

impl<F> ConfigurationChangeListener for F
where
    F: Fn(&ConfigurationParser, &str) + Send + Sync,
{
    fn on_configuration_changed(&self, parser: &ConfigurationParser, new_configuration: &str) {
        self(parser, new_configuration)
    }
}

/// Fetcher and cache shared by every policy.
#[derive(Clone)]
pub struct PolicyCore {
    fetcher: Arc<ConfigFetcher>,
    cache: CacheLayer,
}

/// Result of one fetch-and-store step.
pub(crate) struct RefreshOutcome {
    pub response: FetchResponse,
    /// Set when a fetched body differed from the cached one and was stored.
    pub changed: Option<String>,
}

impl PolicyCore {
    pub fn new(fetcher: ConfigFetcher, cache: CacheLayer) -> Self {
        Self {
            fetcher: Arc::new(fetcher),
            cache,
        }
    }

    pub fn cache(&self) -> &CacheLayer {
        &self.cache
    }

    pub fn fetcher(&self) -> &ConfigFetcher {
        &self.fetcher
    }

    /// Fetch once and store the body if it differs from the cached value.
    pub(crate) async fn fetch_and_store(&self) -> RefreshOutcome {
        let response = self.fetcher.fetch().await;

        let changed = match response.config() {
            Some(config) if self.cache.get().as_deref() != Some(config) => {
                self.cache.set(config);
                Some(config.to_string())
            }
            Some(_) => {
                debug!("Fetched configuration is identical to the cached one");
                None
            }
            None => None,
        };

        RefreshOutcome { response, changed }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use mockito::{Mock, Server, ServerGuard};
    use reqwest::Client;

    pub const PATH: &str = "/config.json";

    pub fn fetcher_for(server: &ServerGuard) -> ConfigFetcher {
        ConfigFetcher::with_url(Client::new(), format!("{}{}", server.url(), PATH))
    }

    /// Queue a single response; earlier queued mocks are served first.
    pub async fn enqueue(server: &mut Server, status: usize, body: &str) -> Mock {
        server
            .mock("GET", PATH)
            .with_status(status)
            .with_body(body)
            .expect(1)
            .create_async()
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use mockito::Server;

    #[tokio::test]
    async fn test_fetch_and_store_reports_changes_only() {
        let mut server = Server::new_async().await;
        let _m1 = enqueue(&mut server, 200, "test").await;
        let _m2 = enqueue(&mut server, 200, "test").await;
        let _m3 = enqueue(&mut server, 200, "test2").await;

        let core = PolicyCore::new(fetcher_for(&server), CacheLayer::in_memory());

        assert_eq!(core.fetch_and_store().await.changed.as_deref(), Some("test"));
        assert_eq!(core.fetch_and_store().await.changed, None);
        assert_eq!(core.fetch_and_store().await.changed.as_deref(), Some("test2"));
        assert_eq!(core.cache().get().as_deref(), Some("test2"));
    }

    #[tokio::test]
    async fn test_fetch_and_store_keeps_cache_on_failure() {
        let mut server = Server::new_async().await;
        let _m1 = enqueue(&mut server, 200, "test").await;
        let _m2 = enqueue(&mut server, 500, "").await;

        let core = PolicyCore::new(fetcher_for(&server), CacheLayer::in_memory());
        core.fetch_and_store().await;

        let outcome = core.fetch_and_store().await;
        assert!(outcome.response.is_failed());
        assert_eq!(outcome.changed, None);
        assert_eq!(core.cache().get().as_deref(), Some("test"));
    }

    #[test]
    fn test_closure_is_a_listener() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let listener = move |_: &ConfigurationParser, json: &str| {
            assert_eq!(json, "{}");
            counter.fetch_add(1, Ordering::SeqCst);
        };

        listener.on_configuration_changed(&ConfigurationParser::new(), "{}");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
