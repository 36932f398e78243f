use super::{PolicyCore, RefreshPolicy};
use crate::cache::CacheLayer;
use crate::fetcher::ConfigFetcher;
use async_trait::async_trait;

/// Fetches on every read; falls back to the cache when the fetch brings
/// nothing new (`304`) or fails.
pub struct FetchAlwaysPolicy {
    core: PolicyCore,
}

impl FetchAlwaysPolicy {
    pub fn new(fetcher: ConfigFetcher, cache: CacheLayer) -> Self {
        Self {
            core: PolicyCore::new(fetcher, cache),
        }
    }
}

#[async_trait]
impl RefreshPolicy for FetchAlwaysPolicy {
    async fn configuration_json(&self) -> Option<String> {
        let outcome = self.core.fetch_and_store().await;
        match outcome.response.config() {
            Some(config) => Some(config.to_string()),
            None => self.core.cache().get(),
        }
    }

    async fn refresh(&self) {
        self.core.fetch_and_store().await;
    }
}
