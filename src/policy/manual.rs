use super::{PolicyCore, RefreshPolicy};
use crate::cache::CacheLayer;
use crate::fetcher::ConfigFetcher;
use async_trait::async_trait;

/// Only fetches when asked to via [`RefreshPolicy::refresh`]
/// (`force_refresh` on the client). Reads serve the cache.
pub struct ManualPollingPolicy {
    core: PolicyCore,
}

impl ManualPollingPolicy {
    pub fn new(fetcher: ConfigFetcher, cache: CacheLayer) -> Self {
        Self {
            core: PolicyCore::new(fetcher, cache),
        }
    }
}

#[async_trait]
impl RefreshPolicy for ManualPollingPolicy {
    async fn configuration_json(&self) -> Option<String> {
        self.core.cache().get()
    }

    async fn refresh(&self) {
        self.core.fetch_and_store().await;
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use mockito::Server;

    #[tokio::test]
    async fn test_reads_do_not_fetch() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", PATH)
            .with_status(200)
            .with_body("test")
            .expect(0)
            .create_async()
            .await;

        let policy = ManualPollingPolicy::new(fetcher_for(&server), CacheLayer::in_memory());
        assert_eq!(policy.configuration_json().await, None);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_refresh_updates_reads() {
        let mut server = Server::new_async().await;
        let _m1 = enqueue(&mut server, 200, "test").await;
        let _m2 = enqueue(&mut server, 500, "").await;

        let policy = ManualPollingPolicy::new(fetcher_for(&server), CacheLayer::in_memory());

        policy.refresh().await;
        assert_eq!(policy.configuration_json().await.as_deref(), Some("test"));

        policy.refresh().await;
        assert_eq!(policy.configuration_json().await.as_deref(), Some("test"));
    }
}
