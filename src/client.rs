//! Client facade.
//!
//! [`BetterConfigClient`] ties a fetcher, a cache and a refresh policy
//! together and exposes the [`ConfigurationProvider`] getters. Getters never
//! fail: every problem is logged and answered with the caller's default.
//! The `try_*` methods return the error instead.

use crate::cache::{CacheLayer, ConfigCache, InMemoryConfigCache, SqliteConfigCache};
use crate::config::{ClientConfig, PollingMode};
use crate::error::{Error, Result};
use crate::fetcher::{default_http_client, ConfigFetcher, BASE_URL};
use crate::parser::{ConfigValue, ConfigurationParser};
use crate::policy::{
    AutoPollingPolicy, ExpiringCachePolicy, FetchAlwaysPolicy, ManualPollingPolicy,
    RefreshPolicy, DEFAULT_AUTO_POLL_INTERVAL_SECS, DEFAULT_CACHE_REFRESH_INTERVAL_SECS,
};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

/// Smallest accepted bound for getter calls, in seconds.
pub const MIN_MAX_WAIT_SECS: u64 = 2;

/// Read access to a project's configuration.
#[async_trait]
pub trait ConfigurationProvider: Send + Sync {
    /// The configuration as a JSON string, `None` if it cannot be obtained.
    async fn get_configuration_json_string(&self) -> Option<String>;

    /// The whole configuration deserialized into `T`, `default` on any failure.
    async fn get_configuration<T>(&self, default: T) -> T
    where
        T: DeserializeOwned + Send;

    /// The value under `key`, `default` when absent or on any failure.
    async fn get_value<T>(&self, key: &str, default: T) -> T
    where
        T: ConfigValue + Send;

    async fn get_string_value(&self, key: &str, default: &str) -> String {
        self.get_value(key, default.to_string()).await
    }

    async fn get_boolean_value(&self, key: &str, default: bool) -> bool {
        self.get_value(key, default).await
    }

    async fn get_integer_value(&self, key: &str, default: i64) -> i64 {
        self.get_value(key, default).await
    }

    async fn get_double_value(&self, key: &str, default: f64) -> f64 {
        self.get_value(key, default).await
    }

    /// Fetch the latest configuration now, regardless of the refresh policy.
    async fn force_refresh(&self);

    /// Stop background work.
    async fn close(&self);
}

type PolicyFactory =
    Box<dyn FnOnce(ConfigFetcher, CacheLayer) -> Result<Box<dyn RefreshPolicy>> + Send>;

/// Builder for [`BetterConfigClient`].
#[derive(Default)]
pub struct BetterConfigClientBuilder {
    http_client: Option<Client>,
    cache: Option<Arc<dyn ConfigCache>>,
    refresh_policy: Option<PolicyFactory>,
    max_wait_secs: Option<u64>,
    base_url: Option<String>,
}

impl BetterConfigClientBuilder {
    /// HTTP client used to fetch the configuration.
    pub fn http_client(mut self, http_client: Client) -> Self {
        self.http_client = Some(http_client);
        self
    }

    /// Storage for the fetched configuration. Defaults to memory.
    pub fn cache<C: ConfigCache + 'static>(mut self, cache: C) -> Self {
        self.cache = Some(Arc::new(cache));
        self
    }

    /// Factory creating the refresh policy from the client's fetcher and
    /// cache. Defaults to [`AutoPollingPolicy`] polling every 60 seconds.
    pub fn refresh_policy<F>(mut self, factory: F) -> Self
    where
        F: FnOnce(ConfigFetcher, CacheLayer) -> Result<Box<dyn RefreshPolicy>> + Send + 'static,
    {
        self.refresh_policy = Some(Box::new(factory));
        self
    }

    /// Upper bound for how long getters wait. Must be at least 2 seconds.
    pub fn max_wait_time_for_sync_calls_seconds(mut self, seconds: u64) -> Result<Self> {
        if seconds < MIN_MAX_WAIT_SECS {
            return Err(Error::invalid_argument(
                "maxWaitTimeForSyncCallsInSeconds cannot be less than 2 seconds",
            ));
        }
        self.max_wait_secs = Some(seconds);
        Ok(self)
    }

    /// CDN origin, `https://cdn.betterconfig.com` unless set.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Build the client for `project_secret`.
    ///
    /// Must be called from within a Tokio runtime when the refresh policy
    /// spawns background work (the default one does).
    pub fn build(self, project_secret: &str) -> Result<BetterConfigClient> {
        if project_secret.is_empty() {
            return Err(Error::invalid_argument("projectSecret is null or empty"));
        }

        let http_client = match self.http_client {
            Some(client) => client,
            None => default_http_client()?,
        };
        let base_url = self.base_url.as_deref().unwrap_or(BASE_URL);
        let fetcher = ConfigFetcher::with_base_url(http_client, base_url, project_secret);

        let store = self
            .cache
            .unwrap_or_else(|| Arc::new(InMemoryConfigCache::new()));
        let cache = CacheLayer::new(store);

        let refresh_policy = match self.refresh_policy {
            Some(factory) => factory(fetcher, cache)?,
            None => Box::new(AutoPollingPolicy::builder().build(fetcher, cache)),
        };

        info!(
            base_url = %base_url,
            max_wait_secs = ?self.max_wait_secs,
            "BetterConfig client created"
        );

        Ok(BetterConfigClient {
            refresh_policy,
            parser: ConfigurationParser::new(),
            max_wait: self.max_wait_secs,
        })
    }
}

/// Client serving a BetterConfig project's configuration.
pub struct BetterConfigClient {
    refresh_policy: Box<dyn RefreshPolicy>,
    parser: ConfigurationParser,
    max_wait: Option<u64>,
}

impl BetterConfigClient {
    pub fn builder() -> BetterConfigClientBuilder {
        BetterConfigClientBuilder::default()
    }

    /// Client with default settings.
    pub fn new(project_secret: &str) -> Result<Self> {
        Self::builder().build(project_secret)
    }

    /// Client described by a [`ClientConfig`].
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        let mut builder = Self::builder().base_url(config.client.base_url.clone());

        if config.client.max_wait_time_for_sync_calls_seconds > 0 {
            builder = builder.max_wait_time_for_sync_calls_seconds(
                config.client.max_wait_time_for_sync_calls_seconds,
            )?;
        }

        if let Some(db_path) = &config.client.cache_db {
            let cache = SqliteConfigCache::new(db_path, &config.client.project_secret)
                .map_err(Error::Cache)?;
            builder = builder.cache(cache);
        }

        let polling = config.polling.clone();
        builder = builder.refresh_policy(move |fetcher, cache| {
            let policy: Box<dyn RefreshPolicy> = match polling.mode {
                PollingMode::AutoPoll => Box::new(
                    AutoPollingPolicy::builder()
                        .auto_poll_interval_seconds(
                            polling
                                .interval_seconds
                                .unwrap_or(DEFAULT_AUTO_POLL_INTERVAL_SECS),
                        )?
                        .build(fetcher, cache),
                ),
                PollingMode::ExpiringCache => Box::new(
                    ExpiringCachePolicy::builder()
                        .cache_refresh_interval_seconds(
                            polling
                                .interval_seconds
                                .unwrap_or(DEFAULT_CACHE_REFRESH_INTERVAL_SECS),
                        )?
                        .async_refresh(polling.async_refresh)
                        .build(fetcher, cache),
                ),
                PollingMode::Manual => Box::new(ManualPollingPolicy::new(fetcher, cache)),
                PollingMode::FetchAlways => Box::new(FetchAlwaysPolicy::new(fetcher, cache)),
            };
            Ok(policy)
        });

        builder.build(&config.client.project_secret)
    }

    /// Apply the configured wait bound to `future`.
    async fn bounded<T>(&self, future: impl Future<Output = T> + Send) -> Result<T> {
        match self.max_wait {
            Some(secs) => tokio::time::timeout(Duration::from_secs(secs), future)
                .await
                .map_err(|_| Error::Timeout(secs)),
            None => Ok(future.await),
        }
    }

    /// The configuration JSON, or [`Error::NotAvailable`] when nothing was
    /// fetched or cached yet. Not bounded by the max wait.
    pub async fn try_configuration_json(&self) -> Result<String> {
        self.refresh_policy
            .configuration_json()
            .await
            .ok_or(Error::NotAvailable)
    }

    /// The configuration deserialized into `T`, or the reason it is not.
    pub async fn try_configuration<T: DeserializeOwned>(&self) -> Result<T> {
        let json = self.try_configuration_json().await?;
        self.parser.parse(&json)
    }

    /// The value under `key` (`None` when absent), or the reason it cannot be read.
    pub async fn try_value<T: ConfigValue>(&self, key: &str) -> Result<Option<T>> {
        if key.is_empty() {
            return Err(Error::invalid_argument("key is null or empty"));
        }

        let json = self.try_configuration_json().await?;
        self.parser.parse_value(&json, key)
    }
}

#[async_trait]
impl ConfigurationProvider for BetterConfigClient {
    async fn get_configuration_json_string(&self) -> Option<String> {
        match self.bounded(self.try_configuration_json()).await {
            Ok(Ok(config)) => Some(config),
            Ok(Err(Error::NotAvailable)) => None,
            Ok(Err(e)) | Err(e) => {
                error!(error = %e, "An error occurred during reading the configuration");
                None
            }
        }
    }

    async fn get_configuration<T>(&self, default: T) -> T
    where
        T: DeserializeOwned + Send,
    {
        match self.bounded(self.try_configuration::<T>()).await {
            Ok(Ok(config)) => config,
            Ok(Err(e)) | Err(e) => {
                error!(error = %e, "An error occurred during deserialization");
                default
            }
        }
    }

    async fn get_value<T>(&self, key: &str, default: T) -> T
    where
        T: ConfigValue + Send,
    {
        match self.bounded(self.try_value::<T>(key)).await {
            Ok(Ok(Some(value))) => value,
            Ok(Ok(None)) => default,
            Ok(Err(e)) | Err(e) => {
                error!(
                    key = %key,
                    error = %e,
                    "An error occurred during the reading of the value"
                );
                default
            }
        }
    }

    async fn force_refresh(&self) {
        self.refresh_policy.refresh().await;
    }

    async fn close(&self) {
        self.refresh_policy.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_empty_project_secret_rejected() {
        let err = BetterConfigClient::new("").err().unwrap();
        assert_eq!(err.to_string(), "projectSecret is null or empty");

        let err = BetterConfigClient::builder().build("").err().unwrap();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn test_max_wait_below_minimum_rejected() {
        assert!(BetterConfigClient::builder()
            .max_wait_time_for_sync_calls_seconds(1)
            .is_err());
        assert!(BetterConfigClient::builder()
            .max_wait_time_for_sync_calls_seconds(2)
            .is_ok());
    }

    #[tokio::test]
    async fn test_policy_factory_errors_propagate() {
        let err = BetterConfigClient::builder()
            .refresh_policy(|fetcher, cache| {
                let policy = AutoPollingPolicy::builder()
                    .auto_poll_interval_seconds(0)?
                    .build(fetcher, cache);
                Ok(Box::new(policy))
            })
            .build("secret")
            .err()
            .unwrap();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_try_value_rejects_empty_key() {
        let client = BetterConfigClient::builder()
            .refresh_policy(|fetcher, cache| Ok(Box::new(ManualPollingPolicy::new(fetcher, cache))))
            .build("secret")
            .unwrap();

        assert!(matches!(
            client.try_value::<String>("").await,
            Err(Error::InvalidArgument(_))
        ));
        assert_eq!(client.get_string_value("", "def").await, "def");
    }

    #[tokio::test]
    async fn test_nothing_cached_is_not_available() {
        let client = BetterConfigClient::builder()
            .refresh_policy(|fetcher, cache| Ok(Box::new(ManualPollingPolicy::new(fetcher, cache))))
            .build("secret")
            .unwrap();

        assert!(matches!(
            client.try_configuration_json().await,
            Err(Error::NotAvailable)
        ));
        assert!(matches!(
            client.try_configuration::<serde_json::Value>().await,
            Err(Error::NotAvailable)
        ));
        assert_eq!(client.get_configuration_json_string().await, None);
        assert_eq!(client.get_integer_value("key", 14).await, 14);
    }
}
