//! Background polling policy.
//!
//! A spawned task fetches the configuration immediately and then on a fixed
//! interval. Reads never hit the network: they wait for the first usable poll
//! and then serve the cache. Change listeners run on the polling task, or on
//! the caller of `refresh` when a forced fetch brings a new configuration.

use super::{ConfigurationChangeListener, PolicyCore, RefreshPolicy};
use crate::cache::CacheLayer;
use crate::error::{Error, Result};
use crate::fetcher::ConfigFetcher;
use crate::parser::ConfigurationParser;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{debug, error, info, warn};

/// Default poll interval in seconds.
pub const DEFAULT_AUTO_POLL_INTERVAL_SECS: u64 = 60;

/// Smallest accepted poll interval in seconds.
pub const MIN_AUTO_POLL_INTERVAL_SECS: u64 = 2;

/// Status information for the polling task.
#[derive(Clone, Debug, Default)]
pub struct PollStatus {
    /// Last poll that did not fail
    pub last_poll: Option<DateTime<Utc>>,
    /// Last time the configuration actually changed
    pub last_change: Option<DateTime<Utc>>,
    /// Last error message (if any)
    pub last_error: Option<String>,
    /// Total number of polls that did not fail
    pub poll_count: u64,
    /// Total number of failed polls
    pub error_count: u64,
}

/// Builder for [`AutoPollingPolicy`].
pub struct AutoPollingPolicyBuilder {
    auto_poll_interval_secs: u64,
    listeners: Vec<Arc<dyn ConfigurationChangeListener>>,
}

impl Default for AutoPollingPolicyBuilder {
    fn default() -> Self {
        Self {
            auto_poll_interval_secs: DEFAULT_AUTO_POLL_INTERVAL_SECS,
            listeners: Vec::new(),
        }
    }
}

impl AutoPollingPolicyBuilder {
    /// How often the configuration is fetched. Must be at least 2 seconds.
    pub fn auto_poll_interval_seconds(mut self, seconds: u64) -> Result<Self> {
        if seconds < MIN_AUTO_POLL_INTERVAL_SECS {
            return Err(Error::invalid_argument(
                "autoPollIntervalInSeconds cannot be less than 2 seconds",
            ));
        }
        self.auto_poll_interval_secs = seconds;
        Ok(self)
    }

    /// Register a listener called whenever a different configuration arrives.
    /// Can be called repeatedly.
    pub fn configuration_change_listener<L>(mut self, listener: L) -> Self
    where
        L: ConfigurationChangeListener + 'static,
    {
        self.listeners.push(Arc::new(listener));
        self
    }

    /// Build the policy and start polling.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn build(self, fetcher: ConfigFetcher, cache: CacheLayer) -> AutoPollingPolicy {
        AutoPollingPolicy::start(PolicyCore::new(fetcher, cache), self)
    }
}

/// Fetches the configuration on a background task at a fixed interval.
pub struct AutoPollingPolicy {
    core: PolicyCore,
    listeners: Arc<[Arc<dyn ConfigurationChangeListener>]>,
    initialized: watch::Receiver<bool>,
    status: Arc<Mutex<PollStatus>>,
    handle: std::sync::Mutex<Option<JoinHandle<()>>>,
}

impl AutoPollingPolicy {
    pub fn builder() -> AutoPollingPolicyBuilder {
        AutoPollingPolicyBuilder::default()
    }

    fn start(core: PolicyCore, builder: AutoPollingPolicyBuilder) -> Self {
        let (initialized_tx, initialized) = watch::channel(false);
        let status = Arc::new(Mutex::new(PollStatus::default()));

        let task_core = core.clone();
        let task_status = Arc::clone(&status);
        let listeners: Arc<[Arc<dyn ConfigurationChangeListener>]> = builder.listeners.into();
        let task_listeners = Arc::clone(&listeners);
        let poll_interval_secs = builder.auto_poll_interval_secs;

        let handle = tokio::spawn(async move {
            info!(
                url = %task_core.fetcher().url(),
                interval_secs = poll_interval_secs,
                listeners = task_listeners.len(),
                "Starting auto polling"
            );

            let parser = ConfigurationParser::new();
            let mut ticker = interval(Duration::from_secs(poll_interval_secs));

            loop {
                ticker.tick().await;
                debug!(url = %task_core.fetcher().url(), "Polling configuration");

                let outcome = task_core.fetch_and_store().await;

                if outcome.response.is_failed() {
                    let mut status = task_status.lock().await;
                    status.last_error = Some("configuration fetch failed".to_string());
                    status.error_count += 1;
                    continue;
                }

                let now = Utc::now();
                if let Some(config) = &outcome.changed {
                    notify_listeners(&task_listeners, &parser, config);
                }

                // Readers are released only after listeners saw the first configuration
                initialized_tx.send_if_modified(|initialized| !std::mem::replace(initialized, true));

                let mut status = task_status.lock().await;
                status.last_poll = Some(now);
                status.last_error = None;
                status.poll_count += 1;
                if outcome.changed.is_some() {
                    status.last_change = Some(now);
                }
            }
        });

        Self {
            core,
            listeners,
            initialized,
            status,
            handle: std::sync::Mutex::new(Some(handle)),
        }
    }

    /// Returns a clone of the status tracker for external monitoring.
    pub fn status(&self) -> Arc<Mutex<PollStatus>> {
        Arc::clone(&self.status)
    }

    /// Whether a poll has succeeded yet.
    pub fn is_initialized(&self) -> bool {
        *self.initialized.borrow()
    }
}

fn notify_listeners(
    listeners: &[Arc<dyn ConfigurationChangeListener>],
    parser: &ConfigurationParser,
    config: &str,
) {
    for listener in listeners {
        let result = catch_unwind(AssertUnwindSafe(|| {
            listener.on_configuration_changed(parser, config)
        }));
        if result.is_err() {
            error!("Configuration change listener panicked");
        }
    }
}

#[async_trait]
impl RefreshPolicy for AutoPollingPolicy {
    async fn configuration_json(&self) -> Option<String> {
        let mut initialized = self.initialized.clone();
        if initialized.wait_for(|ready| *ready).await.is_err() {
            // Polling task is gone (closed before the first poll succeeded)
            warn!("Auto polling stopped before the first successful fetch");
        }
        self.core.cache().get()
    }

    async fn refresh(&self) {
        let outcome = self.core.fetch_and_store().await;
        if let Some(config) = &outcome.changed {
            notify_listeners(&self.listeners, &ConfigurationParser::new(), config);
        }
    }

    async fn close(&self) {
        let handle = self
            .handle
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(handle) = handle {
            handle.abort();
            info!(url = %self.core.fetcher().url(), "Auto polling stopped");
        }
    }
}

impl Drop for AutoPollingPolicy {
    fn drop(&mut self) {
        if let Ok(mut handle) = self.handle.lock() {
            if let Some(handle) = handle.take() {
                handle.abort();
            }
        }
    }
}
