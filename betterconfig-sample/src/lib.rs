//! BetterConfig sample.
//!
//! Builds a client with an auto polling policy whose change listener parses
//! each new configuration into a [`Sample`] record and shows its four fields
//! in a [`TextView`] (stdout plus the last rendered text).

use betterconfig::{
    AutoPollingPolicy, BetterConfigClient, ClientConfig, ConfigurationChangeListener,
    ConfigurationParser, Error, PollingMode, RefreshPolicy, SqliteConfigCache,
};
use serde::Deserialize;
use std::sync::{Arc, Mutex};
use tracing::warn;

/// Poll interval used by the sample when nothing else is configured.
pub const SAMPLE_POLL_INTERVAL_SECS: u64 = 5;

/// Project key of the public sample configuration.
pub const SAMPLE_PROJECT_SECRET: &str = "samples/01";

/// The sample record. Absent fields keep their defaults.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Sample {
    pub key_bool: bool,
    pub key_integer: i64,
    pub key_double: f64,
    pub key_string: String,
}

/// Text shown for a record.
pub fn render(sample: &Sample) -> String {
    format!(
        "keyBool: {}\nkeyInteger: {}\nkeyDouble: {:?}\nkeyString: {}",
        sample.key_bool, sample.key_integer, sample.key_double, sample.key_string
    )
}

/// Console stand-in for a text widget. Clones share the same text.
#[derive(Clone, Debug, Default)]
pub struct TextView {
    text: Arc<Mutex<String>>,
    echo: bool,
}

impl TextView {
    /// A view that also prints every update to stdout.
    pub fn stdout() -> Self {
        Self {
            text: Arc::default(),
            echo: true,
        }
    }

    pub fn set_text(&self, text: String) {
        if self.echo {
            println!("{}\n", text);
        }
        *self
            .text
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = text;
    }

    pub fn text(&self) -> String {
        self.text
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

/// Listener that renders every new configuration into `view`.
///
/// A configuration that does not parse leaves the previous text in place.
pub fn change_listener(view: TextView) -> impl ConfigurationChangeListener {
    move |parser: &ConfigurationParser, new_configuration: &str| {
        match parser.parse::<Sample>(new_configuration) {
            Ok(sample) => view.set_text(render(&sample)),
            Err(e) => warn!(error = %e, "Ignoring configuration that does not fit the sample"),
        }
    }
}

/// Poll interval for the sample: the configured one, else 5 seconds.
pub fn sample_interval(config: &ClientConfig) -> u64 {
    config
        .polling
        .interval_seconds
        .unwrap_or(SAMPLE_POLL_INTERVAL_SECS)
}

/// Build the sample client: auto polling at [`sample_interval`] with
/// [`change_listener`] attached.
///
/// The sample always auto polls, since only that policy drives the listener
/// on its own; any other `polling.mode` is ignored with a warning.
/// `client.cache_db` is honored.
pub fn build_client(
    config: &ClientConfig,
    view: TextView,
) -> betterconfig::Result<BetterConfigClient> {
    let interval = sample_interval(config);

    if config.polling.mode != PollingMode::AutoPoll {
        warn!(mode = ?config.polling.mode, "The sample always uses auto polling");
    }

    let mut builder = BetterConfigClient::builder().base_url(config.client.base_url.clone());
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

    builder
        .refresh_policy(move |fetcher, cache| {
            let policy = AutoPollingPolicy::builder()
                .auto_poll_interval_seconds(interval)?
                .configuration_change_listener(change_listener(view))
                .build(fetcher, cache);
            Ok(Box::new(policy) as Box<dyn RefreshPolicy>)
        })
        .build(&config.client.project_secret)
}
