//! BetterConfig client SDK.
//!
//! Fetches a project's JSON configuration from the BetterConfig CDN, keeps it
//! in a cache, and serves it to the application either raw, deserialized into
//! a typed record, or as individual values looked up by key.
//!
//! # Architecture
//!
//! ```text
//!   BetterConfig CDN (config.json, ETag aware)
//!            ↓
//!      ConfigFetcher
//!            ↓
//! ┌─────────────────────────────────────────┐
//! │       RefreshPolicy                      │
//! │  - AutoPolling (background task)         │
//! │  - ExpiringCache (lazy, TTL based)       │
//! │  - ManualPolling / FetchAlways           │
//! └─────────────────────────────────────────┘
//!            ↕
//!      CacheLayer → ConfigCache (memory, SQLite, custom)
//!            ↓
//!   BetterConfigClient (ConfigurationProvider)
//!            ↓
//!   ConfigurationParser (typed records, single values)
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use betterconfig::{
//!     AutoPollingPolicy, BetterConfigClient, ConfigurationParser, ConfigurationProvider,
//! };
//!
//! # async fn run() -> betterconfig::Result<()> {
//! let client = BetterConfigClient::builder()
//!     .refresh_policy(|fetcher, cache| {
//!         let policy = AutoPollingPolicy::builder()
//!             .auto_poll_interval_seconds(5)?
//!             .configuration_change_listener(|_: &ConfigurationParser, json: &str| {
//!                 println!("configuration changed: {}", json);
//!             })
//!             .build(fetcher, cache);
//!         Ok(Box::new(policy))
//!     })
//!     .build("samples/01")?;
//!
//! let text = client.get_string_value("keySampleText", "").await;
//! println!("{}", text);
//! client.close().await;
//! # Ok(())
//! # }
//! ```

// Error type shared by every module
pub mod error;

// TOML / environment configuration
pub mod config;

// HTTP fetch of the configuration file
pub mod fetcher;

// Cache abstraction and implementations
pub mod cache;

// Refresh policies (auto polling, expiring cache, manual, fetch always)
pub mod policy;

// Typed parsing of configuration JSON
pub mod parser;

// Client facade
pub mod client;

pub use cache::{CacheLayer, ConfigCache, InMemoryConfigCache, SqliteConfigCache};
pub use client::{BetterConfigClient, BetterConfigClientBuilder, ConfigurationProvider};
pub use config::{load_config, ClientConfig, PollingMode};
pub use error::{Error, Result};
pub use fetcher::{ConfigFetcher, FetchResponse};
pub use parser::{ConfigValue, ConfigurationParser};
pub use policy::{
    AutoPollingPolicy, AutoPollingPolicyBuilder, ConfigurationChangeListener, ExpiringCachePolicy,
    ExpiringCachePolicyBuilder, FetchAlwaysPolicy, ManualPollingPolicy, PollStatus,
    RefreshPolicy,
};
