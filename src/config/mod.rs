mod env;

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::Path;

/// Complete client configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClientConfig {
    #[serde(default)]
    pub client: ConnectionConfig,
    #[serde(default)]
    pub polling: PollingConfig,
}

/// Where the configuration comes from and how long callers wait for it
#[derive(Debug, Clone, Deserialize)]
pub struct ConnectionConfig {
    /// Project secret identifying the configuration file
    #[serde(default = "default_project_secret")]
    pub project_secret: String,
    /// CDN origin serving `configuration-files/<secret>/config.json`
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Upper bound for getter calls (seconds). 0 waits indefinitely.
    #[serde(default)]
    pub max_wait_time_for_sync_calls_seconds: u64,
    /// Optional SQLite file persisting the last configuration across restarts
    #[serde(default)]
    pub cache_db: Option<String>,
}

fn default_project_secret() -> String {
    "samples/01".to_string()
}

fn default_base_url() -> String {
    crate::fetcher::BASE_URL.to_string()
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            project_secret: default_project_secret(),
            base_url: default_base_url(),
            max_wait_time_for_sync_calls_seconds: 0,
            cache_db: None,
        }
    }
}

/// Which refresh policy to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PollingMode {
    AutoPoll,
    ExpiringCache,
    Manual,
    FetchAlways,
}

/// Refresh policy configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PollingConfig {
    #[serde(default = "default_mode")]
    pub mode: PollingMode,
    /// Poll interval for `auto_poll`, cache lifetime for `expiring_cache`.
    /// Unset means the policy's own default.
    #[serde(default)]
    pub interval_seconds: Option<u64>,
    /// `expiring_cache` only: serve stale values while refreshing
    #[serde(default)]
    pub async_refresh: bool,
}

fn default_mode() -> PollingMode {
    PollingMode::AutoPoll
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            mode: default_mode(),
            interval_seconds: None,
            async_refresh: false,
        }
    }
}

/// Load configuration from TOML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<ClientConfig> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
    toml::from_str(&contents).map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.client.project_secret, "samples/01");
        assert_eq!(config.client.base_url, "https://cdn.betterconfig.com");
        assert_eq!(config.client.max_wait_time_for_sync_calls_seconds, 0);
        assert_eq!(config.polling.mode, PollingMode::AutoPoll);
        assert_eq!(config.polling.interval_seconds, None);
    }

    #[test]
    fn test_config_deserialization() {
        let toml = r#"
            [client]
            project_secret = "my/secret"
            base_url = "http://localhost:8080"
            max_wait_time_for_sync_calls_seconds = 5
            cache_db = "/tmp/betterconfig.db"

            [polling]
            mode = "expiring_cache"
            interval_seconds = 30
            async_refresh = true
        "#;

        let config: ClientConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.client.project_secret, "my/secret");
        assert_eq!(config.client.base_url, "http://localhost:8080");
        assert_eq!(config.client.max_wait_time_for_sync_calls_seconds, 5);
        assert_eq!(config.client.cache_db.as_deref(), Some("/tmp/betterconfig.db"));
        assert_eq!(config.polling.mode, PollingMode::ExpiringCache);
        assert_eq!(config.polling.interval_seconds, Some(30));
        assert!(config.polling.async_refresh);
    }

    #[test]
    fn test_partial_config() {
        // Missing sections use defaults
        let toml = r#"
            [polling]
            interval_seconds = 5
        "#;

        let config: ClientConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.polling.interval_seconds, Some(5));
        assert_eq!(config.polling.mode, PollingMode::AutoPoll);
        assert_eq!(config.client.project_secret, "samples/01");
    }

    #[test]
    fn test_load_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[polling]\nmode = \"manual\"").unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.polling.mode, PollingMode::Manual);
        assert_eq!(config.polling.interval_seconds, None);
    }

    #[test]
    fn test_load_config_errors() {
        assert!(matches!(
            load_config("/nonexistent/betterconfig.toml"),
            Err(Error::Config(_))
        ));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[polling]\nmode = \"sometimes\"").unwrap();
        assert!(matches!(load_config(file.path()), Err(Error::Config(_))));
    }
}
