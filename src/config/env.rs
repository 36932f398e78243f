use super::ClientConfig;

impl ClientConfig {
    /// Defaults overridden by environment variables.
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Apply `BETTERCONFIG_*` environment variables on top of `self`.
    /// Unparsable values are ignored.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(v) = std::env::var("BETTERCONFIG_PROJECT_SECRET") {
            if !v.is_empty() {
                self.client.project_secret = v;
            }
        }
        if let Ok(v) = std::env::var("BETTERCONFIG_BASE_URL") {
            if !v.is_empty() {
                self.client.base_url = v;
            }
        }
        if let Ok(v) = std::env::var("BETTERCONFIG_MAX_WAIT_SECONDS") {
            if let Ok(n) = v.parse::<u64>() {
                self.client.max_wait_time_for_sync_calls_seconds = n;
            }
        }
        if let Ok(v) = std::env::var("BETTERCONFIG_POLL_INTERVAL_SECONDS") {
            if let Ok(n) = v.parse::<u64>() {
                self.polling.interval_seconds = Some(n);
            }
        }
        if let Ok(v) = std::env::var("BETTERCONFIG_CACHE_DB") {
            if !v.is_empty() {
                self.client.cache_db = Some(v);
            }
        }

        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Single test touching process env to avoid races between tests
    #[test]
    fn test_env_overrides() {
        std::env::set_var("BETTERCONFIG_PROJECT_SECRET", "env/secret");
        std::env::set_var("BETTERCONFIG_POLL_INTERVAL_SECONDS", "7");
        std::env::set_var("BETTERCONFIG_MAX_WAIT_SECONDS", "not-a-number");

        let config = ClientConfig::from_env();

        std::env::remove_var("BETTERCONFIG_PROJECT_SECRET");
        std::env::remove_var("BETTERCONFIG_POLL_INTERVAL_SECONDS");
        std::env::remove_var("BETTERCONFIG_MAX_WAIT_SECONDS");

        assert_eq!(config.client.project_secret, "env/secret");
        assert_eq!(config.polling.interval_seconds, Some(7));
        assert_eq!(config.client.max_wait_time_for_sync_calls_seconds, 0);
    }
}
