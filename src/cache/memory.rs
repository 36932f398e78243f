use super::ConfigCache;
use anyhow::Result;
use std::sync::RwLock;

/// Keeps the configuration in process memory. The default cache.
#[derive(Debug, Default)]
pub struct InMemoryConfigCache {
    value: RwLock<Option<String>>,
}

impl InMemoryConfigCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ConfigCache for InMemoryConfigCache {
    fn read(&self) -> Result<Option<String>> {
        let value = self
            .value
            .read()
            .map_err(|_| anyhow::anyhow!("in-memory cache lock poisoned"))?;
        Ok(value.clone())
    }

    fn write(&self, value: &str) -> Result<()> {
        let mut slot = self
            .value
            .write()
            .map_err(|_| anyhow::anyhow!("in-memory cache lock poisoned"))?;
        *slot = Some(value.to_string());
        Ok(())
    }
}
