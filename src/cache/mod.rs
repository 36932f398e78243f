//! Configuration cache.
//!
//! [`ConfigCache`] is the extension point for custom storage. Policies never
//! talk to it directly; they go through [`CacheLayer`], which keeps an
//! in-memory copy of the last value so a broken store never breaks reads.
//!
//! ```text
//! RefreshPolicy ──get/set──▶ CacheLayer ──read/write──▶ ConfigCache
//!                               │                       (memory, SQLite, custom)
//!                               └─ in-memory copy (fallback)
//! ```

mod memory;
mod sqlite;

pub use memory::InMemoryConfigCache;
pub use sqlite::SqliteConfigCache;

use anyhow::Result;
use std::sync::{Arc, Mutex};
use tracing::error;

/// Storage backend for the latest configuration JSON.
///
/// Implementations must be cheap to call; they are hit on every read.
pub trait ConfigCache: Send + Sync {
    /// Returns the stored configuration, `None` if nothing is stored yet.
    fn read(&self) -> Result<Option<String>>;

    /// Replaces the stored configuration.
    fn write(&self, value: &str) -> Result<()>;
}

/// Wraps a [`ConfigCache`] with an in-memory fallback copy.
#[derive(Clone)]
pub struct CacheLayer {
    store: Arc<dyn ConfigCache>,
    in_memory: Arc<Mutex<Option<String>>>,
}

impl CacheLayer {
    pub fn new(store: Arc<dyn ConfigCache>) -> Self {
        Self {
            store,
            in_memory: Arc::new(Mutex::new(None)),
        }
    }

    /// A layer over [`InMemoryConfigCache`].
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryConfigCache::new()))
    }

    fn in_memory_value(&self) -> Option<String> {
        self.in_memory
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Current configuration.
    ///
    /// Prefers the backing store; uses the in-memory copy when the store fails
    /// or holds nothing.
    pub fn get(&self) -> Option<String> {
        match self.store.read() {
            Ok(Some(value)) => Some(value),
            Ok(None) => self.in_memory_value(),
            Err(e) => {
                error!(error = %e, "Failed to read the configuration cache, using in-memory value");
                self.in_memory_value()
            }
        }
    }

    /// Store a new configuration. Store failures are logged, not returned.
    pub fn set(&self, value: &str) {
        *self
            .in_memory
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(value.to_string());

        if let Err(e) = self.store.write(value) {
            error!(error = %e, "Failed to write the configuration cache");
        }
    }
}
