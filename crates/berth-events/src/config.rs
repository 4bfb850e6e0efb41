//! Events cache configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for the deployment events cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Minimum time between two feed refreshes of the same entry.
    pub refresh_interval: Duration,

    /// Events returned per query when the caller leaves `to` unspecified.
    pub page_size: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            refresh_interval: Duration::from_millis(500),
            page_size: 100,
        }
    }
}
