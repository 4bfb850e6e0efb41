//! Watcher configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for deployment watchers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Fixed delay between two polls of the same deployment.
    pub tick_interval: Duration,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(2),
        }
    }
}
