//! Orchestrator configuration.

use std::time::Duration;

use berth_events::CacheConfig;
use berth_watch::WatchConfig;
use serde::{Deserialize, Serialize};

/// Configuration for the deployment orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// How long one service deployment may take before it is reported as
    /// timed out.
    pub deploy_timeout: Duration,

    /// How long an undeploy may wait for confirmation before the synthetic
    /// timeout event is appended.
    pub undeploy_timeout: Duration,

    /// Install batches the background pool runs at once.
    pub install_workers: usize,

    /// Undeploy operations the background pool runs at once.
    pub undeploy_workers: usize,

    /// Events cache tuning.
    pub cache: CacheConfig,

    /// Lifecycle watcher tuning.
    pub watch: WatchConfig,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            deploy_timeout: Duration::from_secs(300),
            undeploy_timeout: Duration::from_secs(300),
            install_workers: 10,
            undeploy_workers: 10,
            cache: CacheConfig::default(),
            watch: WatchConfig::default(),
        }
    }
}
