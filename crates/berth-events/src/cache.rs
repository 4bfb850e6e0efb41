//! Read-through cache keyed by deployment id.
//!
//! The map only hands out entries; per-entry state lives behind each
//! entry's own mutex. Map operations therefore stay cheap and never wait
//! on a refresh in flight for some other deployment.

use std::sync::Arc;

use berth_cluster::{ClusterProvider, ClusterUnit};
use berth_types::{DeploymentId, LifecycleEvent};
use dashmap::DashMap;
use tracing::debug;

use crate::config::CacheConfig;
use crate::entry::EventsEntry;
use crate::error::{CacheError, Result};

/// Deployment-scoped lifecycle events, cached in memory and refreshed from
/// the cluster on demand.
pub struct EventsCache {
    entries: DashMap<DeploymentId, Arc<EventsEntry>>,
    provider: Arc<dyn ClusterProvider>,
    config: CacheConfig,
}

impl EventsCache {
    /// Create an empty cache backed by `provider`.
    pub fn new(provider: Arc<dyn ClusterProvider>, config: CacheConfig) -> Self {
        Self {
            entries: DashMap::new(),
            provider,
            config,
        }
    }

    /// Entry for `id`, created empty on first access. Never touches the
    /// provider.
    pub fn get(&self, id: &DeploymentId) -> Arc<EventsEntry> {
        self.entries
            .entry(id.clone())
            .or_insert_with(|| Arc::new(EventsEntry::new()))
            .clone()
    }

    /// Entry for `id` if one exists, without creating it.
    pub fn get_if_exists(&self, id: &DeploymentId) -> Option<Arc<EventsEntry>> {
        self.entries.get(id).map(|entry| entry.clone())
    }

    /// Install `entry` under `id`, replacing any previous entry.
    pub fn put(&self, id: DeploymentId, entry: EventsEntry) -> Arc<EventsEntry> {
        let entry = Arc::new(entry);
        self.entries.insert(id, entry.clone());
        entry
    }

    /// Append an event to the entry for `id`, creating the entry if needed.
    pub async fn add(&self, id: &DeploymentId, event: LifecycleEvent) {
        self.get(id).append(event).await;
    }

    /// Track `unit`'s feed under `id`, creating the entry if needed.
    pub async fn register_unit(&self, id: &DeploymentId, unit: ClusterUnit) {
        match self.get_if_exists(id) {
            Some(entry) => entry.track_unit(unit).await,
            None => {
                debug!(deployment = %id, unit = %unit.name, "creating events entry");
                self.put(id.clone(), EventsEntry::tracking(unit));
            }
        }
    }

    /// Force a feed pull for `id`'s entry.
    ///
    /// Unlike the read path this surfaces provider errors, so callers that
    /// need a guaranteed-fresh view can tell whether they got one.
    pub async fn refresh(&self, id: &DeploymentId) -> Result<()> {
        let entry = self
            .get_if_exists(id)
            .ok_or_else(|| CacheError::EntryNotFound(id.clone()))?;
        entry.refresh(self.provider.as_ref()).await?;
        Ok(())
    }

    /// Events `[from, to)` for `id`; `to` defaults to one page past `from`.
    ///
    /// Refreshes at most once per configured interval and degrades to
    /// cached events when the cluster is unreachable, so the result may
    /// cover less than the requested range.
    pub async fn query(
        &self,
        id: &DeploymentId,
        from: usize,
        to: Option<usize>,
    ) -> Vec<LifecycleEvent> {
        let to = to.unwrap_or_else(|| from.saturating_add(self.config.page_size));
        self.get(id)
            .query(self.provider.as_ref(), self.config.refresh_interval, from, to)
            .await
    }
}
