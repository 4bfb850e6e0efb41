//! Per-deployment cache entries.
//!
//! One entry owns the append-only event sequence for a deployment id, the
//! cluster units whose feeds flow into it, and the mutex that serializes
//! refreshes against reads of that entry only. Entries are independent;
//! refreshing one never blocks readers of another.
//!
//! All mutation goes through the entry's mutex: the internal refresh takes
//! `&mut EntryState`, so exclusion is compiler-enforced rather than a
//! calling convention.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use berth_cluster::{ClusterProvider, ClusterUnit};
use berth_types::LifecycleEvent;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Cache entry for one deployment id.
pub struct EventsEntry {
    state: Mutex<EntryState>,
}

#[derive(Default)]
struct EntryState {
    /// Append-only event sequence; index order is chronological.
    events: Vec<LifecycleEvent>,

    /// Units whose feeds are merged into this entry.
    units: Vec<ClusterUnit>,

    /// Consumed feed length per unit name.
    cursors: HashMap<String, usize>,

    /// When the feeds were last pulled; `None` until the first refresh.
    last_refreshed: Option<Instant>,
}

impl EventsEntry {
    /// Create an empty entry tracking no units.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(EntryState::default()),
        }
    }

    /// Create an entry already tracking `unit`.
    pub fn tracking(unit: ClusterUnit) -> Self {
        Self {
            state: Mutex::new(EntryState {
                units: vec![unit],
                ..EntryState::default()
            }),
        }
    }

    /// Append one event to the sequence.
    pub async fn append(&self, event: LifecycleEvent) {
        self.state.lock().await.events.push(event);
    }

    /// Track an additional unit's feed. Tracking the same unit twice is a
    /// no-op.
    pub async fn track_unit(&self, unit: ClusterUnit) {
        let mut state = self.state.lock().await;
        if state.units.iter().any(|tracked| tracked.name == unit.name) {
            return;
        }
        state.units.push(unit);
    }

    /// Number of events currently cached.
    pub async fn len(&self) -> usize {
        self.state.lock().await.events.len()
    }

    /// Whether no events are cached yet.
    pub async fn is_empty(&self) -> bool {
        self.state.lock().await.events.is_empty()
    }

    /// Snapshot of the whole sequence.
    pub async fn snapshot(&self) -> Vec<LifecycleEvent> {
        self.state.lock().await.events.clone()
    }

    /// Pull the tracked feeds and merge events not yet consumed, advancing
    /// the last-refreshed instant.
    pub async fn refresh(&self, provider: &dyn ClusterProvider) -> berth_cluster::Result<()> {
        let mut state = self.state.lock().await;
        refresh_state(&mut state, provider).await
    }

    /// Best-effort read of `[from, to)`.
    ///
    /// Refreshes first when the range is not fully covered and the refresh
    /// interval has elapsed since the last attempt; a failed refresh
    /// degrades to whatever is cached. The result may cover less than the
    /// requested range.
    pub async fn query(
        &self,
        provider: &dyn ClusterProvider,
        refresh_interval: Duration,
        from: usize,
        to: usize,
    ) -> Vec<LifecycleEvent> {
        let mut state = self.state.lock().await;

        let covered = state.events.len() >= to;
        let due = match state.last_refreshed {
            Some(at) => at.elapsed() >= refresh_interval,
            None => true,
        };
        if !covered && due {
            if let Err(error) = refresh_state(&mut state, provider).await {
                warn!(%error, "events refresh failed; serving cached events");
            }
        }

        let end = to.min(state.events.len());
        if from >= end {
            return Vec::new();
        }
        state.events[from..end].to_vec()
    }
}

impl Default for EventsEntry {
    fn default() -> Self {
        Self::new()
    }
}

/// Merge every tracked feed into the sequence, skipping the prefix already
/// consumed for each unit.
///
/// The last-refreshed instant advances before the feeds are pulled, so a
/// failing provider is retried at most once per interval rather than on
/// every read.
async fn refresh_state(
    state: &mut EntryState,
    provider: &dyn ClusterProvider,
) -> berth_cluster::Result<()> {
    state.last_refreshed = Some(Instant::now());

    for unit in state.units.clone() {
        let feed = provider.unit_events(&unit).await?;
        let consumed = state.cursors.get(&unit.name).copied().unwrap_or(0);
        if feed.len() > consumed {
            debug!(unit = %unit.name, appended = feed.len() - consumed, "merged unit feed");
            state.events.extend_from_slice(&feed[consumed..]);
        }
        state.cursors.insert(unit.name.clone(), feed.len().max(consumed));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use berth_cluster::InMemoryCluster;

    fn unit(name: &str) -> ClusterUnit {
        ClusterUnit {
            name: format!("shop.{}", name),
            application: "shop".to_string(),
            service: name.to_string(),
            deployment_id: None,
            planned_instances: 1,
        }
    }

    #[tokio::test]
    async fn test_append_preserves_order() {
        let entry = EventsEntry::new();
        let first = LifecycleEvent::new("shop.db", "first");
        let second = LifecycleEvent::new("shop.db", "second");

        entry.append(first.clone()).await;
        entry.append(second.clone()).await;

        assert_eq!(entry.snapshot().await, vec![first, second]);
    }

    #[tokio::test]
    async fn test_refresh_consumes_each_feed_once() {
        let cluster = InMemoryCluster::new();
        cluster.push_event("shop.db", LifecycleEvent::new("shop.db", "starting"));
        cluster.push_event("shop.db", LifecycleEvent::new("shop.db", "started"));

        let entry = EventsEntry::tracking(unit("db"));
        entry.refresh(&cluster).await.unwrap();
        entry.refresh(&cluster).await.unwrap();

        // The second refresh sees nothing new; no duplicates.
        assert_eq!(entry.len().await, 2);
    }

    #[tokio::test]
    async fn test_tracking_same_unit_twice_is_a_noop() {
        let cluster = InMemoryCluster::new();
        cluster.push_event("shop.db", LifecycleEvent::new("shop.db", "started"));

        let entry = EventsEntry::tracking(unit("db"));
        entry.track_unit(unit("db")).await;
        entry.refresh(&cluster).await.unwrap();

        assert_eq!(entry.len().await, 1);
    }

    #[tokio::test]
    async fn test_query_slices_the_requested_range() {
        let entry = EventsEntry::new();
        for n in 0..5 {
            entry
                .append(LifecycleEvent::new("shop.db", format!("event {}", n)))
                .await;
        }

        let cluster = InMemoryCluster::new();
        let events = entry
            .query(&cluster, Duration::from_millis(500), 1, 3)
            .await;
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].description, "event 1");
        assert_eq!(events[1].description, "event 2");
    }
}
