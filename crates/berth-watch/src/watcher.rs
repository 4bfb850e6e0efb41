//! Deployment watchers.
//!
//! One watcher per outstanding install. It polls the cluster at a fixed
//! delay, appends a lifecycle event for every newly observed instance, and
//! stops once the unit reaches its planned instance count, its deadline
//! passes, or it is cancelled.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use berth_cluster::{ClusterProvider, ClusterUnit};
use berth_events::EventsCache;
use berth_types::{DeploymentId, InstanceId, LifecycleEvent};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::WatchConfig;

/// Watcher lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WatchState {
    /// Constructed but not yet spawned.
    Pending,
    /// Polling the cluster at a fixed delay.
    Running,
    /// The planned instance count was reached.
    Completed,
    /// The deadline passed before the planned count was reached.
    TimedOut,
    /// Stopped by the orchestrator before finishing.
    Cancelled,
}

impl WatchState {
    /// Whether the watcher has stopped for good.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::TimedOut | Self::Cancelled)
    }
}

/// Polls one deployed unit until it reaches a terminal state.
pub struct DeploymentWatcher {
    provider: Arc<dyn ClusterProvider>,
    cache: Arc<EventsCache>,
    unit: ClusterUnit,
    deployment_id: DeploymentId,
    timeout: Duration,
    config: WatchConfig,
}

impl DeploymentWatcher {
    pub fn new(
        provider: Arc<dyn ClusterProvider>,
        cache: Arc<EventsCache>,
        unit: ClusterUnit,
        deployment_id: DeploymentId,
        timeout: Duration,
        config: WatchConfig,
    ) -> Self {
        Self {
            provider,
            cache,
            unit,
            deployment_id,
            timeout,
            config,
        }
    }

    /// Start polling.
    ///
    /// The deadline is measured from this call, not from construction. The
    /// first poll runs immediately; later polls follow at the configured
    /// fixed delay.
    pub fn spawn(self) -> WatchHandle {
        let (state_tx, state_rx) = watch::channel(WatchState::Running);
        let (cancel_tx, cancel_rx) = mpsc::channel(1);

        let unit_name = self.unit.name.clone();
        let task = tokio::spawn(self.run(state_tx, cancel_rx));

        WatchHandle {
            unit_name,
            state: state_rx,
            cancel: cancel_tx,
            task,
        }
    }

    async fn run(
        self,
        state_tx: watch::Sender<WatchState>,
        mut cancel_rx: mpsc::Receiver<()>,
    ) -> WatchState {
        let deadline = Instant::now() + self.timeout;
        let mut ticker = interval(self.config.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut seen: HashSet<InstanceId> = HashSet::new();

        debug!(
            unit = %self.unit.name,
            deployment = %self.deployment_id,
            planned = self.unit.planned_instances,
            "watcher started"
        );

        let state = loop {
            tokio::select! {
                // Cancellation wins over a due tick; once signalled there
                // are no further cluster calls and no further events. A
                // closed channel means every handle is gone, which cancels
                // too instead of leaving an orphan polling to its deadline.
                biased;

                _ = cancel_rx.recv() => {
                    debug!(unit = %self.unit.name, "watcher cancelled");
                    break WatchState::Cancelled;
                }
                _ = ticker.tick() => {
                    if let Some(terminal) = self.poll_once(&mut seen, deadline).await {
                        break terminal;
                    }
                }
            }
        };

        let _ = state_tx.send(state);
        state
    }

    /// One polling pass; returns the terminal state once the watcher is
    /// done.
    ///
    /// A query failure is logged and retried on the next tick. The deadline
    /// is checked after the query, so a tick that reaches the planned count
    /// completes even if it lands past the deadline.
    async fn poll_once(
        &self,
        seen: &mut HashSet<InstanceId>,
        deadline: Instant,
    ) -> Option<WatchState> {
        match self
            .provider
            .query_instances(&self.unit.application, &self.unit.service)
            .await
        {
            Ok(instances) => {
                for instance in instances {
                    if seen.insert(instance.id.clone()) {
                        self.cache
                            .add(
                                &self.deployment_id,
                                LifecycleEvent::instance_started(
                                    self.unit.name.clone(),
                                    instance.id,
                                ),
                            )
                            .await;
                    }
                }

                if seen.len() >= self.unit.planned_instances as usize {
                    info!(
                        unit = %self.unit.name,
                        instances = seen.len(),
                        "deployment completed"
                    );
                    self.cache
                        .add(
                            &self.deployment_id,
                            LifecycleEvent::deployment_completed(self.unit.name.clone()),
                        )
                        .await;
                    return Some(WatchState::Completed);
                }
            }
            Err(error) => {
                warn!(
                    unit = %self.unit.name,
                    error = %error,
                    "instance query failed; retrying next tick"
                );
            }
        }

        if Instant::now() >= deadline {
            warn!(unit = %self.unit.name, "deployment deadline passed");
            self.cache
                .add(
                    &self.deployment_id,
                    LifecycleEvent::deployment_timed_out(self.unit.name.clone()),
                )
                .await;
            return Some(WatchState::TimedOut);
        }
        None
    }
}

/// Handle to a spawned watcher.
///
/// The watcher lives as long as some handle does: dropping the last handle
/// cancels it at the next tick boundary, same as [`WatchHandle::cancel`].
pub struct WatchHandle {
    unit_name: String,
    state: watch::Receiver<WatchState>,
    cancel: mpsc::Sender<()>,
    task: JoinHandle<WatchState>,
}

impl WatchHandle {
    /// Unit the watcher is tracking.
    pub fn unit_name(&self) -> &str {
        &self.unit_name
    }

    /// Most recently published state.
    pub fn state(&self) -> WatchState {
        *self.state.borrow()
    }

    /// Wait until the published state changes, returning the new state.
    pub async fn changed(&mut self) -> WatchState {
        // Only fails once the watcher is gone, at which point the last
        // published state is the terminal one.
        let _ = self.state.changed().await;
        *self.state.borrow()
    }

    /// Ask the watcher to stop at the next tick boundary.
    ///
    /// Signalling more than once is harmless; the first signal wins.
    pub fn cancel(&self) {
        let _ = self.cancel.try_send(());
    }

    /// Wait for the watcher to reach a terminal state.
    pub async fn wait(self) -> WatchState {
        self.task.await.unwrap_or(WatchState::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use berth_cluster::{InMemoryCluster, InstanceHandle};
    use berth_events::CacheConfig;

    fn unit(planned: u32) -> ClusterUnit {
        ClusterUnit {
            name: "shop.db".to_string(),
            application: "shop".to_string(),
            service: "db".to_string(),
            deployment_id: None,
            planned_instances: planned,
        }
    }

    fn fast_config() -> WatchConfig {
        WatchConfig {
            tick_interval: Duration::from_millis(10),
        }
    }

    fn cache_for(cluster: Arc<InMemoryCluster>) -> Arc<EventsCache> {
        Arc::new(EventsCache::new(cluster, CacheConfig::default()))
    }

    fn instance(n: u32) -> InstanceHandle {
        InstanceHandle {
            id: InstanceId::new(format!("db-{}", n)),
            host: None,
        }
    }

    #[tokio::test]
    async fn test_watcher_completes_once_planned_instances_start() {
        let cluster = Arc::new(InMemoryCluster::new());
        cluster.add_instance("shop", "db", instance(1));
        cluster.add_instance("shop", "db", instance(2));

        let cache = cache_for(cluster.clone());
        let id = DeploymentId::generate();
        let watcher = DeploymentWatcher::new(
            cluster,
            cache.clone(),
            unit(2),
            id.clone(),
            Duration::from_secs(5),
            fast_config(),
        );

        let state = tokio::time::timeout(Duration::from_secs(5), watcher.spawn().wait())
            .await
            .unwrap();
        assert_eq!(state, WatchState::Completed);

        let events = cache.query(&id, 0, None).await;
        assert_eq!(events.len(), 3);
        assert!(events[2].description.contains("installed successfully"));
    }

    #[tokio::test]
    async fn test_duplicate_observations_emit_one_event_per_instance() {
        let cluster = Arc::new(InMemoryCluster::new());
        cluster.add_instance("shop", "db", instance(1));

        let cache = cache_for(cluster.clone());
        let id = DeploymentId::generate();
        let watcher = DeploymentWatcher::new(
            cluster.clone(),
            cache.clone(),
            unit(2),
            id.clone(),
            Duration::from_secs(5),
            fast_config(),
        );
        let handle = watcher.spawn();

        // Several ticks observe db-1 alone before db-2 arrives.
        tokio::time::sleep(Duration::from_millis(50)).await;
        cluster.add_instance("shop", "db", instance(2));

        let state = tokio::time::timeout(Duration::from_secs(5), handle.wait())
            .await
            .unwrap();
        assert_eq!(state, WatchState::Completed);

        let events = cache.query(&id, 0, None).await;
        let for_first: Vec<_> = events
            .iter()
            .filter(|event| event.instance == Some(InstanceId::new("db-1")))
            .collect();
        assert_eq!(for_first.len(), 1);
    }

    #[tokio::test]
    async fn test_deadline_expiry_appends_terminal_event() {
        let cluster = Arc::new(InMemoryCluster::new());
        let cache = cache_for(cluster.clone());
        let id = DeploymentId::generate();

        let watcher = DeploymentWatcher::new(
            cluster,
            cache.clone(),
            unit(1),
            id.clone(),
            Duration::from_millis(30),
            fast_config(),
        );
        let state = tokio::time::timeout(Duration::from_secs(5), watcher.spawn().wait())
            .await
            .unwrap();
        assert_eq!(state, WatchState::TimedOut);

        let events = cache.query(&id, 0, None).await;
        assert_eq!(events.len(), 1);
        assert!(events[0]
            .description
            .contains("Timed out waiting for deployment"));
    }

    #[tokio::test]
    async fn test_cancel_stops_the_watcher_without_events() {
        let cluster = Arc::new(InMemoryCluster::new());
        let cache = cache_for(cluster.clone());
        let id = DeploymentId::generate();

        let watcher = DeploymentWatcher::new(
            cluster,
            cache.clone(),
            unit(1),
            id.clone(),
            Duration::from_secs(30),
            fast_config(),
        );
        let handle = watcher.spawn();
        handle.cancel();

        assert_eq!(handle.wait().await, WatchState::Cancelled);
        assert!(cache.query(&id, 0, None).await.is_empty());
    }

    #[tokio::test]
    async fn test_transient_query_failures_are_retried() {
        let cluster = Arc::new(InMemoryCluster::new());
        cluster.fail_queries(2);
        cluster.add_instance("shop", "db", instance(1));

        let cache = cache_for(cluster.clone());
        let id = DeploymentId::generate();
        let watcher = DeploymentWatcher::new(
            cluster,
            cache.clone(),
            unit(1),
            id.clone(),
            Duration::from_secs(5),
            fast_config(),
        );

        assert_eq!(watcher.spawn().wait().await, WatchState::Completed);
        let events = cache.query(&id, 0, None).await;
        assert_eq!(events.len(), 2);
    }

    #[tokio::test]
    async fn test_handle_reports_running_until_terminal() {
        let cluster = Arc::new(InMemoryCluster::new());
        let cache = cache_for(cluster.clone());
        let id = DeploymentId::generate();

        let watcher = DeploymentWatcher::new(
            cluster,
            cache,
            unit(1),
            id,
            Duration::from_secs(30),
            WatchConfig {
                tick_interval: Duration::from_secs(30),
            },
        );
        let mut handle = watcher.spawn();
        assert_eq!(handle.state(), WatchState::Running);
        assert_eq!(handle.unit_name(), "shop.db");

        handle.cancel();
        assert_eq!(handle.changed().await, WatchState::Cancelled);
        assert_eq!(handle.wait().await, WatchState::Cancelled);
    }

    #[tokio::test]
    async fn test_dropping_the_last_handle_stops_polling() {
        let cluster = Arc::new(InMemoryCluster::new());
        let cache = cache_for(cluster.clone());
        let id = DeploymentId::generate();

        let watcher = DeploymentWatcher::new(
            cluster.clone(),
            cache.clone(),
            unit(1),
            id.clone(),
            Duration::from_secs(30),
            fast_config(),
        );
        drop(watcher.spawn());
        tokio::time::sleep(Duration::from_millis(50)).await;

        // A live watcher would emit an event for this instance.
        cluster.add_instance("shop", "db", instance(1));
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(cache.query(&id, 0, None).await.is_empty());
    }

    #[test]
    fn test_only_finished_states_are_terminal() {
        assert!(!WatchState::Pending.is_terminal());
        assert!(!WatchState::Running.is_terminal());
        assert!(WatchState::Completed.is_terminal());
        assert!(WatchState::TimedOut.is_terminal());
        assert!(WatchState::Cancelled.is_terminal());
    }
}
