//! In-memory cluster provider
//!
//! Suitable for development and tests. Deployment is immediate; instance
//! arrival and unit event feeds are scripted by the caller, or materialized
//! at deploy time in auto-start mode.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use berth_types::{InstanceId, LifecycleEvent};
use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::{ClusterError, Result};
use crate::provider::{ClusterProvider, ClusterUnit, DeploymentPlan, InstanceHandle};

/// In-memory cluster provider
pub struct InMemoryCluster {
    units: DashMap<String, ClusterUnit>,
    instances: DashMap<String, Vec<InstanceHandle>>,
    feeds: DashMap<String, Vec<LifecycleEvent>>,
    deploy_failures: DashMap<String, String>,
    plans: Mutex<Vec<DeploymentPlan>>,
    query_failures: AtomicUsize,
    confirm_undeploys: AtomicBool,
    auto_start: bool,
    deploy_delay: Option<Duration>,
}

impl InMemoryCluster {
    pub fn new() -> Self {
        Self {
            units: DashMap::new(),
            instances: DashMap::new(),
            feeds: DashMap::new(),
            deploy_failures: DashMap::new(),
            plans: Mutex::new(Vec::new()),
            query_failures: AtomicUsize::new(0),
            confirm_undeploys: AtomicBool::new(true),
            auto_start: false,
            deploy_delay: None,
        }
    }

    /// Materialize a unit's planned instances at deploy time, so watchers
    /// complete without further scripting.
    pub fn with_auto_start(mut self, auto_start: bool) -> Self {
        self.auto_start = auto_start;
        self
    }

    /// Simulate cluster latency on every deploy.
    pub fn with_deploy_delay(mut self, delay: Duration) -> Self {
        self.deploy_delay = Some(delay);
        self
    }

    /// Make every deploy of `service` fail with `reason`.
    pub fn fail_deploy(&self, service: impl Into<String>, reason: impl Into<String>) {
        self.deploy_failures.insert(service.into(), reason.into());
    }

    /// Make the next `count` instance queries fail.
    pub fn fail_queries(&self, count: usize) {
        self.query_failures.store(count, Ordering::SeqCst);
    }

    /// Make undeploys return unconfirmed (`Ok(false)`), leaving the unit in
    /// place.
    pub fn refuse_undeploy_confirmation(&self) {
        self.confirm_undeploys.store(false, Ordering::SeqCst);
    }

    /// Script the arrival of one instance.
    pub fn add_instance(&self, application: &str, service: &str, handle: InstanceHandle) {
        let name = ClusterUnit::canonical_name(application, service);
        self.instances.entry(name).or_default().push(handle);
    }

    /// Append one event to a unit's feed.
    pub fn push_event(&self, unit_name: &str, event: LifecycleEvent) {
        self.feeds.entry(unit_name.to_string()).or_default().push(event);
    }

    /// Services deployed so far, in trigger order.
    pub async fn deploy_log(&self) -> Vec<String> {
        self.plans
            .lock()
            .await
            .iter()
            .map(|plan| plan.service.clone())
            .collect()
    }

    /// Full plans of successful deploys, in trigger order.
    pub async fn deployed_plans(&self) -> Vec<DeploymentPlan> {
        self.plans.lock().await.clone()
    }
}

impl Default for InMemoryCluster {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ClusterProvider for InMemoryCluster {
    async fn deploy(&self, plan: &DeploymentPlan, timeout: Duration) -> Result<ClusterUnit> {
        if let Some(delay) = self.deploy_delay {
            if delay >= timeout {
                return Err(ClusterError::DeployTimeout {
                    service: plan.service.clone(),
                    timeout_secs: timeout.as_secs(),
                });
            }
            tokio::time::sleep(delay).await;
        }

        if let Some(reason) = self.deploy_failures.get(&plan.service) {
            return Err(ClusterError::DeployFailed {
                service: plan.service.clone(),
                reason: reason.clone(),
            });
        }

        let name = ClusterUnit::canonical_name(&plan.application, &plan.service);
        let unit = ClusterUnit {
            name: name.clone(),
            application: plan.application.clone(),
            service: plan.service.clone(),
            deployment_id: Some(plan.deployment_id.clone()),
            planned_instances: plan.planned_instances,
        };
        self.units.insert(name.clone(), unit.clone());

        if self.auto_start {
            let handles = (0..plan.planned_instances)
                .map(|_| InstanceHandle {
                    id: InstanceId::generate(),
                    host: None,
                })
                .collect();
            self.instances.insert(name.clone(), handles);
        }

        self.plans.lock().await.push(plan.clone());
        debug!(unit = %name, "deployed in-memory unit");
        Ok(unit)
    }

    async fn undeploy(&self, unit: &ClusterUnit, _timeout: Duration) -> Result<bool> {
        if !self.confirm_undeploys.load(Ordering::SeqCst) {
            return Ok(false);
        }
        match self.units.remove(&unit.name) {
            Some(_) => {
                self.instances.remove(&unit.name);
                debug!(unit = %unit.name, "undeployed in-memory unit");
                Ok(true)
            }
            None => Err(ClusterError::UnitNotFound {
                application: unit.application.clone(),
                service: unit.service.clone(),
            }),
        }
    }

    async fn lookup_unit(&self, application: &str, service: &str) -> Result<Option<ClusterUnit>> {
        let name = ClusterUnit::canonical_name(application, service);
        Ok(self.units.get(&name).map(|unit| unit.clone()))
    }

    async fn query_instances(
        &self,
        application: &str,
        service: &str,
    ) -> Result<Vec<InstanceHandle>> {
        let scripted_failure = self
            .query_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if scripted_failure {
            return Err(ClusterError::QueryFailed("scripted query failure".into()));
        }

        let name = ClusterUnit::canonical_name(application, service);
        Ok(self
            .instances
            .get(&name)
            .map(|handles| handles.clone())
            .unwrap_or_default())
    }

    async fn unit_events(&self, unit: &ClusterUnit) -> Result<Vec<LifecycleEvent>> {
        Ok(self
            .feeds
            .get(&unit.name)
            .map(|feed| feed.clone())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use berth_types::DeploymentId;

    fn plan(service: &str, planned: u32) -> DeploymentPlan {
        DeploymentPlan {
            application: "shop".to_string(),
            service: service.to_string(),
            deployment_id: DeploymentId::generate(),
            planned_instances: planned,
            descriptor: serde_json::Value::Null,
            properties: serde_json::Map::new(),
        }
    }

    #[tokio::test]
    async fn test_deploy_lookup_undeploy_roundtrip() {
        let cluster = InMemoryCluster::new();
        let unit = cluster
            .deploy(&plan("db", 1), Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(unit.name, "shop.db");

        let found = cluster.lookup_unit("shop", "db").await.unwrap();
        assert!(found.is_some());

        assert!(cluster.undeploy(&unit, Duration::from_secs(1)).await.unwrap());
        assert!(cluster.lookup_unit("shop", "db").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_auto_start_materializes_planned_instances() {
        let cluster = InMemoryCluster::new().with_auto_start(true);
        cluster
            .deploy(&plan("web", 3), Duration::from_secs(1))
            .await
            .unwrap();

        let instances = cluster.query_instances("shop", "web").await.unwrap();
        assert_eq!(instances.len(), 3);
    }

    #[tokio::test]
    async fn test_scripted_deploy_failure() {
        let cluster = InMemoryCluster::new();
        cluster.fail_deploy("db", "no capacity");

        let error = cluster
            .deploy(&plan("db", 1), Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(error, ClusterError::DeployFailed { .. }));
    }

    #[tokio::test]
    async fn test_deploy_delay_beyond_timeout_reports_timeout() {
        let cluster = InMemoryCluster::new().with_deploy_delay(Duration::from_secs(5));
        let error = cluster
            .deploy(&plan("db", 1), Duration::from_millis(10))
            .await
            .unwrap_err();
        assert!(matches!(error, ClusterError::DeployTimeout { .. }));
    }

    #[tokio::test]
    async fn test_query_failures_are_consumed() {
        let cluster = InMemoryCluster::new();
        cluster.fail_queries(2);

        assert!(cluster.query_instances("shop", "db").await.is_err());
        assert!(cluster.query_instances("shop", "db").await.is_err());
        assert!(cluster.query_instances("shop", "db").await.is_ok());
    }

    #[tokio::test]
    async fn test_unconfirmed_undeploy_keeps_unit() {
        let cluster = InMemoryCluster::new();
        let unit = cluster
            .deploy(&plan("db", 1), Duration::from_secs(1))
            .await
            .unwrap();

        cluster.refuse_undeploy_confirmation();
        let confirmed = cluster.undeploy(&unit, Duration::from_secs(1)).await.unwrap();
        assert!(!confirmed);
        assert!(cluster.lookup_unit("shop", "db").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_undeploy_of_unknown_unit_errors() {
        let cluster = InMemoryCluster::new();
        let unit = ClusterUnit {
            name: "shop.ghost".to_string(),
            application: "shop".to_string(),
            service: "ghost".to_string(),
            deployment_id: None,
            planned_instances: 1,
        };
        let error = cluster
            .undeploy(&unit, Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(error, ClusterError::UnitNotFound { .. }));
    }

    #[tokio::test]
    async fn test_deploy_log_preserves_trigger_order() {
        let cluster = InMemoryCluster::new();
        cluster.deploy(&plan("db", 1), Duration::from_secs(1)).await.unwrap();
        cluster.deploy(&plan("web", 1), Duration::from_secs(1)).await.unwrap();
        assert_eq!(cluster.deploy_log().await, vec!["db", "web"]);
    }
}
