//! The cluster provider contract.

use std::time::Duration;

use async_trait::async_trait;
use berth_types::{DeploymentId, InstanceId, LifecycleEvent};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Result;

/// Resolved configuration for one service deployment.
///
/// Carries everything the provider needs to start the unit. The property map
/// arrives fully merged: application defaults, service-level values, and
/// caller overrides have already been folded together.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentPlan {
    /// Application the service belongs to.
    pub application: String,

    /// Service name within the application.
    pub service: String,

    /// Deployment id shared by every service of the batch.
    pub deployment_id: DeploymentId,

    /// Instance count the deployment is expected to reach.
    pub planned_instances: u32,

    /// Opaque deployment descriptor.
    pub descriptor: Value,

    /// Fully merged deployment properties.
    pub properties: Map<String, Value>,
}

/// Handle to a deployed cluster unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterUnit {
    /// Canonical unit name (`<application>.<service>`).
    pub name: String,

    /// Owning application.
    pub application: String,

    /// Service within the application.
    pub service: String,

    /// Deployment id recorded when the unit was installed. Uninstall reuses
    /// it so clients keep polling the same event sequence.
    pub deployment_id: Option<DeploymentId>,

    /// Instance count the unit was installed with.
    pub planned_instances: u32,
}

impl ClusterUnit {
    /// Canonical unit name for an application/service pair.
    pub fn canonical_name(application: &str, service: &str) -> String {
        format!("{}.{}", application, service)
    }
}

/// One running instance of a deployed unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceHandle {
    /// Provider-assigned instance identity.
    pub id: InstanceId,

    /// Host the instance landed on, when the provider reports one.
    pub host: Option<String>,
}

/// Abstract deployment surface of the cluster.
#[async_trait]
pub trait ClusterProvider: Send + Sync {
    /// Deploy one service and wait for the cluster to accept it.
    ///
    /// Suspends the calling task until the provider acknowledges the unit or
    /// gives up; exceeding `timeout` is reported as a deploy-timeout error,
    /// distinct from other failures.
    async fn deploy(&self, plan: &DeploymentPlan, timeout: Duration) -> Result<ClusterUnit>;

    /// Undeploy a unit, waiting up to `timeout` for confirmation.
    ///
    /// `Ok(false)` means the provider did not confirm completion in time.
    async fn undeploy(&self, unit: &ClusterUnit, timeout: Duration) -> Result<bool>;

    /// Look up the deployed unit for an application/service pair.
    async fn lookup_unit(&self, application: &str, service: &str) -> Result<Option<ClusterUnit>>;

    /// Current instances of a service, polled by lifecycle watchers.
    async fn query_instances(
        &self,
        application: &str,
        service: &str,
    ) -> Result<Vec<InstanceHandle>>;

    /// Full event feed for a unit, oldest first.
    ///
    /// The events cache consumes this incrementally: providers return the
    /// whole feed and the cache skips what it has already merged.
    async fn unit_events(&self, unit: &ClusterUnit) -> Result<Vec<LifecycleEvent>>;
}
