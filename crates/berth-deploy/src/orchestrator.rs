//! Deployment orchestrator - high-level install and uninstall operations.
//!
//! The orchestrator is the entry point for deployment requests. It resolves
//! the dependency order, merges properties, triggers each service through
//! the cluster provider, registers resulting units with the events cache,
//! and spawns a lifecycle watcher per unit. Callers receive a deployment id
//! and follow progress by polling events.

use std::sync::Arc;
use std::time::Duration;

use berth_cluster::{ClusterError, ClusterProvider, ClusterUnit, DeploymentPlan};
use berth_events::EventsCache;
use berth_graph::resolve_install_order;
use berth_types::{ApplicationSpec, DeploymentId, LifecycleEvent, ServiceSpec};
use berth_watch::{DeploymentWatcher, WatchConfig, WatchHandle};
use dashmap::DashMap;
use serde_json::{Map, Value};
use tokio::sync::Semaphore;
use tracing::{debug, info, instrument, warn};

use crate::config::OrchestratorConfig;
use crate::error::{DeployError, Result};
use crate::merge::merge_properties;

/// Orchestrates application installs and uninstalls against a cluster.
pub struct DeploymentOrchestrator {
    /// Deployment surface of the cluster.
    provider: Arc<dyn ClusterProvider>,
    /// Progress events, keyed by deployment id.
    cache: Arc<EventsCache>,
    /// Watchers still associated with a deployment id.
    watches: Arc<DashMap<DeploymentId, Vec<WatchHandle>>>,
    /// Bounds concurrent background install batches.
    install_permits: Arc<Semaphore>,
    /// Bounds concurrent undeploy operations.
    undeploy_permits: Arc<Semaphore>,
    config: OrchestratorConfig,
}

impl DeploymentOrchestrator {
    /// Create an orchestrator backed by `provider`.
    pub fn new(provider: Arc<dyn ClusterProvider>, config: OrchestratorConfig) -> Self {
        let cache = Arc::new(EventsCache::new(provider.clone(), config.cache.clone()));
        Self {
            provider,
            cache,
            watches: Arc::new(DashMap::new()),
            install_permits: Arc::new(Semaphore::new(config.install_workers)),
            undeploy_permits: Arc::new(Semaphore::new(config.undeploy_workers)),
            config,
        }
    }

    /// Install every service of an application, in dependency order.
    ///
    /// Returns once the batch is either fully triggered (inline batches) or
    /// accepted for background execution; either way the caller polls
    /// events under the returned deployment id. `overrides` are the
    /// highest-precedence property layer.
    #[instrument(skip(self, application, overrides), fields(application = %application.name))]
    pub async fn install_application(
        &self,
        application: ApplicationSpec,
        overrides: Map<String, Value>,
    ) -> Result<DeploymentId> {
        // 1. Resolve the install order; configuration errors fail fast.
        let ordered = resolve_install_order(&application.services)?;
        self.install_batch(application, ordered, overrides).await
    }

    /// Install a single service of an application.
    ///
    /// The service is deployed on its own; its declared dependencies are
    /// assumed to already be running.
    #[instrument(skip(self, application, overrides), fields(application = %application.name, service = service))]
    pub async fn install_service(
        &self,
        application: ApplicationSpec,
        service: &str,
        overrides: Map<String, Value>,
    ) -> Result<DeploymentId> {
        let spec = application
            .services
            .iter()
            .find(|candidate| candidate.name == service)
            .cloned()
            .ok_or_else(|| DeployError::ServiceNotFound {
                application: application.name.clone(),
                service: service.to_string(),
            })?;
        self.install_batch(application, vec![spec], overrides).await
    }

    async fn install_batch(
        &self,
        application: ApplicationSpec,
        ordered: Vec<ServiceSpec>,
        overrides: Map<String, Value>,
    ) -> Result<DeploymentId> {
        // 2. One deployment id for the whole batch.
        let deployment_id = DeploymentId::generate();
        let inline = runs_inline(&ordered);

        let batch = InstallBatch {
            provider: self.provider.clone(),
            cache: self.cache.clone(),
            watches: self.watches.clone(),
            deploy_timeout: self.config.deploy_timeout,
            watch_config: self.config.watch.clone(),
            application: application.name,
            defaults: application.default_properties,
            overrides,
            services: ordered,
            deployment_id: deployment_id.clone(),
        };

        // 3. Trigger inline, or hand the batch to the bounded pool.
        if inline {
            debug!(deployment = %deployment_id, "running install batch inline");
            batch.run().await?;
        } else {
            info!(deployment = %deployment_id, "install batch queued for background execution");
            let permits = self.install_permits.clone();
            tokio::spawn(async move {
                let _permit = match permits.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => return,
                };
                batch.run_background().await;
            });
        }

        Ok(deployment_id)
    }

    /// Uninstall a deployed service.
    ///
    /// The undeploy itself runs on a bounded pool; this returns as soon as
    /// it is queued. Completion is reported as a synthetic event under the
    /// returned deployment id, which is the unit's install-time id when one
    /// is known, so clients already polling it see the outcome. A `None`
    /// timeout falls back to the configured undeploy timeout.
    #[instrument(skip(self))]
    pub async fn uninstall_service(
        &self,
        application: &str,
        service: &str,
        timeout: Option<Duration>,
    ) -> Result<DeploymentId> {
        let timeout = timeout.unwrap_or(self.config.undeploy_timeout);
        // 1. The unit must exist; a missing unit is a caller error.
        let unit = self
            .provider
            .lookup_unit(application, service)
            .await?
            .ok_or_else(|| DeployError::ServiceNotFound {
                application: application.to_string(),
                service: service.to_string(),
            })?;

        let deployment_id = unit
            .deployment_id
            .clone()
            .unwrap_or_else(DeploymentId::generate);

        // 2. Watchers still polling this deployment would observe the
        // instances disappearing; stop them before tearing the unit down.
        if let Some((_, handles)) = self.watches.remove(&deployment_id) {
            for handle in handles {
                debug!(unit = %handle.unit_name(), "cancelling watcher for uninstall");
                handle.cancel();
            }
        }

        // 3. Track the unit so its remaining feed events stay readable.
        self.cache.register_unit(&deployment_id, unit.clone()).await;

        // 4. Queue the undeploy; the caller polls events for the outcome.
        let provider = self.provider.clone();
        let cache = self.cache.clone();
        let permits = self.undeploy_permits.clone();
        let id = deployment_id.clone();
        tokio::spawn(async move {
            let _permit = match permits.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => return,
            };
            undeploy_and_report(provider, cache, unit, id, timeout).await;
        });

        Ok(deployment_id)
    }

    /// Events `[from, to)` for a deployment.
    ///
    /// Partial results are normal, never an error; an unknown id simply has
    /// no events yet.
    pub async fn get_events(
        &self,
        deployment_id: &DeploymentId,
        from: usize,
        to: Option<usize>,
    ) -> Vec<LifecycleEvent> {
        self.cache.query(deployment_id, from, to).await
    }

    /// The events cache backing [`DeploymentOrchestrator::get_events`].
    pub fn events(&self) -> Arc<EventsCache> {
        self.cache.clone()
    }
}

/// Whether a batch may run in the accepting call.
///
/// A service that declares resource requirements may wait on capacity, so
/// any such service sends the whole batch to the background pool.
fn runs_inline(services: &[ServiceSpec]) -> bool {
    services.iter().all(|service| service.resources.is_none())
}

/// One install request, self-contained so it can run on either side of a
/// spawn.
struct InstallBatch {
    provider: Arc<dyn ClusterProvider>,
    cache: Arc<EventsCache>,
    watches: Arc<DashMap<DeploymentId, Vec<WatchHandle>>>,
    deploy_timeout: Duration,
    watch_config: WatchConfig,
    application: String,
    defaults: Map<String, Value>,
    overrides: Map<String, Value>,
    services: Vec<ServiceSpec>,
    deployment_id: DeploymentId,
}

impl InstallBatch {
    /// Deploy every service in order, stopping at the first failure.
    ///
    /// Services already deployed keep running; there is no rollback.
    async fn run(&self) -> Result<()> {
        for service in &self.services {
            self.install_one(service).await?;
        }
        Ok(())
    }

    /// Background variant: failures land in the events cache instead of a
    /// return value, since the accepting call has already returned.
    async fn run_background(&self) {
        for service in &self.services {
            if let Err(error) = self.install_one(service).await {
                let unit = ClusterUnit::canonical_name(&self.application, &service.name);
                warn!(
                    deployment = %self.deployment_id,
                    unit = %unit,
                    error = %error,
                    "aborting install batch"
                );
                self.cache
                    .add(
                        &self.deployment_id,
                        LifecycleEvent::trigger_failed(unit, error.to_string()),
                    )
                    .await;
                return;
            }
        }
    }

    async fn install_one(&self, service: &ServiceSpec) -> Result<()> {
        let properties = merge_properties(&self.defaults, &service.properties, &self.overrides);
        let plan = DeploymentPlan {
            application: self.application.clone(),
            service: service.name.clone(),
            deployment_id: self.deployment_id.clone(),
            planned_instances: service.planned_instances,
            descriptor: service.descriptor.clone(),
            properties,
        };

        let unit = self
            .provider
            .deploy(&plan, self.deploy_timeout)
            .await
            .map_err(map_trigger_error)?;
        info!(unit = %unit.name, deployment = %self.deployment_id, "deployment triggered");

        self.cache
            .register_unit(&self.deployment_id, unit.clone())
            .await;

        let watcher = DeploymentWatcher::new(
            self.provider.clone(),
            self.cache.clone(),
            unit,
            self.deployment_id.clone(),
            self.deploy_timeout,
            self.watch_config.clone(),
        );
        self.watches
            .entry(self.deployment_id.clone())
            .or_default()
            .push(watcher.spawn());

        Ok(())
    }
}

/// Runs on the undeploy pool; the caller already holds the deployment id
/// and polls the events cache for the outcome.
async fn undeploy_and_report(
    provider: Arc<dyn ClusterProvider>,
    cache: Arc<EventsCache>,
    unit: ClusterUnit,
    deployment_id: DeploymentId,
    timeout: Duration,
) {
    let event = match provider.undeploy(&unit, timeout).await {
        Ok(true) => {
            info!(unit = %unit.name, "undeploy confirmed");
            LifecycleEvent::undeploy_succeeded(unit.name.clone())
        }
        Ok(false) => {
            warn!(
                unit = %unit.name,
                timeout_secs = timeout.as_secs(),
                "undeploy not confirmed in time"
            );
            LifecycleEvent::undeploy_timed_out(unit.name.clone())
        }
        Err(error) => {
            warn!(unit = %unit.name, error = %error, "undeploy failed");
            LifecycleEvent::undeploy_failed(unit.name.clone(), error.to_string())
        }
    };
    cache.add(&deployment_id, event).await;
}

fn map_trigger_error(error: ClusterError) -> DeployError {
    match error {
        ClusterError::DeployTimeout {
            service,
            timeout_secs,
        } => DeployError::Timeout {
            operation: format!("deployment of service {} ({}s)", service, timeout_secs),
        },
        ClusterError::DeployFailed { service, reason } => {
            DeployError::TriggerFailed { service, reason }
        }
        other => DeployError::Cluster(other),
    }
}
