//! Orchestrator errors.

use berth_cluster::ClusterError;
use berth_graph::GraphError;
use thiserror::Error;

/// Errors surfaced by install and uninstall requests.
///
/// Configuration errors (unknown dependency, dependency cycle) always
/// surface synchronously from the accepting call. Trigger and timeout
/// errors surface synchronously only for inline installs; background
/// batches report them through the events cache instead, because the
/// accepting call has already returned.
#[derive(Debug, Error)]
pub enum DeployError {
    /// The application's dependency declarations are invalid.
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// No such service in the application, or no deployed unit to remove.
    #[error("Service {service} of application {application} not found")]
    ServiceNotFound {
        application: String,
        service: String,
    },

    /// The deployment trigger rejected a service.
    #[error("Deployment of service {service} failed: {reason}")]
    TriggerFailed { service: String, reason: String },

    /// An operation exceeded its configured timeout. Distinct from
    /// [`DeployError::TriggerFailed`] so callers can tell "probably still
    /// in progress" from "definitely failed".
    #[error("Timed out waiting for {operation}")]
    Timeout { operation: String },

    /// Any other cluster-side failure.
    #[error(transparent)]
    Cluster(#[from] ClusterError),
}

pub type Result<T> = std::result::Result<T, DeployError>;
