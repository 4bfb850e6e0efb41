//! Cluster provider error types

use thiserror::Error;

/// Errors surfaced by cluster providers
#[derive(Debug, Error)]
pub enum ClusterError {
    #[error("No deployed unit found for {application}.{service}")]
    UnitNotFound {
        application: String,
        service: String,
    },

    #[error("Deployment of service {service} failed: {reason}")]
    DeployFailed { service: String, reason: String },

    #[error("Timed out waiting for deployment of service {service} after {timeout_secs}s")]
    DeployTimeout { service: String, timeout_secs: u64 },

    #[error("Undeploy of unit {unit} failed: {reason}")]
    UndeployFailed { unit: String, reason: String },

    #[error("Cluster query failed: {0}")]
    QueryFailed(String),
}

/// Result type for cluster operations
pub type Result<T> = std::result::Result<T, ClusterError>;
