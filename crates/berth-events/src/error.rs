//! Events cache error types.

use berth_cluster::ClusterError;
use berth_types::DeploymentId;
use thiserror::Error;

/// Errors from explicit cache operations.
///
/// The read path never returns these; queries degrade to partial results.
#[derive(Debug, Error)]
pub enum CacheError {
    /// No entry is registered under the deployment id.
    #[error("No events entry for {0}")]
    EntryNotFound(DeploymentId),

    /// The underlying feed fetch failed.
    #[error(transparent)]
    Cluster(#[from] ClusterError),
}

/// Result type for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;
