//! Error types for dependency resolution.

use thiserror::Error;

/// Errors produced while resolving a service dependency graph.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// A service names a dependency that is not part of the application.
    #[error("Service {service} depends on unknown service {dependency}")]
    UnknownDependency {
        service: String,
        dependency: String,
    },

    /// The declared dependencies contain at least one cycle.
    ///
    /// The reported names are the union of every service participating in
    /// any cycle, sorted. Multiple unrelated cycles are merged into one
    /// report; callers must not assume a single minimal loop.
    #[error("Dependency cycle involving services: {}", .involved.join(", "))]
    DependencyCycle { involved: Vec<String> },
}

/// Result type for resolution operations.
pub type Result<T> = std::result::Result<T, GraphError>;
