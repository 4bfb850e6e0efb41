//! Berth Deploy - The deployment orchestrator
//!
//! Turns a declarative application description into an ordered set of
//! deployment operations against a cluster. An install resolves the
//! dependency order, merges properties, triggers each service through the
//! cluster provider, registers the resulting units with the events cache,
//! and spawns one lifecycle watcher per unit; clients then poll events by
//! deployment id. Batches declaring resource requirements are handed to a
//! bounded background pool instead of running in the accepting call.
//!
//! ## Key Concepts
//!
//! - **Deployment id**: one opaque token per install/uninstall request,
//!   shared by every service of the batch; orchestration, watching, and
//!   event reads all correlate on it.
//! - **Abort without rollback**: a failed trigger aborts the rest of the
//!   batch; services already deployed keep running.
//! - **Synthetic completion events**: undeploys report their outcome as an
//!   event appended to the cache, not as a return value.
//!
//! ## Architectural Boundaries
//!
//! The orchestrator never talks to a concrete grid API; everything goes
//! through [`berth_cluster::ClusterProvider`]. HTTP routing, request DTOs,
//! and authentication live above this crate.
//!
//! ## Usage
//!
//! ```no_run
//! use berth_cluster::InMemoryCluster;
//! use berth_deploy::{DeploymentOrchestrator, OrchestratorConfig};
//! use berth_types::{ApplicationSpec, ServiceSpec};
//! use serde_json::Map;
//! use std::sync::Arc;
//!
//! # async fn example() -> berth_deploy::Result<()> {
//! let cluster = Arc::new(InMemoryCluster::new().with_auto_start(true));
//! let orchestrator = DeploymentOrchestrator::new(cluster, OrchestratorConfig::default());
//!
//! let app = ApplicationSpec::new("petclinic")
//!     .with_service(ServiceSpec::new("db"))
//!     .with_service(ServiceSpec::new("web").with_dependency("db"));
//!
//! let deployment_id = orchestrator.install_application(app, Map::new()).await?;
//! let events = orchestrator.get_events(&deployment_id, 0, None).await;
//! println!("{} events so far", events.len());
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod config;
pub mod error;
pub mod merge;
pub mod orchestrator;

pub use config::OrchestratorConfig;
pub use error::{DeployError, Result};
pub use merge::merge_properties;
pub use orchestrator::DeploymentOrchestrator;
