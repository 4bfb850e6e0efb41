//! Berth Types - Core types for deployment orchestration
//!
//! Berth turns a declarative application description into an ordered,
//! asynchronously tracked set of deployment operations against a cluster.
//! This crate holds the vocabulary shared by every other berth crate.
//!
//! ## Key Concepts
//!
//! - **ApplicationSpec / ServiceSpec**: what to deploy, with the dependencies
//!   declared between services
//! - **DeploymentId**: correlation token for one install/uninstall request
//! - **LifecycleEvent**: timestamped progress record clients poll for

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod application;
pub mod events;
pub mod ids;

// Re-export main types
pub use application::{ApplicationSpec, ResourceRequirements, ServiceSpec};
pub use events::LifecycleEvent;
pub use ids::{DeploymentId, InstanceId};
