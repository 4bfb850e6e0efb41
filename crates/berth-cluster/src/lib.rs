//! Berth Cluster - The deployment surface of the cluster
//!
//! Everything berth knows about the actual cluster goes through the
//! [`ClusterProvider`] trait: orchestration, lifecycle polling, and the
//! events cache are written against it, never against a concrete grid API.
//! [`InMemoryCluster`] is the provider used by tests and local development.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod error;
pub mod memory;
pub mod provider;

pub use error::{ClusterError, Result};
pub use memory::InMemoryCluster;
pub use provider::{ClusterProvider, ClusterUnit, DeploymentPlan, InstanceHandle};
