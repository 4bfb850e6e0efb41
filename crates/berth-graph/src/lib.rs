//! Berth Graph - Service dependency resolution
//!
//! Builds the dependency graph declared by an application's services and
//! produces the install order. Unknown dependency names and cycles are
//! rejected before any deployment is triggered; both are fatal configuration
//! errors, never retried.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod error;
pub mod resolver;

pub use error::{GraphError, Result};
pub use resolver::resolve_install_order;
