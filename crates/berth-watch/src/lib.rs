//! Berth Watch - Lifecycle watchers for in-flight deployments
//!
//! A watcher is the asynchronous half of an install. The orchestrator
//! triggers a deployment, registers the resulting unit with the events
//! cache, and spawns a watcher that polls the cluster until the unit
//! reaches its planned instance count, its deadline passes, or the
//! orchestrator cancels it. Every observation lands in the events cache,
//! so clients follow progress by polling events instead of holding a
//! request open.
//!
//! ## Key Concepts
//!
//! - **Fixed-delay ticks**: a slow poll delays only that watcher's next
//!   tick; other watchers keep their own cadence.
//! - **Idempotent observation**: instances are deduplicated by id, so one
//!   instance seen across many ticks produces exactly one event.
//! - **Cooperative cancellation**: cancellation is observed at tick
//!   boundaries, never mid-poll.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod config;
pub mod watcher;

pub use config::WatchConfig;
pub use watcher::{DeploymentWatcher, WatchHandle, WatchState};
