//! Berth Events - Refresh-coalescing deployment events cache
//!
//! Serves bounded-range reads of deployment progress events. Entries are
//! created lazily per deployment id; each owns its event sequence, the
//! cluster units whose feeds flow into it, and the mutex that makes
//! refreshes and reads of that entry mutually exclusive. A range read pulls
//! fresh feed data only when the range is not already covered AND the
//! per-entry refresh interval has elapsed, so concurrent pollers of one
//! deployment coalesce into a single underlying fetch.
//!
//! Partial results are by design: a read of `[0, 100)` returns however many
//! events exist right now, never an error.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod cache;
pub mod config;
pub mod entry;
pub mod error;

pub use cache::EventsCache;
pub use config::CacheConfig;
pub use entry::EventsEntry;
pub use error::{CacheError, Result};
