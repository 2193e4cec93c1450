//! Cache bookkeeping shared by resource caches.
//!
//! The session cache in `sealgate-core` owns its storage; this module only
//! supplies the lock-free counters it reports through [`CacheStats`].

pub mod stats;

pub use stats::{CacheStats, MetricsCollector};
