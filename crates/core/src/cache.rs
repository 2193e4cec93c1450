//! Per-partition session cache
//!
//! With caching enabled the cache holds at most one live session per
//! partition id and hands the same session to every caller until
//! [`SessionCache::clear`]. With caching disabled nothing is stored: every
//! acquisition opens a fresh session that is closed when its lease drops.
//!
//! Session creation for a partition happens while holding that partition's
//! map entry, so two threads missing on the same partition can never both
//! create a session.

use std::ops::Deref;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use sealgate_common::cache::{CacheStats, MetricsCollector};
use sealgate_domain::Result;
use tracing::{debug, warn};

use crate::factory::FactoryResource;
use crate::session::SessionResource;

/// Snapshot of cache counters
pub type SessionCacheStats = CacheStats;

/// Result of draining the cache
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainOutcome {
    pub closed: usize,
    pub failed: usize,
}

/// Partition id → shared session
#[derive(Debug)]
pub struct SessionCache {
    sessions: DashMap<String, Arc<SessionResource>>,
    enabled: AtomicBool,
    metrics: MetricsCollector,
}

impl Default for SessionCache {
    fn default() -> Self {
        Self::new(true)
    }
}

impl SessionCache {
    pub fn new(enabled: bool) -> Self {
        Self {
            sessions: DashMap::new(),
            enabled: AtomicBool::new(enabled),
            metrics: MetricsCollector::new(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    pub(crate) fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Release);
    }

    /// Get a session for `partition_id`, creating it through `factory` on a
    /// miss. The returned lease releases the session per policy when dropped.
    pub fn acquire(&self, factory: &FactoryResource, partition_id: &str) -> Result<SessionLease<'_>> {
        if !self.is_enabled() {
            self.metrics.record_miss();
            let session = Arc::new(factory.get_session(partition_id)?);
            return Ok(SessionLease { cache: self, session });
        }

        let cached = self
            .sessions
            .get(partition_id)
            .map(|entry| Arc::clone(entry.value()))
            .filter(|session| !session.is_closed());
        if let Some(session) = cached {
            self.metrics.record_hit();
            debug!(partition_id, "session cache hit");
            return Ok(SessionLease { cache: self, session });
        }

        // A cached session closed from outside the cache counts as a miss
        // and is replaced in place.
        let session = match self.sessions.entry(partition_id.to_string()) {
            Entry::Occupied(entry) if !entry.get().is_closed() => {
                self.metrics.record_hit();
                Arc::clone(entry.get())
            }
            Entry::Occupied(mut entry) => {
                self.metrics.record_miss();
                let session = Arc::new(factory.get_session(partition_id)?);
                entry.insert(Arc::clone(&session));
                self.metrics.record_insert();
                debug!(partition_id, "closed cached session replaced");
                session
            }
            Entry::Vacant(entry) => {
                self.metrics.record_miss();
                let session = Arc::new(factory.get_session(partition_id)?);
                entry.insert(Arc::clone(&session));
                self.metrics.record_insert();
                debug!(partition_id, "session cache miss; session stored");
                session
            }
        };
        Ok(SessionLease { cache: self, session })
    }

    /// Give a session back.
    ///
    /// A session held by the cache stays open. Any other session (caching
    /// disabled, or not the instance the cache holds) is closed here; a
    /// close failure is logged, not returned.
    pub fn release(&self, partition_id: &str, session: &Arc<SessionResource>) {
        if self.is_enabled() {
            let retained = self
                .sessions
                .get(partition_id)
                .is_some_and(|entry| Arc::ptr_eq(entry.value(), session));
            if retained {
                return;
            }
        }

        match session.close() {
            Ok(()) => self.metrics.record_close(),
            Err(err) => {
                self.metrics.record_close_failure();
                warn!(partition_id, error = %err, "failed to close released session");
            }
        }
    }

    /// Close every cached session and empty the cache.
    ///
    /// A failure to close one session does not stop the others from being
    /// closed.
    pub fn clear(&self) -> DrainOutcome {
        let partitions: Vec<String> = self.sessions.iter().map(|entry| entry.key().clone()).collect();
        let mut outcome = DrainOutcome::default();

        for partition in partitions {
            let Some((partition_id, session)) = self.sessions.remove(&partition) else {
                continue;
            };
            match session.close() {
                Ok(()) => {
                    outcome.closed += 1;
                    self.metrics.record_close();
                }
                Err(err) => {
                    outcome.failed += 1;
                    self.metrics.record_close_failure();
                    warn!(partition_id = %partition_id, error = %err, "failed to close cached session; continuing");
                }
            }
        }
        outcome
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn contains(&self, partition_id: &str) -> bool {
        self.sessions.contains_key(partition_id)
    }

    pub fn stats(&self) -> SessionCacheStats {
        self.metrics.snapshot(self.len())
    }

    pub(crate) fn reset_stats(&self) {
        self.metrics.reset();
    }
}

/// Scoped use of a session: dereferences to [`SessionResource`] and
/// releases it back to the cache on drop, on every exit path.
#[derive(Debug)]
pub struct SessionLease<'a> {
    cache: &'a SessionCache,
    session: Arc<SessionResource>,
}

impl SessionLease<'_> {
    /// The shared session behind this lease.
    pub fn session(&self) -> &Arc<SessionResource> {
        &self.session
    }
}

impl Deref for SessionLease<'_> {
    type Target = SessionResource;

    fn deref(&self) -> &Self::Target {
        &self.session
    }
}

impl Drop for SessionLease<'_> {
    fn drop(&mut self) {
        self.cache.release(self.session.partition_id(), &self.session);
    }
}
