//! Handle, resource and status types

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::NULL_HANDLE;
use crate::impl_label_conversions;

/// Opaque engine resource id as it crosses the boundary.
///
/// Zero means "absent" or "failed"; any other value names a live resource
/// owned by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawHandle(u64);

impl RawHandle {
    /// The absent handle.
    pub const NULL: Self = Self(NULL_HANDLE);

    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub const fn get(self) -> u64 {
        self.0
    }

    pub const fn is_null(self) -> bool {
        self.0 == NULL_HANDLE
    }
}

impl From<u64> for RawHandle {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for RawHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Which kind of engine resource a handle names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Factory,
    Session,
}

impl_label_conversions!(ResourceKind {
    Factory => "factory",
    Session => "session",
});

/// How the coordinator serializes work.
///
/// `Serialized` runs every operation under one exclusive lock.
/// `PerPartition` lets encrypt/decrypt for different partitions run in
/// parallel; setup and shutdown stay exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockingMode {
    #[default]
    Serialized,
    PerPartition,
}

impl_label_conversions!(LockingMode {
    Serialized => "serialized",
    PerPartition => "per_partition",
});

/// Point-in-time view of the coordinator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoordinatorStatus {
    pub configured: bool,
    pub caching_enabled: bool,
    pub cached_sessions: usize,
    pub locking_mode: LockingMode,
}

impl CoordinatorStatus {
    /// Status of a coordinator that has not been set up.
    pub const fn unconfigured(locking_mode: LockingMode) -> Self {
        Self { configured: false, caching_enabled: false, cached_sessions: 0, locking_mode }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn raw_handle_null_is_zero() {
        assert!(RawHandle::NULL.is_null());
        assert!(RawHandle::default().is_null());
        assert!(!RawHandle::new(7).is_null());
        assert_eq!(RawHandle::from(7).get(), 7);
        assert_eq!(RawHandle::new(255).to_string(), "0xff");
    }

    #[test]
    fn resource_kind_labels() {
        assert_eq!(ResourceKind::Factory.to_string(), "factory");
        assert_eq!(ResourceKind::from_str("Session").unwrap(), ResourceKind::Session);
    }

    #[test]
    fn locking_mode_defaults_to_serialized() {
        assert_eq!(LockingMode::default(), LockingMode::Serialized);
        assert_eq!(LockingMode::from_str("per_partition").unwrap(), LockingMode::PerPartition);
        assert_eq!(
            serde_json::to_string(&LockingMode::PerPartition).unwrap(),
            "\"per_partition\""
        );
    }

    #[test]
    fn unconfigured_status_is_empty() {
        let status = CoordinatorStatus::unconfigured(LockingMode::Serialized);
        assert!(!status.configured);
        assert_eq!(status.cached_sessions, 0);
    }
}
