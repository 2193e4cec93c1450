//! # Sealgate Core
//!
//! Resource-lifecycle and session-cache logic over an opaque, handle-based
//! encryption engine.
//!
//! This crate contains:
//! - The boundary port ([`EngineGateway`]) every engine implements
//! - Ownership wrappers for engine handles ([`NativeHandle`],
//!   [`FactoryResource`], [`SessionResource`])
//! - The per-partition [`SessionCache`] and its scoped [`SessionLease`]
//! - The [`Coordinator`] state machine (`Unconfigured` → `Configured` →
//!   `Unconfigured`)
//!
//! ## Architecture Principles
//! - Depends only on `sealgate-common` and `sealgate-domain`
//! - No engine code: everything crosses [`EngineGateway`]
//! - No hidden global state; the process-wide access point lives in the
//!   facade crate

pub mod cache;
pub mod coordinator;
pub mod factory;
pub mod gateway;
pub mod handle;
pub mod session;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use cache::{DrainOutcome, SessionCache, SessionCacheStats, SessionLease};
pub use coordinator::Coordinator;
pub use factory::FactoryResource;
pub use gateway::EngineGateway;
pub use handle::NativeHandle;
pub use session::SessionResource;
