//! Process-wide access point
//!
//! One [`Coordinator`] over the in-process engine, created on first use.
//! Code that needs isolation (tests, multi-tenant hosts) should build its own
//! coordinator with [`new_context`] instead of sharing this one.

use std::sync::Arc;

use once_cell::sync::Lazy;
use sealgate_core::{Coordinator, EngineGateway};
use sealgate_domain::LockingMode;
use sealgate_infra::MemoryEngine;

static GLOBAL: Lazy<Arc<Coordinator>> = Lazy::new(|| {
    tracing::debug!("creating process-wide coordinator");
    new_context(Arc::new(MemoryEngine::new()), LockingMode::default())
});

/// The process-wide coordinator.
pub fn global() -> &'static Arc<Coordinator> {
    &GLOBAL
}

/// An independent coordinator over `gateway`.
pub fn new_context(gateway: Arc<dyn EngineGateway>, mode: LockingMode) -> Arc<Coordinator> {
    Arc::new(Coordinator::with_mode(gateway, mode))
}
