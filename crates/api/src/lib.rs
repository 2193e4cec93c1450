//! # Sealgate
//!
//! Module-level front end over a handle-based envelope encryption engine.
//!
//! This crate contains:
//! - The process-wide access point ([`context::global`])
//! - Module-level functions (`setup`, `shutdown`, `status`, `encrypt*`,
//!   `decrypt*`, their `*_async` forms, `set_env`, and caller-owned
//!   factories)
//!
//! ## Architecture
//! - Depends on `common`, `domain`, `core`, and `infra`
//! - Wires the in-process engine into one coordinator
//!
//! ## Usage
//!
//! ```rust,no_run
//! use sealgate::EngineConfig;
//!
//! let config = EngineConfig::new("svc", "prod", "memory");
//! sealgate::setup(&config)?;
//! let record = sealgate::encrypt_string("java-module", "module-level")?;
//! assert_eq!(sealgate::decrypt_string("java-module", &record)?, "module-level");
//! sealgate::shutdown()?;
//! # Ok::<(), sealgate::SealError>(())
//! ```

pub mod commands;
pub mod context;
pub mod utils;

// Re-export for convenience
pub use commands::*;
pub use context::{global, new_context};
pub use sealgate_core::{Coordinator, FactoryResource, SessionCacheStats, SessionResource};
pub use sealgate_domain::{CoordinatorStatus, EngineConfig, LockingMode, Result, SealError};
