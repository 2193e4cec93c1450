//! # Sealgate Domain
//!
//! Pure types shared by every Sealgate layer.
//!
//! This crate contains:
//! - The engine configuration document (`EngineConfig`) and its builder
//! - The lifecycle error taxonomy (`SealError`) and Result alias
//! - Handle and resource identifiers (`RawHandle`, `ResourceKind`)
//! - Coordinator status snapshots and locking modes
//!
//! ## Architecture
//! - Depends only on `sealgate-common` (foundation tier) for error
//!   classification
//! - No I/O, no global state

pub mod config;
pub mod constants;
pub mod errors;
pub mod macros;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
