//! # Sealgate Infrastructure
//!
//! Implementations of the ports defined in `sealgate-core`.
//!
//! This crate contains:
//! - [`MemoryEngine`], an in-process [`sealgate_core::EngineGateway`]
//! - The configuration loader (environment, JSON and TOML files)
//! - Tracing subscriber setup
//!
//! ## Architecture
//! - Implements traits defined in `sealgate-core`
//! - Contains the "impure" code (file and environment access, global
//!   subscriber installation)

pub mod config;
pub mod engine;
pub mod observability;

// Re-export commonly used items
pub use engine::MemoryEngine;
pub use observability::init_tracing;
