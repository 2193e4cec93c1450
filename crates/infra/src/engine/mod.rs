//! Engine gateway implementations
//!
//! [`MemoryEngine`] is a complete in-process engine: memory metastore,
//! static KMS, AES-256-GCM data rows. It backs the default access point and
//! the test suites; it is not a replacement for the production engine.

pub mod memory;
pub mod record;

pub use memory::MemoryEngine;
pub use record::{DataRowRecord, EnvelopeKeyRecord, KeyMeta};
