//! Testing utilities and helpers
//!
//! - **[`temp`]**: temporary directory helper

pub mod temp;

pub use temp::TempDir;
