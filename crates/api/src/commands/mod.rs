//! Module-level functions over the process-wide coordinator

mod crypto;
mod lifecycle;

pub use crypto::*;
pub use lifecycle::*;
