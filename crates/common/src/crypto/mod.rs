//! Shared cryptographic primitives.

pub mod encryption;

pub use encryption::{AeadCipher, SealedBox, KEY_LEN, NONCE_LEN};
