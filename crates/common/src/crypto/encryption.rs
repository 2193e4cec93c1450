//! AES-256-GCM primitive with associated data.
//!
//! - [`AeadCipher`]: seal/open with a caller-supplied associated-data tag
//! - [`SealedBox`]: nonce plus ciphertext, with a compact `nonce‖ciphertext`
//!   byte encoding and a base64 text encoding
//!
//! ## Usage
//!
//! ```rust,ignore
//! use sealgate_common::crypto::AeadCipher;
//!
//! let cipher = AeadCipher::new(&AeadCipher::generate_key())?;
//! let sealed = cipher.seal(b"payload", b"key-id")?;
//! assert_eq!(cipher.open(&sealed, b"key-id")?, b"payload");
//! # Ok::<(), sealgate_common::error::CommonError>(())
//! ```

use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::error::{CommonError, CommonResult};

/// Key length for AES-256.
pub const KEY_LEN: usize = 32;
/// Nonce length for AES-GCM.
pub const NONCE_LEN: usize = 12;

/// Output of [`AeadCipher::seal`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedBox {
    pub nonce: [u8; NONCE_LEN],
    pub ciphertext: Vec<u8>,
}

impl SealedBox {
    /// Encode as `nonce ‖ ciphertext`.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(NONCE_LEN + self.ciphertext.len());
        out.extend_from_slice(&self.nonce);
        out.extend_from_slice(&self.ciphertext);
        out
    }

    /// Decode from `nonce ‖ ciphertext`.
    pub fn from_bytes(bytes: &[u8]) -> CommonResult<Self> {
        if bytes.len() <= NONCE_LEN {
            return Err(CommonError::validation(
                "sealed_box",
                format!("expected more than {NONCE_LEN} bytes, got {}", bytes.len()),
            ));
        }
        let (nonce, ciphertext) = bytes.split_at(NONCE_LEN);
        let nonce: [u8; NONCE_LEN] = nonce
            .try_into()
            .map_err(|_| CommonError::internal("nonce slice has wrong length"))?;
        Ok(Self { nonce, ciphertext: ciphertext.to_vec() })
    }

    /// Base64 text form of [`SealedBox::to_bytes`].
    pub fn to_base64(&self) -> String {
        BASE64.encode(self.to_bytes())
    }

    /// Inverse of [`SealedBox::to_base64`].
    pub fn from_base64(encoded: &str) -> CommonResult<Self> {
        let decoded = BASE64
            .decode(encoded)
            .map_err(|e| CommonError::serialization_format("base64", e.to_string()))?;
        Self::from_bytes(&decoded)
    }
}

/// AES-256-GCM cipher bound to one key.
pub struct AeadCipher {
    cipher: Aes256Gcm,
    fingerprint: String,
}

impl std::fmt::Debug for AeadCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AeadCipher")
            .field("key", &"[REDACTED]")
            .field("fingerprint", &self.fingerprint)
            .finish()
    }
}

impl AeadCipher {
    /// Create a cipher from a raw 32-byte key.
    pub fn new(key: &[u8]) -> CommonResult<Self> {
        if key.len() != KEY_LEN {
            return Err(CommonError::validation_with_value(
                "key",
                "encryption key must be exactly 32 bytes",
                key.len().to_string(),
            ));
        }

        let cipher = Aes256Gcm::new_from_slice(key).map_err(|e| {
            CommonError::internal(format!("Failed to create encryption cipher: {e}"))
        })?;

        Ok(Self { cipher, fingerprint: fingerprint(key) })
    }

    /// Generate a random 32-byte symmetric key.
    pub fn generate_key() -> Vec<u8> {
        let mut key = vec![0u8; KEY_LEN];
        OsRng.fill_bytes(&mut key);
        key
    }

    /// Derive a 32-byte key as `SHA-256(part_0 ‖ part_1 ‖ ...)`.
    pub fn derive_key(parts: &[&[u8]]) -> [u8; KEY_LEN] {
        let mut hasher = Sha256::new();
        for part in parts {
            hasher.update(part);
        }
        hasher.finalize().into()
    }

    /// Encrypt `plaintext`, authenticating `aad` alongside it.
    pub fn seal(&self, plaintext: &[u8], aad: &[u8]) -> CommonResult<SealedBox> {
        let mut nonce = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce);

        let ciphertext = self
            .cipher
            .encrypt(Nonce::from_slice(&nonce), Payload { msg: plaintext, aad })
            .map_err(|e| CommonError::internal(format!("Encryption failed: {e}")))?;

        Ok(SealedBox { nonce, ciphertext })
    }

    /// Decrypt a [`SealedBox`]; fails if the ciphertext or `aad` was altered.
    pub fn open(&self, sealed: &SealedBox, aad: &[u8]) -> CommonResult<Vec<u8>> {
        self.cipher
            .decrypt(
                Nonce::from_slice(&sealed.nonce),
                Payload { msg: sealed.ciphertext.as_ref(), aad },
            )
            .map_err(|e| CommonError::internal(format!("Decryption failed: {e}")))
    }

    /// Short fingerprint of the key, safe to log.
    pub fn key_fingerprint(&self) -> &str {
        &self.fingerprint
    }
}

fn fingerprint(key: &[u8]) -> String {
    let digest = Sha256::digest(key);
    BASE64.encode(&digest[..8])
}
