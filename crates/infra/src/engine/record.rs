//! Data row record emitted by [`super::MemoryEngine`]

use serde::{Deserialize, Serialize};

/// Ciphertext plus the metadata needed to find its key again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DataRowRecord {
    /// Base64 of `nonce ‖ ciphertext`
    pub data: String,
    pub key: EnvelopeKeyRecord,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EnvelopeKeyRecord {
    /// Unix seconds
    pub created: i64,
    pub parent_key_meta: KeyMeta,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct KeyMeta {
    pub key_id: String,
    pub created: i64,
}

impl DataRowRecord {
    pub fn new(data: String, key_id: String, created: i64) -> Self {
        Self {
            data,
            key: EnvelopeKeyRecord { created, parent_key_meta: KeyMeta { key_id, created } },
        }
    }

    pub fn key_id(&self) -> &str {
        &self.key.parent_key_meta.key_id
    }
}
