//! Partition-scoped session resource

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use sealgate_domain::{RawHandle, ResourceKind, Result, SealError};
use tracing::debug;

use crate::gateway::EngineGateway;
use crate::handle::NativeHandle;

/// A live engine session for one partition.
///
/// Encrypt and decrypt are only valid until [`SessionResource::close`];
/// afterwards they fail with `SealError::UseAfterClose`.
pub struct SessionResource {
    handle: NativeHandle,
    closed: AtomicBool,
    partition_id: String,
    gateway: Arc<dyn EngineGateway>,
}

impl SessionResource {
    pub(crate) fn new(
        gateway: Arc<dyn EngineGateway>,
        id: RawHandle,
        partition_id: impl Into<String>,
    ) -> Self {
        Self {
            handle: NativeHandle::new(ResourceKind::Session, id, Arc::clone(&gateway)),
            closed: AtomicBool::new(false),
            partition_id: partition_id.into(),
            gateway,
        }
    }

    pub fn partition_id(&self) -> &str {
        &self.partition_id
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        let id = self.live_handle()?;
        self.gateway
            .encrypt(id, plaintext)
            .ok_or_else(|| SealError::engine("encrypt", self.gateway.last_error()))
    }

    pub fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>> {
        let id = self.live_handle()?;
        self.gateway
            .decrypt(id, ciphertext)
            .ok_or_else(|| SealError::engine("decrypt", self.gateway.last_error()))
    }

    /// Encrypt and return the engine's record as text.
    pub fn encrypt_to_json(&self, plaintext: &[u8]) -> Result<String> {
        utf8("encrypt", self.encrypt(plaintext)?)
    }

    pub fn decrypt_from_json(&self, record: &str) -> Result<Vec<u8>> {
        self.decrypt(record.as_bytes())
    }

    pub fn encrypt_string(&self, plaintext: &str) -> Result<String> {
        self.encrypt_to_json(plaintext.as_bytes())
    }

    /// Decrypt a textual record into text.
    ///
    /// Plaintext that is not valid UTF-8 is an `SealError::Engine` error,
    /// never a lossy conversion; use [`SessionResource::decrypt_from_json`]
    /// for binary payloads.
    pub fn decrypt_string(&self, record: &str) -> Result<String> {
        utf8("decrypt", self.decrypt_from_json(record)?)
    }

    /// Close and free the session. Only the first call does anything.
    pub fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        debug!(partition_id = %self.partition_id, "closing session");
        self.handle.close_and_free()
    }

    fn live_handle(&self) -> Result<RawHandle> {
        let id = self.handle.peek();
        if self.is_closed() || id.is_null() {
            return Err(SealError::use_after_close(ResourceKind::Session));
        }
        Ok(id)
    }
}

pub(crate) fn utf8(operation: &str, bytes: Vec<u8>) -> Result<String> {
    String::from_utf8(bytes)
        .map_err(|e| SealError::engine(operation, Some(format!("output is not valid UTF-8: {e}"))))
}

impl fmt::Debug for SessionResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionResource")
            .field("partition_id", &self.partition_id)
            .field("handle", &self.handle)
            .field("closed", &self.is_closed())
            .finish()
    }
}
