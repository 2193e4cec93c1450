//! Port interface for the encryption engine
//!
//! The engine is reached only through these calls. Resources are named by
//! [`RawHandle`]s; a null handle or `None` signals failure, and the reason is
//! available from [`EngineGateway::last_error`].

use sealgate_domain::RawHandle;

/// Narrow boundary into an opaque, handle-based encryption engine.
///
/// Calls are blocking and may fail; they are never retried by callers.
/// Implementations must tolerate `free_*` being called from any thread,
/// including from a `Drop` running outside any coordinator lock.
pub trait EngineGateway: Send + Sync {
    /// Build a factory from configuration the engine reads itself
    /// (its environment). Returns [`RawHandle::NULL`] on failure.
    fn factory_from_env(&self) -> RawHandle;

    /// Build a factory from a JSON configuration document.
    /// Returns [`RawHandle::NULL`] on failure.
    fn factory_from_config(&self, config_json: &str) -> RawHandle;

    /// Close a factory. Returns `false` if the engine reported a failure.
    fn close_factory(&self, factory: RawHandle) -> bool;

    /// Release the factory's memory. Must be called exactly once per handle.
    fn free_factory(&self, factory: RawHandle);

    /// Apply environment overrides given as a JSON object; `null` values
    /// remove the variable. Returns `false` on failure.
    fn set_env(&self, env_json: &str) -> bool;

    /// Open a session scoped to `partition_id`.
    /// Returns [`RawHandle::NULL`] on failure.
    fn get_session(&self, factory: RawHandle, partition_id: &str) -> RawHandle;

    /// Close a session. Returns `false` if the engine reported a failure.
    fn close_session(&self, session: RawHandle) -> bool;

    /// Release the session's memory. Must be called exactly once per handle.
    fn free_session(&self, session: RawHandle);

    fn encrypt(&self, session: RawHandle, plaintext: &[u8]) -> Option<Vec<u8>>;

    fn decrypt(&self, session: RawHandle, ciphertext: &[u8]) -> Option<Vec<u8>>;

    /// Message describing the most recent failure on the calling thread.
    fn last_error(&self) -> Option<String>;
}
