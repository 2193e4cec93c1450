//! Configured engine factory

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use sealgate_domain::{EngineConfig, RawHandle, ResourceKind, Result, SealError};
use tracing::{debug, info};

use crate::gateway::EngineGateway;
use crate::handle::NativeHandle;
use crate::session::SessionResource;

/// A configured engine instance that produces sessions.
///
/// Closing a factory does not close sessions already handed out; callers own
/// the sessions they obtained directly.
pub struct FactoryResource {
    handle: NativeHandle,
    closed: AtomicBool,
    gateway: Arc<dyn EngineGateway>,
}

impl FactoryResource {
    /// Build a factory from configuration the engine reads from its
    /// environment.
    ///
    /// # Errors
    /// `SealError::Initialization` when the engine returns a null handle.
    pub fn from_env(gateway: Arc<dyn EngineGateway>) -> Result<Self> {
        let id = gateway.factory_from_env();
        Self::wrap(gateway, id, "factory_from_env")
    }

    /// Build a factory from an explicit configuration document.
    ///
    /// The document is validated and normalized before it is sent.
    ///
    /// # Errors
    /// `SealError::Config` for an invalid document,
    /// `SealError::Initialization` when the engine returns a null handle.
    pub fn from_config(gateway: Arc<dyn EngineGateway>, config: &EngineConfig) -> Result<Self> {
        let json = config.validate()?.to_json()?;
        let id = gateway.factory_from_config(&json);
        Self::wrap(gateway, id, "factory_from_config")
    }

    fn wrap(gateway: Arc<dyn EngineGateway>, id: RawHandle, operation: &str) -> Result<Self> {
        if id.is_null() {
            return Err(SealError::initialization(operation, gateway.last_error()));
        }
        info!(handle = %id, operation, "engine factory created");
        Ok(Self {
            handle: NativeHandle::new(ResourceKind::Factory, id, Arc::clone(&gateway)),
            closed: AtomicBool::new(false),
            gateway,
        })
    }

    /// Open a session for `partition_id`.
    ///
    /// # Errors
    /// `SealError::UseAfterClose` once the factory is closed,
    /// `SealError::Initialization` when the engine returns a null handle.
    pub fn get_session(&self, partition_id: &str) -> Result<SessionResource> {
        let factory = self.handle.peek();
        if self.is_closed() || factory.is_null() {
            return Err(SealError::use_after_close(ResourceKind::Factory));
        }

        let id = self.gateway.get_session(factory, partition_id);
        if id.is_null() {
            return Err(SealError::initialization("get_session", self.gateway.last_error()));
        }
        debug!(partition_id, handle = %id, "session created");
        Ok(SessionResource::new(Arc::clone(&self.gateway), id, partition_id))
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Close and free the factory. Only the first call does anything; the
    /// handle is freed even if the engine's close step fails.
    pub fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        let result = self.handle.close_and_free();
        info!(ok = result.is_ok(), "engine factory closed");
        result
    }
}

impl fmt::Debug for FactoryResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FactoryResource")
            .field("handle", &self.handle)
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FailPoint, GatewayCall, RecordingGateway};

    fn config() -> EngineConfig {
        EngineConfig::new("svc", "prod", "memory")
    }

    /// Validates `FactoryResource::from_config` behavior for the null handle
    /// scenario.
    ///
    /// Assertions:
    /// - Confirms `Initialization` carrying the engine message.
    #[test]
    fn test_from_config_null_handle() {
        let gateway = Arc::new(RecordingGateway::new());
        gateway.fail(FailPoint::FactoryCreation);

        let err = FactoryResource::from_config(gateway, &config()).unwrap_err();
        assert!(matches!(
            err,
            SealError::Initialization { ref operation, .. } if operation == "factory_from_config"
        ));
    }

    /// Validates that an invalid document never reaches the engine.
    ///
    /// Assertions:
    /// - Confirms a `Config` error.
    /// - Ensures no factory call was made.
    #[test]
    fn test_from_config_rejects_invalid_document() {
        let gateway = Arc::new(RecordingGateway::new());
        let bad = EngineConfig::new("svc", "prod", "sqlite");

        let err = FactoryResource::from_config(gateway.clone(), &bad).unwrap_err();
        assert!(matches!(err, SealError::Config(_)));
        assert!(gateway.calls().is_empty());
    }

    /// Validates the engine receives the normalized document.
    ///
    /// Assertions:
    /// - Confirms aliases are resolved before sending.
    #[test]
    fn test_from_config_sends_normalized_json() {
        let gateway = Arc::new(RecordingGateway::new());
        let cfg = EngineConfig::new("svc", "prod", "test-debug-memory");

        let _factory = FactoryResource::from_config(gateway.clone(), &cfg).unwrap();
        let sent = gateway
            .calls()
            .into_iter()
            .find_map(|c| match c {
                GatewayCall::FactoryFromConfig(json) => Some(json),
                _ => None,
            })
            .unwrap();
        let doc: serde_json::Value = serde_json::from_str(&sent).unwrap();
        assert_eq!(doc["Metastore"], "memory");
    }

    /// Validates `FactoryResource::from_env` success path.
    ///
    /// Assertions:
    /// - Ensures a session can be opened.
    #[test]
    fn test_from_env() {
        let gateway = Arc::new(RecordingGateway::new());
        let factory = FactoryResource::from_env(gateway).unwrap();
        assert_eq!(factory.get_session("tenant-a").unwrap().partition_id(), "tenant-a");
    }

    /// Validates `get_session` after close.
    ///
    /// Assertions:
    /// - Confirms `UseAfterClose { Factory }`.
    #[test]
    fn test_get_session_after_close() {
        let gateway = Arc::new(RecordingGateway::new());
        let factory = FactoryResource::from_config(gateway, &config()).unwrap();
        factory.close().unwrap();

        assert_eq!(
            factory.get_session("tenant-a").unwrap_err(),
            SealError::use_after_close(ResourceKind::Factory)
        );
    }

    /// Validates `get_session` null handle.
    ///
    /// Assertions:
    /// - Confirms `Initialization` for `get_session`.
    #[test]
    fn test_get_session_null_handle() {
        let gateway = Arc::new(RecordingGateway::new());
        let factory = FactoryResource::from_config(gateway.clone(), &config()).unwrap();
        gateway.fail(FailPoint::GetSession);

        assert!(matches!(
            factory.get_session("tenant-a"),
            Err(SealError::Initialization { .. })
        ));
    }

    /// Validates close-then-free ordering and idempotence, including a
    /// failing close step.
    ///
    /// Assertions:
    /// - Confirms the first close reports the failure.
    /// - Ensures free still happens exactly once.
    /// - Ensures later closes are silent no-ops.
    #[test]
    fn test_close_failure_still_frees_once() {
        let gateway = Arc::new(RecordingGateway::new());
        let factory = FactoryResource::from_config(gateway.clone(), &config()).unwrap();
        gateway.fail(FailPoint::CloseFactory);

        assert!(factory.close().is_err());
        assert!(factory.close().is_ok());
        drop(factory);

        let calls = gateway.calls();
        let close_at = calls.iter().position(|c| matches!(c, GatewayCall::CloseFactory(_)));
        let free_at = calls.iter().position(|c| matches!(c, GatewayCall::FreeFactory(_)));
        assert!(close_at < free_at);
        assert_eq!(gateway.count(|c| matches!(c, GatewayCall::CloseFactory(_))), 1);
        assert_eq!(gateway.count(|c| matches!(c, GatewayCall::FreeFactory(_))), 1);
    }

    /// Validates that closing a factory leaves directly-owned sessions alone.
    ///
    /// Assertions:
    /// - Ensures the session still works after the factory is closed.
    #[test]
    fn test_close_does_not_invalidate_sessions() {
        let gateway = Arc::new(RecordingGateway::new());
        let factory = FactoryResource::from_config(gateway, &config()).unwrap();
        let session = factory.get_session("tenant-a").unwrap();
        factory.close().unwrap();

        assert!(!session.is_closed());
        let record = session.encrypt(b"still here").unwrap();
        assert_eq!(session.decrypt(&record).unwrap(), b"still here");
        session.close().unwrap();
    }
}
