//! Exactly-once ownership of one engine handle

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use sealgate_domain::{RawHandle, ResourceKind, Result, SealError};
use tracing::{debug, warn};

use crate::gateway::EngineGateway;

/// Owner of one engine resource id.
///
/// The id is nonzero while live and permanently zero once taken. `take()`
/// is an atomic swap, so an explicit close racing a drop on another thread
/// still releases the resource once.
///
/// Dropping a handle that was never taken frees it (free only, never
/// close) and logs the leak.
pub struct NativeHandle {
    id: AtomicU64,
    kind: ResourceKind,
    gateway: Arc<dyn EngineGateway>,
}

impl NativeHandle {
    pub(crate) fn new(kind: ResourceKind, id: RawHandle, gateway: Arc<dyn EngineGateway>) -> Self {
        Self { id: AtomicU64::new(id.get()), kind, gateway }
    }

    /// Atomically read and clear the id. Every call after the first returns
    /// [`RawHandle::NULL`].
    pub fn take(&self) -> RawHandle {
        RawHandle::new(self.id.swap(0, Ordering::AcqRel))
    }

    /// Current id without taking ownership.
    pub fn peek(&self) -> RawHandle {
        RawHandle::new(self.id.load(Ordering::Acquire))
    }

    pub fn is_released(&self) -> bool {
        self.peek().is_null()
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// Close then free the resource, if this call is the one that takes it.
    ///
    /// Free runs even when close fails; the close failure is returned after.
    pub(crate) fn close_and_free(&self) -> Result<()> {
        let id = self.take();
        if id.is_null() {
            return Ok(());
        }

        let (closed, operation) = match self.kind {
            ResourceKind::Factory => (self.gateway.close_factory(id), "close_factory"),
            ResourceKind::Session => (self.gateway.close_session(id), "close_session"),
        };
        let outcome =
            if closed { Ok(()) } else { Err(SealError::engine(operation, self.gateway.last_error())) };

        self.free(id);
        outcome
    }

    fn free(&self, id: RawHandle) {
        match self.kind {
            ResourceKind::Factory => self.gateway.free_factory(id),
            ResourceKind::Session => self.gateway.free_session(id),
        }
    }
}

impl Drop for NativeHandle {
    fn drop(&mut self) {
        let id = self.take();
        if id.is_null() {
            return;
        }
        if cfg!(debug_assertions) {
            warn!(resource = %self.kind, handle = %id, "engine handle dropped without close; freeing");
        } else {
            debug!(resource = %self.kind, handle = %id, "engine handle dropped without close; freeing");
        }
        self.free(id);
    }
}

impl fmt::Debug for NativeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeHandle")
            .field("kind", &self.kind)
            .field("id", &self.peek())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;
    use crate::testing::{FailPoint, GatewayCall, RecordingGateway};

    fn session_handle(gateway: &Arc<RecordingGateway>) -> NativeHandle {
        let factory = gateway.factory_from_config("{}");
        let id = gateway.get_session(factory, "tenant-a");
        NativeHandle::new(ResourceKind::Session, id, gateway.clone())
    }

    #[test]
    fn take_returns_id_once() {
        let gateway = Arc::new(RecordingGateway::new());
        let handle = session_handle(&gateway);
        let id = handle.peek();

        assert!(!id.is_null());
        assert_eq!(handle.take(), id);
        assert!(handle.take().is_null());
        assert!(handle.is_released());
        drop(handle);
        assert_eq!(gateway.count(|c| matches!(c, GatewayCall::FreeSession(_))), 0);
    }

    #[test]
    fn close_and_free_runs_once() {
        let gateway = Arc::new(RecordingGateway::new());
        let handle = session_handle(&gateway);
        let id = handle.peek();

        handle.close_and_free().unwrap();
        handle.close_and_free().unwrap();
        drop(handle);

        assert_eq!(gateway.count(|c| *c == GatewayCall::CloseSession(id)), 1);
        assert_eq!(gateway.count(|c| *c == GatewayCall::FreeSession(id)), 1);
    }

    #[test]
    fn free_runs_even_when_close_fails() {
        let gateway = Arc::new(RecordingGateway::new());
        gateway.fail(FailPoint::CloseSession("tenant-a".into()));
        let handle = session_handle(&gateway);
        let id = handle.peek();

        let err = handle.close_and_free().unwrap_err();
        assert_eq!(err.label(), "engine");
        assert_eq!(gateway.count(|c| *c == GatewayCall::FreeSession(id)), 1);
        assert!(handle.is_released());
    }

    #[test]
    fn drop_frees_without_closing() {
        let gateway = Arc::new(RecordingGateway::new());
        let handle = session_handle(&gateway);
        let id = handle.peek();

        drop(handle);

        assert_eq!(gateway.count(|c| *c == GatewayCall::CloseSession(id)), 0);
        assert_eq!(gateway.count(|c| *c == GatewayCall::FreeSession(id)), 1);
    }

    #[test]
    fn racing_takes_yield_one_winner() {
        let gateway = Arc::new(RecordingGateway::new());
        let handle = Arc::new(session_handle(&gateway));

        let winners: usize = (0..8)
            .map(|_| {
                let handle = Arc::clone(&handle);
                thread::spawn(move || usize::from(!handle.take().is_null()))
            })
            .collect::<Vec<_>>()
            .into_iter()
            .map(|t| t.join().unwrap())
            .sum();

        assert_eq!(winners, 1);
    }
}
