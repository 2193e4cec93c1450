//! Configuration state machine over one factory and one session cache
//!
//! A [`Coordinator`] is either `Unconfigured` (no factory) or `Configured`.
//! [`Coordinator::setup`] is the only way in and [`Coordinator::shutdown`]
//! the only way out; setting up twice is rejected without disturbing the
//! active configuration.
//!
//! ## Locking
//! In [`LockingMode::Serialized`] every operation holds the coordinator lock
//! exclusively, so at most one runs at a time. In
//! [`LockingMode::PerPartition`] encrypt/decrypt hold it shared and rely on
//! the session cache's per-entry locking for the one-session-per-partition
//! guarantee; setup and shutdown remain exclusive, so no cryptographic call
//! can observe a factory mid-close.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use sealgate_domain::{
    CoordinatorStatus, EngineConfig, LockingMode, Result, SealError,
};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::cache::{SessionCache, SessionCacheStats};
use crate::factory::FactoryResource;
use crate::gateway::EngineGateway;
use crate::session::{utf8, SessionResource};

#[derive(Default)]
struct State {
    factory: Option<FactoryResource>,
}

/// Owner of the active factory and session cache
pub struct Coordinator {
    gateway: Arc<dyn EngineGateway>,
    state: RwLock<State>,
    cache: SessionCache,
    mode: LockingMode,
}

impl Coordinator {
    /// Create an unconfigured coordinator using [`LockingMode::Serialized`].
    pub fn new(gateway: Arc<dyn EngineGateway>) -> Self {
        Self::with_mode(gateway, LockingMode::Serialized)
    }

    pub fn with_mode(gateway: Arc<dyn EngineGateway>, mode: LockingMode) -> Self {
        Self { gateway, state: RwLock::new(State::default()), cache: SessionCache::new(true), mode }
    }

    pub fn gateway(&self) -> &Arc<dyn EngineGateway> {
        &self.gateway
    }

    pub fn locking_mode(&self) -> LockingMode {
        self.mode
    }

    /// Build a factory from `config` and make it the active configuration.
    ///
    /// The factory is built before the lock is taken. If the coordinator is
    /// already configured, the new factory is closed and
    /// `SealError::AlreadyConfigured` is returned; the existing
    /// configuration is untouched.
    pub fn setup(&self, config: &EngineConfig) -> Result<()> {
        let factory = FactoryResource::from_config(Arc::clone(&self.gateway), config)?;
        self.install(factory, config.session_caching_enabled())
    }

    /// Like [`Coordinator::setup`], but the engine configures the factory
    /// from its own environment.
    pub fn setup_from_env(&self, caching_enabled: bool) -> Result<()> {
        let factory = FactoryResource::from_env(Arc::clone(&self.gateway))?;
        self.install(factory, caching_enabled)
    }

    fn install(&self, factory: FactoryResource, caching_enabled: bool) -> Result<()> {
        let mut state = self.state.write();
        if state.factory.is_some() {
            if let Err(err) = factory.close() {
                warn!(error = %err, "failed to close factory built by rejected setup");
            }
            warn!("setup rejected: already configured");
            return Err(SealError::AlreadyConfigured);
        }

        let stale = self.cache.clear();
        if stale.closed + stale.failed > 0 {
            debug!(closed = stale.closed, failed = stale.failed, "closed stale cached sessions");
        }
        self.cache.set_enabled(caching_enabled);
        self.cache.reset_stats();
        state.factory = Some(factory);

        info!(caching_enabled, locking_mode = %self.mode, "coordinator configured");
        Ok(())
    }

    /// Drain the session cache, close the factory and return to
    /// `Unconfigured`. A no-op when not configured.
    ///
    /// Per-session close failures are logged and skipped so the cache is
    /// always fully drained. A failure closing the factory is returned, but
    /// the coordinator is unconfigured either way.
    pub fn shutdown(&self) -> Result<()> {
        let mut state = self.state.write();
        let Some(factory) = state.factory.take() else {
            debug!("shutdown ignored: not configured");
            return Ok(());
        };

        let drained = self.cache.clear();
        let result = factory.close();
        info!(
            sessions_closed = drained.closed,
            session_close_failures = drained.failed,
            factory_closed = result.is_ok(),
            "coordinator shut down"
        );
        result
    }

    /// Whether the coordinator is configured.
    pub fn status(&self) -> bool {
        self.state.read().factory.is_some()
    }

    pub fn status_snapshot(&self) -> CoordinatorStatus {
        let state = self.state.read();
        if state.factory.is_none() {
            return CoordinatorStatus::unconfigured(self.mode);
        }
        CoordinatorStatus {
            configured: true,
            caching_enabled: self.cache.is_enabled(),
            cached_sessions: self.cache.len(),
            locking_mode: self.mode,
        }
    }

    pub fn cache_stats(&self) -> SessionCacheStats {
        self.cache.stats()
    }

    pub fn cached_sessions(&self) -> usize {
        self.cache.len()
    }

    /// Run `op` against the session for `partition_id`.
    ///
    /// The session comes from the cache policy and is released after `op`
    /// returns, whether it succeeded or not. Closing the session inside `op`
    /// is allowed; the next call for the partition opens a new one.
    ///
    /// # Deadlocks
    /// `op` runs while the coordinator lock is held and the lock is not
    /// reentrant: calling back into this coordinator from `op` deadlocks.
    pub fn with_session<T>(
        &self,
        partition_id: &str,
        op: impl FnOnce(&SessionResource) -> Result<T>,
    ) -> Result<T> {
        match self.mode {
            LockingMode::Serialized => {
                let state = self.state.write();
                self.run_scoped(&state, partition_id, op)
            }
            LockingMode::PerPartition => {
                let state = self.state.read();
                self.run_scoped(&state, partition_id, op)
            }
        }
    }

    fn run_scoped<T>(
        &self,
        state: &State,
        partition_id: &str,
        op: impl FnOnce(&SessionResource) -> Result<T>,
    ) -> Result<T> {
        let factory = state.factory.as_ref().ok_or(SealError::NotConfigured)?;
        let lease = self.cache.acquire(factory, partition_id)?;
        op(&lease)
    }

    pub fn encrypt(&self, partition_id: &str, plaintext: &[u8]) -> Result<Vec<u8>> {
        self.with_session(partition_id, |session| session.encrypt(plaintext))
    }

    pub fn decrypt(&self, partition_id: &str, ciphertext: &[u8]) -> Result<Vec<u8>> {
        self.with_session(partition_id, |session| session.decrypt(ciphertext))
    }

    /// Encrypt text and return the engine's record as text.
    pub fn encrypt_string(&self, partition_id: &str, plaintext: &str) -> Result<String> {
        utf8("encrypt", self.encrypt(partition_id, plaintext.as_bytes())?)
    }

    /// Decrypt a textual record into text. Non-UTF-8 plaintext is an
    /// `SealError::Engine` error; [`Coordinator::decrypt_json`] returns the
    /// raw bytes instead.
    pub fn decrypt_string(&self, partition_id: &str, record: &str) -> Result<String> {
        utf8("decrypt", self.decrypt_json(partition_id, record)?)
    }

    /// Decrypt a textual record into raw bytes.
    pub fn decrypt_json(&self, partition_id: &str, record: &str) -> Result<Vec<u8>> {
        self.decrypt(partition_id, record.as_bytes())
    }

    /// Send environment overrides to the engine. `None` removes a variable.
    pub fn set_env<K: Serialize + Ord>(&self, env: &BTreeMap<K, Option<String>>) -> Result<()> {
        let json = serde_json::to_string(env)?;
        if self.gateway.set_env(&json) {
            debug!(variables = env.len(), "engine environment updated");
            Ok(())
        } else {
            Err(SealError::engine("set_env", self.gateway.last_error()))
        }
    }

    /// [`Coordinator::setup`] on tokio's blocking pool.
    ///
    /// # Panics
    /// The `*_async` methods must be polled inside a tokio runtime; outside
    /// one, spawning the blocking task panics.
    pub async fn setup_async(self: &Arc<Self>, config: EngineConfig) -> Result<()> {
        let this = Arc::clone(self);
        offload(move || this.setup(&config)).await
    }

    pub async fn shutdown_async(self: &Arc<Self>) -> Result<()> {
        let this = Arc::clone(self);
        offload(move || this.shutdown()).await
    }

    pub async fn encrypt_async(
        self: &Arc<Self>,
        partition_id: impl Into<String>,
        plaintext: Vec<u8>,
    ) -> Result<Vec<u8>> {
        let this = Arc::clone(self);
        let partition_id = partition_id.into();
        offload(move || this.encrypt(&partition_id, &plaintext)).await
    }

    pub async fn decrypt_async(
        self: &Arc<Self>,
        partition_id: impl Into<String>,
        ciphertext: Vec<u8>,
    ) -> Result<Vec<u8>> {
        let this = Arc::clone(self);
        let partition_id = partition_id.into();
        offload(move || this.decrypt(&partition_id, &ciphertext)).await
    }

    pub async fn encrypt_string_async(
        self: &Arc<Self>,
        partition_id: impl Into<String>,
        plaintext: impl Into<String>,
    ) -> Result<String> {
        let this = Arc::clone(self);
        let (partition_id, plaintext) = (partition_id.into(), plaintext.into());
        offload(move || this.encrypt_string(&partition_id, &plaintext)).await
    }

    pub async fn decrypt_string_async(
        self: &Arc<Self>,
        partition_id: impl Into<String>,
        record: impl Into<String>,
    ) -> Result<String> {
        let this = Arc::clone(self);
        let (partition_id, record) = (partition_id.into(), record.into());
        offload(move || this.decrypt_string(&partition_id, &record)).await
    }
}

/// Run blocking coordinator work on tokio's blocking pool.
///
/// Panics when polled outside a tokio runtime.
async fn offload<T, F>(work: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work).await.map_err(|e| SealError::Internal(e.to_string()))?
}

impl fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Coordinator")
            .field("status", &self.status_snapshot())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FailPoint, GatewayCall, RecordingGateway};

    fn config() -> EngineConfig {
        EngineConfig::new("svc", "prod", "memory")
    }

    fn configured(gateway: &Arc<RecordingGateway>) -> Coordinator {
        let coordinator = Coordinator::new(gateway.clone());
        coordinator.setup(&config()).unwrap();
        coordinator
    }

    #[test]
    fn encrypt_before_setup_is_not_configured() {
        let coordinator = Coordinator::new(Arc::new(RecordingGateway::new()));
        assert!(!coordinator.status());
        assert_eq!(coordinator.encrypt("p", b"x").unwrap_err(), SealError::NotConfigured);
        assert_eq!(coordinator.decrypt("p", b"x").unwrap_err(), SealError::NotConfigured);
    }

    #[test]
    fn round_trip_through_coordinator() {
        let gateway = Arc::new(RecordingGateway::new());
        let coordinator = configured(&gateway);

        let record = coordinator.encrypt_string("tenant-a", "module-level").unwrap();
        assert_eq!(coordinator.decrypt_string("tenant-a", &record).unwrap(), "module-level");
        assert_eq!(coordinator.cached_sessions(), 1);
    }

    #[test]
    fn second_setup_is_rejected_and_releases_new_factory() {
        let gateway = Arc::new(RecordingGateway::new());
        let coordinator = configured(&gateway);

        assert_eq!(coordinator.setup(&config()).unwrap_err(), SealError::AlreadyConfigured);

        let factories = gateway.factories_created();
        assert_eq!(factories.len(), 2);
        let second = factories[1];
        assert_eq!(gateway.count(|c| *c == GatewayCall::CloseFactory(second)), 1);
        assert_eq!(gateway.count(|c| *c == GatewayCall::FreeFactory(second)), 1);
        assert!(coordinator.encrypt("tenant-a", b"still works").is_ok());
    }

    #[test]
    fn shutdown_without_setup_is_noop() {
        let gateway = Arc::new(RecordingGateway::new());
        let coordinator = Coordinator::new(gateway.clone());
        coordinator.shutdown().unwrap();
        assert!(gateway.calls().is_empty());
    }

    #[test]
    fn shutdown_surfaces_factory_close_failure_but_unconfigures() {
        let gateway = Arc::new(RecordingGateway::new());
        let coordinator = configured(&gateway);
        gateway.fail(FailPoint::CloseFactory);

        assert!(coordinator.shutdown().is_err());
        assert!(!coordinator.status());
        assert_eq!(gateway.count(|c| matches!(c, GatewayCall::FreeFactory(_))), 1);
    }

    #[test]
    fn caching_disabled_leaves_cache_empty() {
        let gateway = Arc::new(RecordingGateway::new());
        let coordinator = Coordinator::new(gateway.clone());
        let cfg = EngineConfig { enable_session_caching: Some(false), ..config() };
        coordinator.setup(&cfg).unwrap();

        coordinator.encrypt("tenant-a", b"x").unwrap();
        coordinator.encrypt("tenant-a", b"y").unwrap();

        let status = coordinator.status_snapshot();
        assert!(status.configured && !status.caching_enabled);
        assert_eq!(status.cached_sessions, 0);
        assert_eq!(gateway.count(|c| matches!(c, GatewayCall::CloseSession(_))), 2);
    }

    #[test]
    fn setup_resets_cache_stats() {
        let gateway = Arc::new(RecordingGateway::new());
        let coordinator = configured(&gateway);
        coordinator.encrypt("tenant-a", b"x").unwrap();
        coordinator.encrypt("tenant-a", b"x").unwrap();
        assert_eq!(coordinator.cache_stats().hits, 1);

        coordinator.shutdown().unwrap();
        coordinator.setup(&config()).unwrap();
        assert_eq!(coordinator.cache_stats(), SessionCacheStats::default());
    }

    #[test]
    fn set_env_serializes_nulls() {
        let gateway = Arc::new(RecordingGateway::new());
        let coordinator = Coordinator::new(gateway.clone());
        let mut env = BTreeMap::new();
        env.insert("SERVICE_NAME", Some("svc".to_string()));
        env.insert("DDB_TABLE", None);

        coordinator.set_env(&env).unwrap();
        assert!(gateway
            .calls()
            .contains(&GatewayCall::SetEnv(r#"{"DDB_TABLE":null,"SERVICE_NAME":"svc"}"#.into())));

        gateway.fail(FailPoint::SetEnv);
        assert!(matches!(coordinator.set_env(&env), Err(SealError::Engine { .. })));
    }

    #[test]
    fn setup_from_env_uses_env_factory() {
        let gateway = Arc::new(RecordingGateway::new());
        let coordinator = Coordinator::new(gateway.clone());
        coordinator.setup_from_env(true).unwrap();
        assert!(gateway.calls().contains(&GatewayCall::FactoryFromEnv));
        assert!(coordinator.status());
    }
}
