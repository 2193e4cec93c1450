//! In-process engine: memory metastore, static KMS
//!
//! Every factory and session lives in one handle table. Session keys are
//! derived from the static master key and the session's identity
//! (service, product, partition, optional region suffix), so two engines
//! sharing a master key can read each other's records.
//!
//! Failures follow the gateway contract: a null handle, `false` or `None`,
//! with the reason stored as the calling thread's last error.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use sealgate_common::crypto::{AeadCipher, SealedBox, KEY_LEN};
use sealgate_core::EngineGateway;
use sealgate_domain::constants::{
    DEFAULT_STATIC_MASTER_KEY_HEX, ENV_KMS, ENV_METASTORE, ENV_PREFERRED_REGION,
    ENV_PRODUCT_ID, ENV_REGION_SUFFIX, ENV_SERVICE_NAME, ENV_STATIC_MASTER_KEY_HEX, KMS_STATIC,
    METASTORE_MEMORY,
};
use sealgate_domain::{EngineConfig, RawHandle};
use tracing::{debug, warn};

use super::record::DataRowRecord;

thread_local! {
    static LAST_ERROR: RefCell<Option<String>> = const { RefCell::new(None) };
}

fn set_last_error(message: impl Into<String>) {
    let message = message.into();
    debug!(error = %message, "memory engine call failed");
    LAST_ERROR.with(|slot| *slot.borrow_mut() = Some(message));
}

/// Key material and naming shared by every session of one factory
struct KeyProfile {
    service: String,
    product: String,
    master_key: [u8; KEY_LEN],
    region_suffix: Option<String>,
}

impl KeyProfile {
    fn key_id(&self, partition_id: &str) -> String {
        let suffix = self.region_suffix.as_deref().unwrap_or_default();
        format!("_IK_{partition_id}_{}_{}{suffix}", self.service, self.product)
    }

    fn session_cipher(&self, partition_id: &str) -> Result<AeadCipher, String> {
        let suffix = self.region_suffix.as_deref().unwrap_or_default();
        let key = AeadCipher::derive_key(&[
            &self.master_key,
            b"\0",
            self.service.as_bytes(),
            b"\0",
            self.product.as_bytes(),
            b"\0",
            partition_id.as_bytes(),
            b"\0",
            suffix.as_bytes(),
        ]);
        AeadCipher::new(&key).map_err(|e| e.to_string())
    }
}

struct FactorySlot {
    closed: bool,
    profile: Arc<KeyProfile>,
}

struct SessionSlot {
    closed: bool,
    partition_id: String,
    key_id: String,
    cipher: Arc<AeadCipher>,
}

enum Slot {
    Factory(FactorySlot),
    Session(SessionSlot),
}

#[derive(Default)]
struct Faults {
    factory_creation: AtomicBool,
    factory_close: AtomicBool,
    session_close: Mutex<HashSet<String>>,
}

#[derive(Default)]
struct Counters {
    frees: AtomicU64,
    invalid_frees: AtomicU64,
    sessions_created: AtomicU64,
}

/// In-process [`EngineGateway`]
pub struct MemoryEngine {
    next_id: AtomicU64,
    slots: Mutex<HashMap<u64, Slot>>,
    env_overrides: Mutex<HashMap<String, Option<String>>>,
    faults: Faults,
    counters: Counters,
}

impl Default for MemoryEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            slots: Mutex::new(HashMap::new()),
            env_overrides: Mutex::new(HashMap::new()),
            faults: Faults::default(),
            counters: Counters::default(),
        }
    }

    // ------------------------------------------------------------------
    // Instrumentation
    // ------------------------------------------------------------------

    /// Factories and sessions not yet freed.
    pub fn live_handles(&self) -> usize {
        self.slots.lock().len()
    }

    pub fn live_sessions(&self) -> usize {
        self.slots.lock().values().filter(|s| matches!(s, Slot::Session(_))).count()
    }

    pub fn live_factories(&self) -> usize {
        self.slots.lock().values().filter(|s| matches!(s, Slot::Factory(_))).count()
    }

    pub fn frees(&self) -> u64 {
        self.counters.frees.load(Ordering::Acquire)
    }

    /// Frees of ids that were unknown or of the wrong kind.
    pub fn invalid_frees(&self) -> u64 {
        self.counters.invalid_frees.load(Ordering::Acquire)
    }

    pub fn sessions_created(&self) -> u64 {
        self.counters.sessions_created.load(Ordering::Acquire)
    }

    // ------------------------------------------------------------------
    // Fault injection
    // ------------------------------------------------------------------

    pub fn fail_factory_creation(&self, fail: bool) {
        self.faults.factory_creation.store(fail, Ordering::Release);
    }

    /// Make `close_session` report failure for sessions of `partition_id`.
    /// The session is still marked closed.
    pub fn fail_session_close_for(&self, partition_id: impl Into<String>) {
        self.faults.session_close.lock().insert(partition_id.into());
    }

    pub fn fail_factory_close(&self, fail: bool) {
        self.faults.factory_close.store(fail, Ordering::Release);
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn issue(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Overrides from `set_env` win over the process environment; an
    /// override of `None` hides the process value.
    fn env_var(&self, name: &str) -> Option<String> {
        if let Some(value) = self.env_overrides.lock().get(name) {
            return value.clone();
        }
        std::env::var(name).ok().filter(|v| !v.is_empty())
    }

    fn master_key(&self) -> Result<[u8; KEY_LEN], String> {
        let encoded = self
            .env_var(ENV_STATIC_MASTER_KEY_HEX)
            .unwrap_or_else(|| DEFAULT_STATIC_MASTER_KEY_HEX.to_string());
        let bytes = hex::decode(encoded.trim())
            .map_err(|e| format!("{ENV_STATIC_MASTER_KEY_HEX} is not valid hex: {e}"))?;
        <[u8; KEY_LEN]>::try_from(bytes.as_slice()).map_err(|_| {
            format!("{ENV_STATIC_MASTER_KEY_HEX} must decode to {KEY_LEN} bytes, got {}", bytes.len())
        })
    }

    fn profile_for(&self, config: &EngineConfig) -> Result<KeyProfile, String> {
        let config = config.validate().map_err(|e| e.to_string())?;
        if config.metastore != METASTORE_MEMORY {
            return Err(format!(
                "metastore '{}' is not available in the in-memory engine",
                config.metastore
            ));
        }
        if config.kms() != KMS_STATIC {
            return Err(format!("KMS '{}' is not available in the in-memory engine", config.kms()));
        }

        let region_suffix = if config.enable_region_suffix == Some(true) {
            config.preferred_region.as_ref().map(|region| format!("_{region}"))
        } else {
            None
        };

        Ok(KeyProfile {
            service: config.service_name,
            product: config.product_id,
            master_key: self.master_key()?,
            region_suffix,
        })
    }

    fn create_factory(&self, profile: Result<KeyProfile, String>) -> RawHandle {
        if self.faults.factory_creation.load(Ordering::Acquire) {
            set_last_error("factory creation failed (injected fault)");
            return RawHandle::NULL;
        }
        match profile {
            Ok(profile) => {
                let id = self.issue();
                debug!(handle = id, service = %profile.service, product = %profile.product, "memory engine factory created");
                self.slots
                    .lock()
                    .insert(id, Slot::Factory(FactorySlot { closed: false, profile: Arc::new(profile) }));
                RawHandle::new(id)
            }
            Err(message) => {
                set_last_error(message);
                RawHandle::NULL
            }
        }
    }

    /// Key id and cipher of a live session.
    fn live_session(&self, session: RawHandle) -> Option<(String, Arc<AeadCipher>)> {
        match self.slots.lock().get(&session.get()) {
            Some(Slot::Session(slot)) if !slot.closed => {
                Some((slot.key_id.clone(), Arc::clone(&slot.cipher)))
            }
            Some(Slot::Session(_)) => {
                set_last_error(format!("session {session} is closed"));
                None
            }
            _ => {
                set_last_error(format!("unknown session handle {session}"));
                None
            }
        }
    }

    fn free_slot(&self, id: RawHandle, is_kind: fn(&Slot) -> bool, kind: &str) {
        let mut slots = self.slots.lock();
        if slots.get(&id.get()).is_some_and(is_kind) {
            slots.remove(&id.get());
            self.counters.frees.fetch_add(1, Ordering::AcqRel);
        } else {
            self.counters.invalid_frees.fetch_add(1, Ordering::AcqRel);
            warn!(handle = %id, kind, "free of unknown engine handle ignored");
        }
    }
}

impl EngineGateway for MemoryEngine {
    fn factory_from_env(&self) -> RawHandle {
        let mut config = EngineConfig::new(
            self.env_var(ENV_SERVICE_NAME).unwrap_or_else(|| "service".to_string()),
            self.env_var(ENV_PRODUCT_ID).unwrap_or_else(|| "product".to_string()),
            self.env_var(ENV_METASTORE).unwrap_or_else(|| METASTORE_MEMORY.to_string()),
        );
        config.kms = Some(self.env_var(ENV_KMS).unwrap_or_else(|| KMS_STATIC.to_string()));
        config.preferred_region = self.env_var(ENV_PREFERRED_REGION);
        config.enable_region_suffix = self
            .env_var(ENV_REGION_SUFFIX)
            .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"));

        let profile = self.profile_for(&config);
        self.create_factory(profile)
    }

    fn factory_from_config(&self, config_json: &str) -> RawHandle {
        let profile = EngineConfig::from_json(config_json)
            .map_err(|e| e.to_string())
            .and_then(|config| self.profile_for(&config));
        self.create_factory(profile)
    }

    fn close_factory(&self, factory: RawHandle) -> bool {
        let mut slots = self.slots.lock();
        let Some(Slot::Factory(slot)) = slots.get_mut(&factory.get()) else {
            set_last_error(format!("unknown factory handle {factory}"));
            return false;
        };
        if slot.closed {
            set_last_error(format!("factory {factory} is already closed"));
            return false;
        }
        slot.closed = true;
        if self.faults.factory_close.load(Ordering::Acquire) {
            set_last_error("factory close failed (injected fault)");
            return false;
        }
        true
    }

    fn free_factory(&self, factory: RawHandle) {
        self.free_slot(factory, |slot| matches!(slot, Slot::Factory(_)), "factory");
    }

    fn set_env(&self, env_json: &str) -> bool {
        let env: HashMap<String, Option<String>> = match serde_json::from_str(env_json) {
            Ok(env) => env,
            Err(err) => {
                set_last_error(format!("environment must be a JSON object of strings: {err}"));
                return false;
            }
        };
        debug!(variables = env.len(), "memory engine environment overrides applied");
        self.env_overrides.lock().extend(env);
        true
    }

    fn get_session(&self, factory: RawHandle, partition_id: &str) -> RawHandle {
        let profile = match self.slots.lock().get(&factory.get()) {
            Some(Slot::Factory(slot)) if !slot.closed => Arc::clone(&slot.profile),
            Some(Slot::Factory(_)) => {
                set_last_error(format!("factory {factory} is closed"));
                return RawHandle::NULL;
            }
            _ => {
                set_last_error(format!("unknown factory handle {factory}"));
                return RawHandle::NULL;
            }
        };

        let cipher = match profile.session_cipher(partition_id) {
            Ok(cipher) => cipher,
            Err(message) => {
                set_last_error(message);
                return RawHandle::NULL;
            }
        };
        let id = self.issue();
        self.slots.lock().insert(
            id,
            Slot::Session(SessionSlot {
                closed: false,
                partition_id: partition_id.to_string(),
                key_id: profile.key_id(partition_id),
                cipher: Arc::new(cipher),
            }),
        );
        self.counters.sessions_created.fetch_add(1, Ordering::AcqRel);
        RawHandle::new(id)
    }

    fn close_session(&self, session: RawHandle) -> bool {
        let mut slots = self.slots.lock();
        let Some(Slot::Session(slot)) = slots.get_mut(&session.get()) else {
            set_last_error(format!("unknown session handle {session}"));
            return false;
        };
        if slot.closed {
            set_last_error(format!("session {session} is already closed"));
            return false;
        }
        slot.closed = true;
        if self.faults.session_close.lock().contains(&slot.partition_id) {
            set_last_error(format!(
                "session close failed for partition {} (injected fault)",
                slot.partition_id
            ));
            return false;
        }
        true
    }

    fn free_session(&self, session: RawHandle) {
        self.free_slot(session, |slot| matches!(slot, Slot::Session(_)), "session");
    }

    fn encrypt(&self, session: RawHandle, plaintext: &[u8]) -> Option<Vec<u8>> {
        let (key_id, cipher) = self.live_session(session)?;
        let sealed = match cipher.seal(plaintext, key_id.as_bytes()) {
            Ok(sealed) => sealed,
            Err(err) => {
                set_last_error(err.to_string());
                return None;
            }
        };
        let record =
            DataRowRecord::new(sealed.to_base64(), key_id, chrono::Utc::now().timestamp());
        match serde_json::to_vec(&record) {
            Ok(bytes) => Some(bytes),
            Err(err) => {
                set_last_error(format!("failed to encode data row record: {err}"));
                None
            }
        }
    }

    fn decrypt(&self, session: RawHandle, ciphertext: &[u8]) -> Option<Vec<u8>> {
        let (key_id, cipher) = self.live_session(session)?;
        let record: DataRowRecord = match serde_json::from_slice(ciphertext) {
            Ok(record) => record,
            Err(err) => {
                set_last_error(format!("malformed data row record: {err}"));
                return None;
            }
        };
        if record.key_id() != key_id {
            set_last_error(format!(
                "record key {} does not belong to this session's partition",
                record.key_id()
            ));
            return None;
        }

        let opened = SealedBox::from_base64(&record.data)
            .and_then(|sealed| cipher.open(&sealed, key_id.as_bytes()));
        match opened {
            Ok(plaintext) => Some(plaintext),
            Err(err) => {
                set_last_error(err.to_string());
                None
            }
        }
    }

    fn last_error(&self) -> Option<String> {
        LAST_ERROR.with(|slot| slot.borrow().clone())
    }
}

impl fmt::Debug for MemoryEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryEngine")
            .field("live_handles", &self.live_handles())
            .field("frees", &self.frees())
            .field("invalid_frees", &self.invalid_frees())
            .finish_non_exhaustive()
    }
}
