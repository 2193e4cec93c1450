//! Scripted in-process gateway for tests
//!
//! [`RecordingGateway`] logs every call, can be told to fail specific calls,
//! and produces a transparent record format
//! (`{"Partition": "...", "Data": [..]}`) so tests can check partition
//! binding without any cryptography.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use sealgate_domain::RawHandle;
use serde::{Deserialize, Serialize};

use crate::gateway::EngineGateway;

/// One call observed by [`RecordingGateway`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayCall {
    FactoryFromEnv,
    FactoryFromConfig(String),
    CloseFactory(RawHandle),
    FreeFactory(RawHandle),
    SetEnv(String),
    GetSession(RawHandle, String),
    CloseSession(RawHandle),
    FreeSession(RawHandle),
    Encrypt(RawHandle),
    Decrypt(RawHandle),
}

/// A call to make fail
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FailPoint {
    FactoryCreation,
    GetSession,
    Encrypt,
    Decrypt,
    /// Fail `close_session` for sessions of this partition.
    CloseSession(String),
    CloseFactory,
    SetEnv,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Record {
    partition: String,
    data: Vec<u8>,
}

#[derive(Debug, Default)]
struct Inner {
    calls: Vec<GatewayCall>,
    failures: HashSet<FailPoint>,
    factories: Vec<RawHandle>,
    live_factories: HashSet<RawHandle>,
    sessions: HashMap<RawHandle, String>,
    last_error: Option<String>,
}

#[derive(Debug)]
pub struct RecordingGateway {
    next_id: AtomicU64,
    inner: Mutex<Inner>,
}

impl Default for RecordingGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingGateway {
    pub fn new() -> Self {
        Self { next_id: AtomicU64::new(1), inner: Mutex::new(Inner::default()) }
    }

    pub fn fail(&self, point: FailPoint) {
        self.inner.lock().failures.insert(point);
    }

    pub fn clear_failures(&self) {
        self.inner.lock().failures.clear();
    }

    pub fn calls(&self) -> Vec<GatewayCall> {
        self.inner.lock().calls.clone()
    }

    pub fn count(&self, predicate: impl Fn(&GatewayCall) -> bool) -> usize {
        self.inner.lock().calls.iter().filter(|c| predicate(c)).count()
    }

    /// Every factory handle ever issued, in creation order.
    pub fn factories_created(&self) -> Vec<RawHandle> {
        self.inner.lock().factories.clone()
    }

    /// Factories and sessions issued but not yet freed.
    pub fn live_handles(&self) -> usize {
        let inner = self.inner.lock();
        inner.live_factories.len() + inner.sessions.len()
    }

    fn issue(&self) -> RawHandle {
        RawHandle::new(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    fn create_factory(&self, call: GatewayCall) -> RawHandle {
        let mut inner = self.inner.lock();
        inner.calls.push(call);
        if inner.failures.contains(&FailPoint::FactoryCreation) {
            inner.last_error = Some("injected factory failure".into());
            return RawHandle::NULL;
        }
        let id = self.issue();
        inner.factories.push(id);
        inner.live_factories.insert(id);
        id
    }
}

impl EngineGateway for RecordingGateway {
    fn factory_from_env(&self) -> RawHandle {
        self.create_factory(GatewayCall::FactoryFromEnv)
    }

    fn factory_from_config(&self, config_json: &str) -> RawHandle {
        self.create_factory(GatewayCall::FactoryFromConfig(config_json.to_string()))
    }

    fn close_factory(&self, factory: RawHandle) -> bool {
        let mut inner = self.inner.lock();
        inner.calls.push(GatewayCall::CloseFactory(factory));
        if inner.failures.contains(&FailPoint::CloseFactory) {
            inner.last_error = Some("injected close_factory failure".into());
            return false;
        }
        true
    }

    fn free_factory(&self, factory: RawHandle) {
        let mut inner = self.inner.lock();
        inner.calls.push(GatewayCall::FreeFactory(factory));
        inner.live_factories.remove(&factory);
    }

    fn set_env(&self, env_json: &str) -> bool {
        let mut inner = self.inner.lock();
        inner.calls.push(GatewayCall::SetEnv(env_json.to_string()));
        if inner.failures.contains(&FailPoint::SetEnv) {
            inner.last_error = Some("injected set_env failure".into());
            return false;
        }
        true
    }

    fn get_session(&self, factory: RawHandle, partition_id: &str) -> RawHandle {
        let mut inner = self.inner.lock();
        inner.calls.push(GatewayCall::GetSession(factory, partition_id.to_string()));
        if inner.failures.contains(&FailPoint::GetSession) {
            inner.last_error = Some("injected get_session failure".into());
            return RawHandle::NULL;
        }
        let id = self.issue();
        inner.sessions.insert(id, partition_id.to_string());
        id
    }

    fn close_session(&self, session: RawHandle) -> bool {
        let mut inner = self.inner.lock();
        inner.calls.push(GatewayCall::CloseSession(session));
        let partition = inner.sessions.get(&session).cloned().unwrap_or_default();
        if inner.failures.contains(&FailPoint::CloseSession(partition)) {
            inner.last_error = Some("injected close_session failure".into());
            return false;
        }
        true
    }

    fn free_session(&self, session: RawHandle) {
        let mut inner = self.inner.lock();
        inner.calls.push(GatewayCall::FreeSession(session));
        inner.sessions.remove(&session);
    }

    fn encrypt(&self, session: RawHandle, plaintext: &[u8]) -> Option<Vec<u8>> {
        let mut inner = self.inner.lock();
        inner.calls.push(GatewayCall::Encrypt(session));
        if inner.failures.contains(&FailPoint::Encrypt) {
            inner.last_error = Some("injected encrypt failure".into());
            return None;
        }
        let Some(partition) = inner.sessions.get(&session).cloned() else {
            inner.last_error = Some(format!("unknown session {session}"));
            return None;
        };
        serde_json::to_vec(&Record { partition, data: plaintext.to_vec() }).ok()
    }

    fn decrypt(&self, session: RawHandle, ciphertext: &[u8]) -> Option<Vec<u8>> {
        let mut inner = self.inner.lock();
        inner.calls.push(GatewayCall::Decrypt(session));
        if inner.failures.contains(&FailPoint::Decrypt) {
            inner.last_error = Some("injected decrypt failure".into());
            return None;
        }
        let record: Record = match serde_json::from_slice(ciphertext) {
            Ok(record) => record,
            Err(err) => {
                inner.last_error = Some(format!("malformed record: {err}"));
                return None;
            }
        };
        if inner.sessions.get(&session) != Some(&record.partition) {
            inner.last_error = Some(format!("record belongs to partition {}", record.partition));
            return None;
        }
        Some(record.data)
    }

    fn last_error(&self) -> Option<String> {
        self.inner.lock().last_error.clone()
    }
}
