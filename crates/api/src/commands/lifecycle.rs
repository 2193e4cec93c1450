//! Setup, shutdown and status of the process-wide coordinator

use std::collections::BTreeMap;
use std::path::PathBuf;

use sealgate_core::{FactoryResource, SessionCacheStats};
use sealgate_domain::{CoordinatorStatus, EngineConfig, Result};
use serde::Serialize;

use crate::context::global;
use crate::utils::logging::log_operation;

/// Configure the process-wide coordinator.
///
/// Installs the tracing subscriber first when `config.verbose` is set.
///
/// # Errors
/// `SealError::AlreadyConfigured` if already set up; `Config` or
/// `Initialization` if the document is invalid or the engine rejects it.
pub fn setup(config: &EngineConfig) -> Result<()> {
    if config.is_verbose() {
        sealgate_infra::init_tracing(true);
    }
    let result = global().setup(config);
    log_operation("setup", None, &result);
    result
}

/// Load a document with [`sealgate_infra::config::load_from_file`] and
/// configure the process-wide coordinator with it. `None` probes the
/// standard locations.
pub fn setup_from_file(path: Option<PathBuf>) -> Result<()> {
    let config = sealgate_infra::config::load_from_file(path)?;
    setup(&config)
}

/// Drain cached sessions, close the factory, return to unconfigured.
pub fn shutdown() -> Result<()> {
    let result = global().shutdown();
    log_operation("shutdown", None, &result);
    result
}

/// Whether the process-wide coordinator is configured.
pub fn status() -> bool {
    global().status()
}

pub fn status_snapshot() -> CoordinatorStatus {
    global().status_snapshot()
}

pub fn cache_stats() -> SessionCacheStats {
    global().cache_stats()
}

/// Send environment overrides to the engine; `None` removes a variable.
pub fn set_env<K: Serialize + Ord>(env: &BTreeMap<K, Option<String>>) -> Result<()> {
    let result = global().set_env(env);
    log_operation("set_env", None, &result);
    result
}

/// A caller-owned factory configured from the engine's environment.
///
/// Independent of the process-wide configuration; the caller closes it.
pub fn factory_from_env() -> Result<FactoryResource> {
    FactoryResource::from_env(global().gateway().clone())
}

/// A caller-owned factory built from `config`.
pub fn factory_from_config(config: &EngineConfig) -> Result<FactoryResource> {
    FactoryResource::from_config(global().gateway().clone(), config)
}

pub async fn setup_async(config: EngineConfig) -> Result<()> {
    if config.is_verbose() {
        sealgate_infra::init_tracing(true);
    }
    let result = global().setup_async(config).await;
    log_operation("setup_async", None, &result);
    result
}

pub async fn shutdown_async() -> Result<()> {
    let result = global().shutdown_async().await;
    log_operation("shutdown_async", None, &result);
    result
}
