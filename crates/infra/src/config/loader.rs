//! Configuration loader
//!
//! Loads the engine configuration document from environment variables or
//! files.
//!
//! ## Loading Strategy
//! 1. First, attempts to load from environment variables
//! 2. If incomplete, falls back to loading from file
//! 3. Probes multiple paths for config files
//! 4. Supports JSON and TOML formats
//!
//! ## Environment Variables
//! - `SEALGATE_SERVICE_NAME`: Service name (required)
//! - `SEALGATE_PRODUCT_ID`: Product id (required)
//! - `SEALGATE_METASTORE`: Metastore kind (required)
//! - `SEALGATE_KMS`: KMS kind (default `static`)
//! - `SEALGATE_CONNECTION_STRING`: Metastore connection string
//! - `SEALGATE_ENABLE_SESSION_CACHING`: Session caching (true/false)
//! - `SEALGATE_VERBOSE`: Verbose engine logging (true/false)
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./sealgate.{json,toml}` or `./config.{json,toml}` (current working
//!    directory)
//! 2. The same names in the parent and grandparent directories
//! 3. The same names next to the executable
//!
//! Documents are validated after loading; a file that parses but names an
//! unsupported metastore is still an error.

use std::path::{Path, PathBuf};

use sealgate_domain::{EngineConfig, Result, SealError};

const FILE_STEMS: [&str; 2] = ["sealgate", "config"];
const FILE_EXTENSIONS: [&str; 2] = ["json", "toml"];

/// Load configuration with automatic fallback strategy
///
/// First attempts to load from environment variables. If any required
/// variables are missing, falls back to loading from a config file.
///
/// # Errors
/// Returns `SealError::Config` if:
/// - Configuration cannot be loaded from either source
/// - File format is invalid
/// - Required fields are missing
pub fn load() -> Result<EngineConfig> {
    match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            Ok(config)
        }
        Err(e) => {
            tracing::debug!(error = %e, "Failed to load from environment, trying file");
            load_from_file(None)
        }
    }
}

/// Load configuration from environment variables
///
/// # Errors
/// Returns `SealError::Config` if required variables are missing or the
/// resulting document does not validate.
pub fn load_from_env() -> Result<EngineConfig> {
    let mut builder = EngineConfig::builder()
        .service_name(env_var("SEALGATE_SERVICE_NAME")?)
        .product_id(env_var("SEALGATE_PRODUCT_ID")?)
        .metastore(env_var("SEALGATE_METASTORE")?)
        .enable_session_caching(env_bool("SEALGATE_ENABLE_SESSION_CACHING", true))
        .verbose(env_bool("SEALGATE_VERBOSE", false));

    if let Some(kms) = optional_env_var("SEALGATE_KMS") {
        builder = builder.kms(kms);
    }
    if let Some(connection) = optional_env_var("SEALGATE_CONNECTION_STRING") {
        builder = builder.connection_string(connection);
    }

    builder.build()?.validate()
}

/// Load configuration from a file
///
/// If `path` is `None`, probes the standard locations with
/// [`probe_config_paths`]. Format is detected by file extension.
///
/// # Errors
/// Returns `SealError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
/// - The document does not validate
pub fn load_from_file(path: Option<PathBuf>) -> Result<EngineConfig> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(SealError::Config(format!("Config file not found: {}", p.display())));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            SealError::Config("No config file found in any of the standard locations".to_string())
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| SealError::Config(format!("Failed to read config file: {e}")))?;

    parse_config(&contents, &config_path)?.validate()
}

/// Parse configuration from string content, choosing the format by the
/// extension of `path`.
fn parse_config(contents: &str, path: &Path) -> Result<EngineConfig> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| SealError::Config(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| SealError::Config(format!("Invalid JSON format: {e}"))),
        _ => Err(SealError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// Probe the standard locations for a configuration file
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut roots = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        roots.extend(cwd.ancestors().take(3).map(Path::to_path_buf));
    }
    if let Some(exe_dir) = std::env::current_exe().ok().and_then(|p| p.parent().map(Path::to_path_buf)) {
        roots.push(exe_dir);
    }

    probe_in(&roots)
}

/// First existing `<root>/<stem>.<ext>` in root, stem, extension order.
fn probe_in(roots: &[PathBuf]) -> Option<PathBuf> {
    roots
        .iter()
        .flat_map(|root| {
            FILE_STEMS.iter().flat_map(move |stem| {
                FILE_EXTENSIONS.iter().map(move |ext| root.join(format!("{stem}.{ext}")))
            })
        })
        .find(|path| path.exists())
}

/// Get required environment variable
///
/// # Errors
/// Returns `SealError::Config` if the variable is not set or is empty.
fn env_var(key: &str) -> Result<String> {
    optional_env_var(key).ok_or_else(|| {
        SealError::Config(format!("Missing required environment variable: {key}"))
    })
}

fn optional_env_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Parse boolean from environment variable
///
/// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive).
/// Unset or unrecognized values yield `default`.
fn env_bool(key: &str, default: bool) -> bool {
    let Ok(value) = std::env::var(key) else {
        return default;
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        other => {
            tracing::warn!(key, value = other, default, "unrecognized boolean; using default");
            default
        }
    }
}
