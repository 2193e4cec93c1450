//! Engine configuration document
//!
//! `EngineConfig` is the structured document handed to the engine when a
//! factory is built from explicit configuration. Field names on the wire are
//! fixed (PascalCase, e.g. `ServiceName`, `ProductID`); optional fields that
//! are absent serialize as `null`.
//!
//! The same document can be projected onto environment variables for engines
//! that are configured from the environment, see
//! [`EngineConfig::env_projection`].

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::{
    ALIAS_DEBUG_MEMORY, ALIAS_DEBUG_SQLITE, ALIAS_DEBUG_STATIC, DEFAULT_KMS, KMS_AWS, KMS_STATIC,
    METASTORE_DYNAMODB, METASTORE_MEMORY, METASTORE_RDBMS, METASTORE_SQLITE, SUPPORTED_METASTORES,
};
use crate::errors::{Result, SealError};

/// Environment view of a configuration: `Some` sets a variable, `None`
/// removes it, and variables not present in the map are left alone.
pub type EnvProjection = BTreeMap<&'static str, Option<String>>;

/// Configuration document understood by the engine
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(rename = "ServiceName", default)]
    pub service_name: String,

    #[serde(rename = "ProductID", default)]
    pub product_id: String,

    /// Key expiry in seconds
    #[serde(rename = "ExpireAfter", default)]
    pub expire_after: Option<i64>,

    /// Revocation check interval in seconds
    #[serde(rename = "CheckInterval", default)]
    pub check_interval: Option<i64>,

    #[serde(rename = "Metastore", default)]
    pub metastore: String,

    #[serde(rename = "ConnectionString", default)]
    pub connection_string: Option<String>,

    #[serde(rename = "ReplicaReadConsistency", default)]
    pub replica_read_consistency: Option<String>,

    #[serde(rename = "DynamoDBEndpoint", default)]
    pub dynamodb_endpoint: Option<String>,

    #[serde(rename = "DynamoDBRegion", default)]
    pub dynamodb_region: Option<String>,

    #[serde(rename = "DynamoDBTableName", default)]
    pub dynamodb_table_name: Option<String>,

    #[serde(rename = "SessionCacheMaxSize", default)]
    pub session_cache_max_size: Option<u32>,

    /// Engine-side session cache lifetime in seconds
    #[serde(rename = "SessionCacheDuration", default)]
    pub session_cache_duration: Option<i64>,

    #[serde(rename = "KMS", default = "default_kms")]
    pub kms: Option<String>,

    #[serde(rename = "RegionMap", default)]
    pub region_map: Option<BTreeMap<String, String>>,

    #[serde(rename = "PreferredRegion", default)]
    pub preferred_region: Option<String>,

    #[serde(rename = "EnableRegionSuffix", default)]
    pub enable_region_suffix: Option<bool>,

    #[serde(rename = "EnableSessionCaching", default = "default_true")]
    pub enable_session_caching: Option<bool>,

    #[serde(rename = "Verbose", default = "default_false")]
    pub verbose: Option<bool>,
}

fn default_kms() -> Option<String> {
    Some(DEFAULT_KMS.to_string())
}

fn default_true() -> Option<bool> {
    Some(true)
}

fn default_false() -> Option<bool> {
    Some(false)
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            service_name: String::new(),
            product_id: String::new(),
            expire_after: None,
            check_interval: None,
            metastore: String::new(),
            connection_string: None,
            replica_read_consistency: None,
            dynamodb_endpoint: None,
            dynamodb_region: None,
            dynamodb_table_name: None,
            session_cache_max_size: None,
            session_cache_duration: None,
            kms: default_kms(),
            region_map: None,
            preferred_region: None,
            enable_region_suffix: None,
            enable_session_caching: default_true(),
            verbose: default_false(),
        }
    }
}

// Connection strings may embed credentials.
impl fmt::Debug for EngineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineConfig")
            .field("service_name", &self.service_name)
            .field("product_id", &self.product_id)
            .field("metastore", &self.metastore)
            .field("kms", &self.kms)
            .field("connection_string", &self.connection_string.as_ref().map(|_| "[REDACTED]"))
            .field("region_map", &self.region_map)
            .field("preferred_region", &self.preferred_region)
            .field("enable_session_caching", &self.enable_session_caching)
            .field("verbose", &self.verbose)
            .finish_non_exhaustive()
    }
}

impl EngineConfig {
    /// Minimal document with the three required fields set.
    pub fn new(
        service_name: impl Into<String>,
        product_id: impl Into<String>,
        metastore: impl Into<String>,
    ) -> Self {
        Self {
            service_name: service_name.into(),
            product_id: product_id.into(),
            metastore: metastore.into(),
            ..Self::default()
        }
    }

    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }

    /// KMS identifier, `"static"` when unset.
    pub fn kms(&self) -> &str {
        self.kms.as_deref().unwrap_or(DEFAULT_KMS)
    }

    /// Coordinator caching policy: enabled unless explicitly `false`.
    pub fn session_caching_enabled(&self) -> bool {
        self.enable_session_caching.unwrap_or(true)
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose.unwrap_or(false)
    }

    /// Serialize to the engine's JSON schema.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| SealError::Serialization(format!("invalid config JSON: {e}")))
    }

    /// Check the document and return a normalized copy.
    ///
    /// Debug aliases are mapped to their real names and identifiers are
    /// lower-cased.
    ///
    /// # Errors
    /// `SealError::Config` when a required field is empty, the metastore or
    /// KMS is unsupported, a SQL metastore has no connection string, or the
    /// AWS KMS region settings are inconsistent.
    pub fn validate(&self) -> Result<Self> {
        require_non_empty("ServiceName", &self.service_name)?;
        require_non_empty("ProductID", &self.product_id)?;
        require_non_empty("Metastore", &self.metastore)?;

        let metastore = normalize_alias(&self.metastore);
        if !SUPPORTED_METASTORES.contains(&metastore.as_str()) {
            return Err(SealError::Config(format!("Unsupported Metastore value: {metastore}")));
        }
        if (metastore == METASTORE_SQLITE || metastore == METASTORE_RDBMS)
            && non_empty(self.connection_string.as_deref()).is_none()
        {
            return Err(SealError::Config(format!(
                "ConnectionString is required when Metastore is {metastore}"
            )));
        }

        let kms = normalize_alias(self.kms());
        match kms.as_str() {
            KMS_STATIC => {}
            KMS_AWS => {
                let region_map = self
                    .region_map
                    .as_ref()
                    .filter(|map| !map.is_empty())
                    .ok_or_else(|| {
                        SealError::Config("RegionMap is required when KMS is aws".to_string())
                    })?;
                if let Some(preferred) = non_empty(self.preferred_region.as_deref()) {
                    if !region_map.contains_key(preferred) {
                        return Err(SealError::Config(format!(
                            "PreferredRegion {preferred} is not a key of RegionMap"
                        )));
                    }
                }
            }
            other => return Err(SealError::Config(format!("Unsupported KMS value: {other}"))),
        }

        Ok(Self { metastore, kms: Some(kms), ..self.clone() })
    }

    /// Environment-variable view of this document.
    ///
    /// Validates first. Metastore-specific variables that do not apply to the
    /// selected metastore are mapped to `None` so a stale value from a
    /// previous configuration cannot leak through.
    pub fn env_projection(&self) -> Result<EnvProjection> {
        let cfg = self.validate()?;
        let mut env = EnvProjection::new();

        env.insert("SERVICE_NAME", Some(cfg.service_name.clone()));
        env.insert("PRODUCT_ID", Some(cfg.product_id.clone()));
        env.insert("EXPIRE_AFTER_SECS", cfg.expire_after.map(|v| v.to_string()));
        env.insert("REVOKE_CHECK_INTERVAL_SECS", cfg.check_interval.map(|v| v.to_string()));
        env.insert("SESSION_CACHE_DURATION_SECS", cfg.session_cache_duration.map(|v| v.to_string()));
        env.insert("SESSION_CACHE_MAX_SIZE", cfg.session_cache_max_size.map(|v| v.to_string()));
        env.insert("REPLICA_READ_CONSISTENCY", owned(cfg.replica_read_consistency.as_deref()));
        env.insert("SESSION_CACHE", Some(flag(cfg.session_caching_enabled())));
        env.insert("Metastore", Some(cfg.metastore.clone()));

        for key in ["SQLITE_PATH", "POSTGRES_URL", "MYSQL_URL", "DDB_TABLE"] {
            env.insert(key, None);
        }
        let connection = non_empty(cfg.connection_string.as_deref());
        match (cfg.metastore.as_str(), connection) {
            (METASTORE_SQLITE, Some(conn)) => {
                env.insert("SQLITE_PATH", Some(strip_sqlite_scheme(conn)));
            }
            (METASTORE_RDBMS, Some(conn)) => {
                let (key, value) = route_rdbms(conn);
                env.insert(key, Some(value));
            }
            (METASTORE_DYNAMODB, _) => {
                env.insert("DDB_TABLE", owned(cfg.dynamodb_table_name.as_deref()));
                env.insert("AWS_REGION", owned(cfg.dynamodb_region.as_deref()));
                env.insert("AWS_ENDPOINT_URL", owned(cfg.dynamodb_endpoint.as_deref()));
                env.insert("DDB_REGION_SUFFIX", cfg.enable_region_suffix.map(flag));
            }
            _ => {}
        }

        env.insert("CONNECTION_STRING", owned(cfg.connection_string.as_deref()));
        env.insert(
            "REGION_MAP",
            cfg.region_map.as_ref().map(serde_json::to_string).transpose()?,
        );
        env.insert("KMS", Some(cfg.kms().to_string()));
        env.insert("PREFERRED_REGION", owned(cfg.preferred_region.as_deref()));
        env.insert("ASHERAH_VERBOSE", cfg.is_verbose().then(|| "1".to_string()));

        Ok(env)
    }
}

fn normalize_alias(value: &str) -> String {
    let lower = value.trim().to_lowercase();
    match lower.as_str() {
        ALIAS_DEBUG_MEMORY => METASTORE_MEMORY.to_string(),
        ALIAS_DEBUG_SQLITE => METASTORE_SQLITE.to_string(),
        ALIAS_DEBUG_STATIC => KMS_STATIC.to_string(),
        _ => lower,
    }
}

fn require_non_empty(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(SealError::Config(format!("{field} is required")));
    }
    Ok(())
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

fn owned(value: Option<&str>) -> Option<String> {
    non_empty(value).map(str::to_string)
}

fn flag(value: bool) -> String {
    let bit = if value { "1" } else { "0" };
    bit.to_string()
}

fn strip_sqlite_scheme(conn: &str) -> String {
    conn.strip_prefix("sqlite://").unwrap_or(conn).to_string()
}

fn route_rdbms(conn: &str) -> (&'static str, String) {
    let lower = conn.to_lowercase();
    if lower.starts_with("postgres://") || lower.starts_with("postgresql://") {
        ("POSTGRES_URL", conn.to_string())
    } else if lower.starts_with("mysql://") {
        ("MYSQL_URL", conn.to_string())
    } else {
        ("SQLITE_PATH", strip_sqlite_scheme(conn))
    }
}

/// Fluent builder for [`EngineConfig`]
#[derive(Debug, Default, Clone)]
pub struct EngineConfigBuilder {
    config: EngineConfig,
}

impl EngineConfigBuilder {
    pub fn service_name(mut self, value: impl Into<String>) -> Self {
        self.config.service_name = value.into();
        self
    }

    pub fn product_id(mut self, value: impl Into<String>) -> Self {
        self.config.product_id = value.into();
        self
    }

    pub fn metastore(mut self, value: impl Into<String>) -> Self {
        self.config.metastore = value.into();
        self
    }

    pub fn expire_after(mut self, secs: i64) -> Self {
        self.config.expire_after = Some(secs);
        self
    }

    pub fn check_interval(mut self, secs: i64) -> Self {
        self.config.check_interval = Some(secs);
        self
    }

    pub fn connection_string(mut self, value: impl Into<String>) -> Self {
        self.config.connection_string = Some(value.into());
        self
    }

    pub fn replica_read_consistency(mut self, value: impl Into<String>) -> Self {
        self.config.replica_read_consistency = Some(value.into());
        self
    }

    pub fn dynamodb_endpoint(mut self, value: impl Into<String>) -> Self {
        self.config.dynamodb_endpoint = Some(value.into());
        self
    }

    pub fn dynamodb_region(mut self, value: impl Into<String>) -> Self {
        self.config.dynamodb_region = Some(value.into());
        self
    }

    pub fn dynamodb_table_name(mut self, value: impl Into<String>) -> Self {
        self.config.dynamodb_table_name = Some(value.into());
        self
    }

    pub fn session_cache_max_size(mut self, size: u32) -> Self {
        self.config.session_cache_max_size = Some(size);
        self
    }

    pub fn session_cache_duration(mut self, secs: i64) -> Self {
        self.config.session_cache_duration = Some(secs);
        self
    }

    pub fn kms(mut self, value: impl Into<String>) -> Self {
        self.config.kms = Some(value.into());
        self
    }

    /// Add one region → key ARN entry to `RegionMap`.
    pub fn region(mut self, region: impl Into<String>, key_arn: impl Into<String>) -> Self {
        self.config
            .region_map
            .get_or_insert_with(BTreeMap::new)
            .insert(region.into(), key_arn.into());
        self
    }

    pub fn preferred_region(mut self, value: impl Into<String>) -> Self {
        self.config.preferred_region = Some(value.into());
        self
    }

    pub fn enable_region_suffix(mut self, enabled: bool) -> Self {
        self.config.enable_region_suffix = Some(enabled);
        self
    }

    pub fn enable_session_caching(mut self, enabled: bool) -> Self {
        self.config.enable_session_caching = Some(enabled);
        self
    }

    pub fn verbose(mut self, enabled: bool) -> Self {
        self.config.verbose = Some(enabled);
        self
    }

    /// # Errors
    /// `SealError::Config` when `ServiceName`, `ProductID` or `Metastore` is
    /// missing or empty.
    pub fn build(self) -> Result<EngineConfig> {
        require_non_empty("ServiceName", &self.config.service_name)?;
        require_non_empty("ProductID", &self.config.product_id)?;
        require_non_empty("Metastore", &self.config.metastore)?;
        Ok(self.config)
    }
}
