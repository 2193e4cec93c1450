//! Domain constants
//!
//! Configuration vocabulary and boundary sentinels.

// Metastore identifiers
pub const METASTORE_MEMORY: &str = "memory";
pub const METASTORE_SQLITE: &str = "sqlite";
pub const METASTORE_RDBMS: &str = "rdbms";
pub const METASTORE_DYNAMODB: &str = "dynamodb";
pub const SUPPORTED_METASTORES: [&str; 4] =
    [METASTORE_MEMORY, METASTORE_SQLITE, METASTORE_RDBMS, METASTORE_DYNAMODB];

// KMS identifiers
pub const KMS_STATIC: &str = "static";
pub const KMS_AWS: &str = "aws";
pub const DEFAULT_KMS: &str = KMS_STATIC;

// Debug aliases accepted for compatibility with older configuration files
pub const ALIAS_DEBUG_MEMORY: &str = "test-debug-memory";
pub const ALIAS_DEBUG_SQLITE: &str = "test-debug-sqlite";
pub const ALIAS_DEBUG_STATIC: &str = "test-debug-static";

/// Raw handle value meaning "no resource"
pub const NULL_HANDLE: u64 = 0;

/// Fallback when the engine reports a failure without a message
pub const UNKNOWN_ERROR: &str = "unknown error";

/// Hex-encoded 32 zero bytes, the master key used when none is configured
pub const DEFAULT_STATIC_MASTER_KEY_HEX: &str =
    "0000000000000000000000000000000000000000000000000000000000000000";

// Environment variables read by engines configured from the environment
pub const ENV_SERVICE_NAME: &str = "SERVICE_NAME";
pub const ENV_PRODUCT_ID: &str = "PRODUCT_ID";
pub const ENV_METASTORE: &str = "Metastore";
pub const ENV_KMS: &str = "KMS";
pub const ENV_STATIC_MASTER_KEY_HEX: &str = "STATIC_MASTER_KEY_HEX";
pub const ENV_PREFERRED_REGION: &str = "PREFERRED_REGION";
pub const ENV_REGION_SUFFIX: &str = "DDB_REGION_SUFFIX";
pub const ENV_VERBOSE: &str = "ASHERAH_VERBOSE";
