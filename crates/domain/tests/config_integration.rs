//! Integration tests for the engine configuration document
//!
//! Covers the path a caller-supplied document takes before it reaches an
//! engine: parse, validate, serialize, and project onto environment variables.

use sealgate_common::error::{ErrorClassification, ErrorSeverity};
use sealgate_domain::{EngineConfig, SealError};

// ============================================================================
// Document round trip
// ============================================================================

/// A document written by another client parses, validates and re-serializes
/// with the same wire names.
///
/// Scenario: a caller ships a full DynamoDB + AWS KMS document as JSON
#[test]
fn test_full_document_survives_parse_validate_serialize() -> anyhow::Result<()> {
    let json = r#"{
        "ServiceName": "billing",
        "ProductID": "ledger",
        "ExpireAfter": 7776000,
        "CheckInterval": 3600,
        "Metastore": "DynamoDB",
        "DynamoDBTableName": "EncryptionKey",
        "DynamoDBRegion": "us-west-2",
        "SessionCacheMaxSize": 500,
        "SessionCacheDuration": 7200,
        "KMS": "AWS",
        "RegionMap": {"us-west-2": "arn:aws:kms:us-west-2:1:key/a", "us-east-1": "arn:aws:kms:us-east-1:1:key/b"},
        "PreferredRegion": "us-west-2",
        "EnableRegionSuffix": true,
        "EnableSessionCaching": false,
        "Verbose": true
    }"#;

    let cfg = EngineConfig::from_json(json)?.validate()?;
    assert_eq!(cfg.metastore, "dynamodb");
    assert_eq!(cfg.kms(), "aws");
    assert!(!cfg.session_caching_enabled());
    assert!(cfg.is_verbose());

    let reparsed = EngineConfig::from_json(&cfg.to_json()?)?;
    assert_eq!(reparsed, cfg);

    let env = cfg.env_projection()?;
    assert_eq!(env["SESSION_CACHE_MAX_SIZE"].as_deref(), Some("500"));
    assert_eq!(env["EXPIRE_AFTER_SECS"].as_deref(), Some("7776000"));
    assert_eq!(env["PREFERRED_REGION"].as_deref(), Some("us-west-2"));
    let region_map: serde_json::Value =
        serde_json::from_str(env["REGION_MAP"].as_deref().unwrap_or("null"))?;
    assert_eq!(region_map["us-east-1"], "arn:aws:kms:us-east-1:1:key/b");
    Ok(())
}

// ============================================================================
// Error classification
// ============================================================================

/// Configuration mistakes surface as non-retryable `Error`-severity failures.
#[test]
fn test_invalid_document_is_classified_as_config_error() {
    let err = EngineConfig::new("svc", "prod", "mongodb")
        .env_projection()
        .expect_err("unsupported metastore must be rejected");

    assert!(matches!(err, SealError::Config(_)));
    assert_eq!(err.severity(), ErrorSeverity::Error);
    assert!(!err.is_retryable());
    assert_eq!(err.to_string(), "Configuration error: Unsupported Metastore value: mongodb");
}

/// The example document used throughout the docs is valid as written.
#[test]
fn test_minimal_memory_document_is_valid() {
    let cfg = EngineConfig::builder()
        .service_name("svc")
        .product_id("prod")
        .metastore("memory")
        .kms("static")
        .build()
        .and_then(|cfg| cfg.validate());
    assert!(cfg.is_ok());
}
