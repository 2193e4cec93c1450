//! Integration tests for configuration loader
//!
//! Tests the end-to-end behavior of loading configuration from files.

use std::io::Write;

use sealgate_domain::SealError;
use sealgate_infra::config;
use tempfile::NamedTempFile;

#[test]
fn test_load_config_from_json_file() {
    let json_content = r#"{
        "ServiceName": "payments",
        "ProductID": "ledger",
        "Metastore": "dynamodb",
        "KMS": "aws",
        "RegionMap": { "us-west-2": "arn:aws:kms:us-west-2:1:key/a" },
        "PreferredRegion": "us-west-2",
        "EnableRegionSuffix": true,
        "DynamoDBTableName": "EncryptionKey",
        "SessionCacheMaxSize": 500
    }"#;

    let mut temp_file = NamedTempFile::new().expect("Failed to create temp file");
    temp_file.write_all(json_content.as_bytes()).expect("Failed to write to temp file");

    let path = temp_file.path().with_extension("json");
    std::fs::copy(temp_file.path(), &path).expect("Failed to copy file");

    let result = config::load_from_file(Some(path.clone()));
    std::fs::remove_file(&path).ok();
    let config = result.expect("Failed to load config from JSON file");

    assert_eq!(config.service_name, "payments");
    assert_eq!(config.kms(), "aws");
    assert_eq!(config.session_cache_max_size, Some(500));

    let env = config.env_projection().expect("projection");
    assert_eq!(env["DDB_TABLE"].as_deref(), Some("EncryptionKey"));
    assert_eq!(env["DDB_REGION_SUFFIX"].as_deref(), Some("1"));
    assert_eq!(env["PREFERRED_REGION"].as_deref(), Some("us-west-2"));
}

#[test]
fn test_load_config_from_toml_file() {
    let toml_content = r#"
ServiceName = "payments"
ProductID = "ledger"
Metastore = "rdbms"
ConnectionString = "postgres://user:pw@db/keys"
ExpireAfter = 3600
"#;

    let mut temp_file = NamedTempFile::new().expect("Failed to create temp file");
    temp_file.write_all(toml_content.as_bytes()).expect("Failed to write to temp file");

    let path = temp_file.path().with_extension("toml");
    std::fs::copy(temp_file.path(), &path).expect("Failed to copy file");

    let result = config::load_from_file(Some(path.clone()));
    std::fs::remove_file(&path).ok();
    let config = result.expect("Failed to load config from TOML file");

    assert_eq!(config.expire_after, Some(3600));
    let env = config.env_projection().expect("projection");
    assert_eq!(env["POSTGRES_URL"].as_deref(), Some("postgres://user:pw@db/keys"));
    assert_eq!(env["EXPIRE_AFTER_SECS"].as_deref(), Some("3600"));
}

#[test]
fn test_loaded_document_is_validated() {
    let mut temp_file = NamedTempFile::new().expect("Failed to create temp file");
    temp_file
        .write_all(br#"{"ServiceName":"s","ProductID":"p","Metastore":"mongodb"}"#)
        .expect("Failed to write to temp file");

    let path = temp_file.path().with_extension("json");
    std::fs::copy(temp_file.path(), &path).expect("Failed to copy file");

    let result = config::load_from_file(Some(path.clone()));
    std::fs::remove_file(&path).ok();

    assert_eq!(
        result.unwrap_err(),
        SealError::Config("Unsupported Metastore value: mongodb".to_string())
    );
}
