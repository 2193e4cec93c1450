//! Error types used throughout Sealgate

use std::time::Duration;

use sealgate_common::error::{CommonError, ErrorClassification, ErrorSeverity};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::UNKNOWN_ERROR;
use crate::types::ResourceKind;

/// Lifecycle and boundary errors
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "details")]
pub enum SealError {
    /// A boundary call that should produce a resource returned a null handle.
    #[error("Initialization error: {operation}: {message}")]
    Initialization { operation: String, message: String },

    /// An operation was invoked on a factory or session after `close()`.
    #[error("Use after close: {resource} has already been closed")]
    UseAfterClose { resource: ResourceKind },

    #[error("Already configured: call shutdown() before calling setup() again")]
    AlreadyConfigured,

    #[error("Not configured: call setup() first")]
    NotConfigured,

    /// A cryptographic or close call into the engine failed.
    #[error("Engine error: {operation}: {message}")]
    Engine { operation: String, message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for Sealgate operations
pub type Result<T> = std::result::Result<T, SealError>;

impl SealError {
    /// Build an `Initialization` error from the engine's last error message.
    pub fn initialization(operation: impl Into<String>, last_error: Option<String>) -> Self {
        Self::Initialization {
            operation: operation.into(),
            message: last_error.unwrap_or_else(|| UNKNOWN_ERROR.to_string()),
        }
    }

    /// Build an `Engine` error from the engine's last error message.
    pub fn engine(operation: impl Into<String>, last_error: Option<String>) -> Self {
        Self::Engine {
            operation: operation.into(),
            message: last_error.unwrap_or_else(|| UNKNOWN_ERROR.to_string()),
        }
    }

    pub fn use_after_close(resource: ResourceKind) -> Self {
        Self::UseAfterClose { resource }
    }

    /// Stable snake_case label for structured logs.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Initialization { .. } => "initialization",
            Self::UseAfterClose { .. } => "use_after_close",
            Self::AlreadyConfigured => "already_configured",
            Self::NotConfigured => "not_configured",
            Self::Engine { .. } => "engine",
            Self::Config(_) => "config",
            Self::Serialization(_) => "serialization",
            Self::Internal(_) => "internal",
        }
    }
}

impl ErrorClassification for SealError {
    // Boundary calls are atomic; nothing here is worth retrying.
    fn is_retryable(&self) -> bool {
        false
    }

    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::NotConfigured | Self::AlreadyConfigured => ErrorSeverity::Warning,
            Self::Initialization { .. }
            | Self::Engine { .. }
            | Self::Config(_)
            | Self::Serialization(_) => ErrorSeverity::Error,
            Self::UseAfterClose { .. } | Self::Internal(_) => ErrorSeverity::Critical,
        }
    }

    fn is_critical(&self) -> bool {
        self.severity() == ErrorSeverity::Critical
    }

    fn retry_after(&self) -> Option<Duration> {
        None
    }
}

impl From<CommonError> for SealError {
    fn from(err: CommonError) -> Self {
        match err {
            CommonError::Serialization { .. } => Self::Serialization(err.to_string()),
            CommonError::Internal { .. } => Self::Internal(err.to_string()),
            CommonError::Validation { .. } => Self::Config(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for SealError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Validates `SealError::initialization` behavior for the missing last
    /// error scenario.
    ///
    /// Assertions:
    /// - Confirms the message falls back to `"unknown error"`.
    #[test]
    fn test_initialization_falls_back_to_unknown_error() {
        let err = SealError::initialization("factory_from_config", None);
        assert_eq!(err.to_string(), "Initialization error: factory_from_config: unknown error");
    }

    /// Validates `SealError::engine` behavior when the engine supplies a
    /// message.
    ///
    /// Assertions:
    /// - Confirms the message is carried verbatim.
    #[test]
    fn test_engine_carries_last_error() {
        let err = SealError::engine("encrypt", Some("session is closed".into()));
        assert_eq!(
            err,
            SealError::Engine { operation: "encrypt".into(), message: "session is closed".into() }
        );
    }

    /// Validates `ErrorClassification` for every variant.
    ///
    /// Assertions:
    /// - Confirms misuse of the state machine is a warning.
    /// - Confirms use after close is critical.
    /// - Ensures nothing is retryable.
    #[test]
    fn test_classification() {
        assert_eq!(SealError::NotConfigured.severity(), ErrorSeverity::Warning);
        assert_eq!(SealError::AlreadyConfigured.severity(), ErrorSeverity::Warning);
        assert_eq!(SealError::Config("x".into()).severity(), ErrorSeverity::Error);
        assert!(SealError::use_after_close(ResourceKind::Session).is_critical());
        assert!(SealError::Internal("x".into()).is_critical());
        assert!(!SealError::engine("decrypt", None).is_retryable());
        assert!(SealError::NotConfigured.retry_after().is_none());
    }

    /// Validates the serde representation.
    ///
    /// Assertions:
    /// - Confirms the adjacently tagged JSON shape.
    /// - Confirms deserialization restores the value.
    #[test]
    fn test_serde_shape() {
        let err = SealError::use_after_close(ResourceKind::Factory);
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"type": "UseAfterClose", "details": {"resource": "factory"}})
        );
        let back: SealError = serde_json::from_value(json).unwrap();
        assert_eq!(back, err);

        let unit = serde_json::to_value(SealError::NotConfigured).unwrap();
        assert_eq!(unit, serde_json::json!({"type": "NotConfigured"}));
    }

    /// Validates `From<CommonError>` mapping.
    ///
    /// Assertions:
    /// - Confirms validation failures become config errors.
    /// - Confirms serialization failures keep their category.
    #[test]
    fn test_from_common_error() {
        let err: SealError = CommonError::validation("Metastore", "unsupported").into();
        assert_eq!(err.label(), "config");
        let err: SealError = CommonError::serialization_format("TOML", "bad").into();
        assert_eq!(err.label(), "serialization");
    }
}
