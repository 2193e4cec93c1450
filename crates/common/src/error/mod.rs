//! Error classification shared by Sealgate crates
//!
//! - **`ErrorClassification`**: retryability, severity and criticality of an
//!   error, implemented by each crate's own error enum.
//! - **`ErrorSeverity`**: the levels log calls pick from.
//! - **`CommonError`**: failures raised by the primitives in this crate.
//!   `sealgate-domain` converts it into its own error type.
//!
//! ## ErrorSeverity Levels
//!
//! | Level | Use Case | Examples |
//! |-------|----------|----------|
//! | **Info** | Informational, expected conditions | Missing optional file |
//! | **Warning** | Misuse the caller can correct | Setup called twice |
//! | **Error** | Failure requiring attention | Invalid config, engine failure |
//! | **Critical** | Program invariant broken | Use after close, internal errors |

use std::fmt;
use std::time::Duration;

pub type CommonResult<T> = Result<T, CommonError>;

/// Failure of a crate-level primitive
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommonError {
    /// An input was rejected, e.g. a key of the wrong length
    Validation { field: String, message: String, value: Option<String> },

    /// Bytes or text could not be decoded
    Serialization { format: String, message: String },

    /// A primitive failed in a way the caller cannot correct
    Internal { message: String },
}

impl fmt::Display for CommonError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation { field, message, value: Some(value) } => {
                write!(f, "invalid {field} ({value}): {message}")
            }
            Self::Validation { field, message, value: None } => {
                write!(f, "invalid {field}: {message}")
            }
            Self::Serialization { format, message } => write!(f, "malformed {format}: {message}"),
            Self::Internal { message } => write!(f, "internal error: {message}"),
        }
    }
}

impl std::error::Error for CommonError {}

impl CommonError {
    pub fn validation<F: Into<String>, M: Into<String>>(field: F, message: M) -> Self {
        Self::Validation { field: field.into(), message: message.into(), value: None }
    }

    /// Validation failure that reports the rejected value
    pub fn validation_with_value<F: Into<String>, M: Into<String>, V: Into<String>>(
        field: F,
        message: M,
        value: V,
    ) -> Self {
        Self::Validation { field: field.into(), message: message.into(), value: Some(value.into()) }
    }

    pub fn serialization_format<F: Into<String>, M: Into<String>>(format: F, message: M) -> Self {
        Self::Serialization { format: format.into(), message: message.into() }
    }

    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal { message: message.into() }
    }
}

/// Error classification trait for consistent error handling across crates
///
/// ```rust,ignore
/// use sealgate_common::error::{ErrorClassification, ErrorSeverity};
///
/// impl ErrorClassification for MyError {
///     fn is_retryable(&self) -> bool {
///         false
///     }
///
///     fn severity(&self) -> ErrorSeverity {
///         match self {
///             Self::Misuse(_) => ErrorSeverity::Warning,
///             Self::Broken(_) => ErrorSeverity::Critical,
///         }
///     }
///
///     fn is_critical(&self) -> bool {
///         self.severity() == ErrorSeverity::Critical
///     }
///
///     fn retry_after(&self) -> Option<Duration> {
///         None
///     }
/// }
/// ```
pub trait ErrorClassification {
    /// Whether repeating the call could succeed.
    ///
    /// Boundary calls into the engine are atomic, so most errors in this
    /// workspace report `false`.
    fn is_retryable(&self) -> bool;

    /// Severity used to pick the log level.
    fn severity(&self) -> ErrorSeverity;

    /// Whether the error means a program invariant was broken.
    fn is_critical(&self) -> bool;

    fn retry_after(&self) -> Option<Duration>;
}

/// Error severity levels for logging and alerting
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Info => "INFO",
            Self::Warning => "WARN",
            Self::Error => "ERROR",
            Self::Critical => "CRITICAL",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Validates the messages of each `CommonError` variant.
    ///
    /// Assertions:
    /// - Confirms the rejected value is shown only when present.
    /// - Confirms the format name prefixes serialization failures.
    #[test]
    fn test_common_error_display() {
        assert_eq!(
            CommonError::validation_with_value("key", "expected 32 bytes", "16 bytes").to_string(),
            "invalid key (16 bytes): expected 32 bytes"
        );
        assert_eq!(CommonError::validation("nonce", "too short").to_string(), "invalid nonce: too short");
        assert_eq!(
            CommonError::serialization_format("base64", "bad padding").to_string(),
            "malformed base64: bad padding"
        );
        assert_eq!(CommonError::internal("aead failure").to_string(), "internal error: aead failure");
    }

    /// Validates `ErrorSeverity` ordering and display.
    ///
    /// Assertions:
    /// - Confirms severities order from Info to Critical.
    /// - Confirms the short display labels.
    #[test]
    fn test_error_severity_order_and_display() {
        assert!(ErrorSeverity::Info < ErrorSeverity::Warning);
        assert!(ErrorSeverity::Warning < ErrorSeverity::Error);
        assert!(ErrorSeverity::Error < ErrorSeverity::Critical);
        assert_eq!(ErrorSeverity::Warning.to_string(), "WARN");
        assert_eq!(ErrorSeverity::Critical.to_string(), "CRITICAL");
    }
}
