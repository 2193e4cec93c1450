use sealgate_common::{ErrorClassification, ErrorSeverity};
use sealgate_domain::{Result, SealError};
use tracing::{debug, error, info, warn};

/// Stable label for an error, suitable for structured logs.
#[inline]
pub fn error_label(error: &SealError) -> &'static str {
    error.label()
}

/// Log the outcome of a facade operation with structured fields.
///
/// Successes are logged at debug; failures at the level matching the
/// error's severity. `partition_id` is logged, payloads never are.
pub fn log_operation<T>(operation: &str, partition_id: Option<&str>, result: &Result<T>) {
    let partition_id = partition_id.unwrap_or_default();
    let Err(err) = result else {
        debug!(operation, partition_id, "operation_success");
        return;
    };

    let error_type = error_label(err);
    match err.severity() {
        ErrorSeverity::Info => info!(operation, partition_id, error_type, error = %err, "operation_failure"),
        ErrorSeverity::Warning => warn!(operation, partition_id, error_type, error = %err, "operation_failure"),
        ErrorSeverity::Error | ErrorSeverity::Critical => {
            error!(operation, partition_id, error_type, critical = err.is_critical(), error = %err, "operation_failure");
        }
    }
}
