//! Client-facing error responses
//!
//! This module provides the serialisable view of an [`AppError`] that callers hand
//! back to clients. Sensitive variants never leak their internal message.

use questlab_core::{AppError, ErrorMetadata, LogLevel};
use serde::Serialize;

/// Standard error response format
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
    pub status: u16,
    pub recoverable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_action: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
}

impl ErrorResponse {
    /// Build a response; `include_details` adds the internal message for
    /// non-sensitive errors (development builds).
    pub fn from_error(err: &AppError, include_details: bool) -> Self {
        let details = (include_details && !err.is_sensitive()).then(|| err.detailed_message());
        Self {
            error: err.client_message(),
            code: err.error_code(),
            status: err.http_status_code(),
            recoverable: err.is_recoverable(),
            suggested_action: err.suggested_action(),
            details,
            error_type: include_details.then(|| err.error_type().to_string()),
        }
    }
}

/// Log a failed operation at the level its variant calls for.
pub fn log_error(err: &AppError) {
    let error_type = err.error_type();
    match err.log_level() {
        LogLevel::Debug => {
            tracing::debug!(error = %err, error_type = error_type, "Operation failed");
        }
        LogLevel::Warn => {
            tracing::warn!(error = %err, error_type = error_type, "Operation failed");
        }
        LogLevel::Error => {
            tracing::error!(error = %err, error_type = error_type, "Operation failed");
        }
    }
}
