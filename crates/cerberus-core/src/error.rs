//! Error types for Cerberus.
//!
//! [`AdmissionError`] is the standard error type for the admission layer.
//! Each variant maps to an [`ErrorCategory`] with a default HTTP status
//! code, and serializes into a JSON [`ErrorEnvelope`] for rejection bodies.

use http::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using [`AdmissionError`].
pub type AdmissionResult<T> = Result<T, AdmissionError>;

/// Categories of admission errors for classification and handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// The caller exceeded its request quota.
    RateLimited,
    /// A completed record exists for the idempotency key (terminal replay).
    Conflict,
    /// A request with the same idempotency key is still being processed.
    InProgress,
    /// The request exceeded its deadline budget.
    Timeout,
    /// The downstream handler reported a server-side fault.
    Downstream,
    /// Internal admission-layer errors.
    Internal,
}

impl ErrorCategory {
    /// Returns the default HTTP status code for this error category.
    #[must_use]
    pub const fn default_status_code(&self) -> StatusCode {
        match self {
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::Conflict | Self::InProgress => StatusCode::CONFLICT,
            Self::Timeout => StatusCode::GATEWAY_TIMEOUT,
            Self::Downstream => StatusCode::BAD_GATEWAY,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Standard error type for the admission layer.
///
/// # Example
///
/// ```
/// use cerberus_core::{AdmissionError, ErrorCategory};
///
/// let err = AdmissionError::rate_limited("quota exhausted", Some(60));
/// assert_eq!(err.category(), ErrorCategory::RateLimited);
/// ```
#[derive(Error, Debug)]
pub enum AdmissionError {
    /// Rate limit exceeded.
    #[error("Rate limited: {message}")]
    RateLimited {
        /// Human-readable error message.
        message: String,
        /// Seconds until the window resets.
        retry_after_seconds: Option<u64>,
    },

    /// An unexpired completed record exists for the idempotency key.
    #[error("Conflict: {message}")]
    Conflict {
        /// Human-readable error message.
        message: String,
    },

    /// A request with the same idempotency key is in flight.
    #[error("In progress: {message}")]
    InProgress {
        /// Human-readable error message.
        message: String,
    },

    /// The deadline budget was exhausted.
    #[error("Timeout: {message}")]
    Timeout {
        /// Human-readable error message.
        message: String,
    },

    /// The downstream handler faulted (status >= 500 or panicked).
    #[error("Downstream fault: {message}")]
    Downstream {
        /// Human-readable error message.
        message: String,
        /// The status code the handler produced, if any.
        status: Option<u16>,
    },

    /// Internal admission-layer error.
    #[error("Internal error: {message}")]
    Internal {
        /// Human-readable error message.
        message: String,
        /// The underlying error (not exposed to clients).
        #[source]
        source: Option<anyhow::Error>,
    },
}

impl AdmissionError {
    /// Creates a rate-limited error.
    #[must_use]
    pub fn rate_limited(message: impl Into<String>, retry_after_seconds: Option<u64>) -> Self {
        Self::RateLimited {
            message: message.into(),
            retry_after_seconds,
        }
    }

    /// Creates a conflict error.
    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    /// Creates an in-progress error.
    #[must_use]
    pub fn in_progress(message: impl Into<String>) -> Self {
        Self::InProgress {
            message: message.into(),
        }
    }

    /// Creates a timeout error.
    #[must_use]
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::Timeout {
            message: message.into(),
        }
    }

    /// Creates a downstream fault error.
    #[must_use]
    pub fn downstream(message: impl Into<String>, status: Option<u16>) -> Self {
        Self::Downstream {
            message: message.into(),
            status,
        }
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
            source: None,
        }
    }

    /// Creates an internal error with a source error.
    pub fn internal_with_source(
        message: impl Into<String>,
        source: impl Into<anyhow::Error>,
    ) -> Self {
        Self::Internal {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Returns the human-readable message without the variant prefix.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::RateLimited { message, .. }
            | Self::Conflict { message }
            | Self::InProgress { message }
            | Self::Timeout { message }
            | Self::Downstream { message, .. }
            | Self::Internal { message, .. } => message,
        }
    }

    /// Builds the HTTP rejection response for this error.
    ///
    /// The body is the compact `{"error": "<message>"}` shape; callers that
    /// want the richer envelope serialize [`to_envelope`](Self::to_envelope)
    /// themselves.
    #[must_use]
    pub fn to_response(&self) -> crate::types::Response {
        use crate::types::ResponseExt;
        crate::types::Response::rejection(self.status_code(), self.message())
    }

    /// Returns the error category.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::RateLimited { .. } => ErrorCategory::RateLimited,
            Self::Conflict { .. } => ErrorCategory::Conflict,
            Self::InProgress { .. } => ErrorCategory::InProgress,
            Self::Timeout { .. } => ErrorCategory::Timeout,
            Self::Downstream { .. } => ErrorCategory::Downstream,
            Self::Internal { .. } => ErrorCategory::Internal,
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        self.category().default_status_code()
    }

    /// Converts this error to a serializable error envelope.
    #[must_use]
    pub fn to_envelope(&self, request_id: Option<&str>) -> ErrorEnvelope {
        ErrorEnvelope {
            error: ErrorDetail {
                code: self.error_code(),
                message: self.to_string(),
                category: self.category(),
                details: self.error_details(),
            },
            request_id: request_id.map(ToString::to_string),
        }
    }

    /// Returns a machine-readable error code.
    #[must_use]
    fn error_code(&self) -> String {
        match self {
            Self::RateLimited { .. } => "RATE_LIMIT_EXCEEDED",
            Self::Conflict { .. } => "IDEMPOTENCY_CONFLICT",
            Self::InProgress { .. } => "IDEMPOTENCY_IN_PROGRESS",
            Self::Timeout { .. } => "DEADLINE_EXCEEDED",
            Self::Downstream { .. } => "DOWNSTREAM_FAULT",
            Self::Internal { .. } => "INTERNAL_ERROR",
        }
        .to_string()
    }

    /// Returns additional error details for the envelope.
    #[must_use]
    fn error_details(&self) -> Option<serde_json::Value> {
        match self {
            Self::RateLimited {
                retry_after_seconds: Some(seconds),
                ..
            } => Some(serde_json::json!({ "retry_after_seconds": seconds })),
            Self::Downstream {
                status: Some(status),
                ..
            } => Some(serde_json::json!({ "status": status })),
            _ => None,
        }
    }
}

/// Serializable error envelope for HTTP rejection bodies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    /// The error details.
    pub error: ErrorDetail,
    /// The request ID for correlation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

/// Error detail within an envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Machine-readable error code.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Error category.
    pub category: ErrorCategory,
    /// Additional error details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limited() {
        let error = AdmissionError::rate_limited("Too many requests", Some(60));
        assert_eq!(error.category(), ErrorCategory::RateLimited);
        assert_eq!(error.status_code(), StatusCode::TOO_MANY_REQUESTS);

        let envelope = error.to_envelope(None);
        let details = envelope.error.details.unwrap();
        assert_eq!(details["retry_after_seconds"], 60);
    }

    #[test]
    fn test_conflict_and_in_progress_are_409() {
        assert_eq!(
            AdmissionError::conflict("replay").status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AdmissionError::in_progress("busy").status_code(),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn test_timeout() {
        let error = AdmissionError::timeout("Request timeout");
        assert_eq!(error.category(), ErrorCategory::Timeout);
        assert_eq!(error.status_code(), StatusCode::GATEWAY_TIMEOUT);
    }

    #[test]
    fn test_downstream_detail() {
        let error = AdmissionError::downstream("handler failed", Some(503));
        let envelope = error.to_envelope(Some("req-1"));
        assert_eq!(envelope.error.details.unwrap()["status"], 503);
        assert_eq!(envelope.request_id.as_deref(), Some("req-1"));
    }

    #[test]
    fn test_envelope_serialization() {
        let error = AdmissionError::timeout("Request timeout");
        let envelope = error.to_envelope(Some("req-456"));

        let json = serde_json::to_string(&envelope).expect("serialization should work");
        assert!(json.contains("\"code\":\"DEADLINE_EXCEEDED\""));
        assert!(json.contains("\"request_id\":\"req-456\""));
        assert!(json.contains("\"category\":\"timeout\""));
    }

    #[test]
    fn test_to_response_uses_bare_message() {
        let error = AdmissionError::timeout("Request timeout");
        let response = error.to_response();
        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(error.message(), "Request timeout");
    }

    #[test]
    fn test_all_categories_map_to_error_statuses() {
        let categories = [
            ErrorCategory::RateLimited,
            ErrorCategory::Conflict,
            ErrorCategory::InProgress,
            ErrorCategory::Timeout,
            ErrorCategory::Downstream,
            ErrorCategory::Internal,
        ];

        for category in categories {
            let status = category.default_status_code();
            assert!(
                status.is_client_error() || status.is_server_error(),
                "Category {:?} should map to error status code, got {}",
                category,
                status
            );
        }
    }
}
