//! Shared error taxonomy across the gateway, documents, driver and REPL.
//!
//! Domain errors stay typed in their own modules; this module folds them into
//! an [`ErrorEnvelope`] so the REPL prints every failure the same way.

use crate::documents::UploadError;
use crate::driver::{RunFailedError, RunTimeoutError, UnsupportedActionError};
use crate::gateway::GatewayError;

/// Broad category for typed error handling and policy decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    Network,
    Authentication,
    Authorization,
    RateLimit,
    Timeout,
    InvalidInput,
    Parse,
    Run,
    State,
    Internal,
}

/// Severity hint for UI and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

/// Unified envelope used when crossing subsystem boundaries.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ErrorEnvelope {
    pub category: ErrorCategory,
    pub severity: ErrorSeverity,
    pub recoverable: bool,
    pub code: String,
    pub message: String,
}

impl ErrorEnvelope {
    #[must_use]
    pub fn new(
        category: ErrorCategory,
        severity: ErrorSeverity,
        recoverable: bool,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            category,
            severity,
            recoverable,
            code: code.into(),
            message: message.into(),
        }
    }

    /// One-line form printed next to replies, e.g. `[gateway_rate_limited] ...`.
    #[must_use]
    pub fn summary(&self) -> String {
        format!("[{}] {}", self.code, self.message)
    }
}

impl From<&GatewayError> for ErrorEnvelope {
    fn from(value: &GatewayError) -> Self {
        let message = value.to_string();
        match value {
            GatewayError::Http(_) if value.is_timeout() => Self::new(
                ErrorCategory::Timeout,
                ErrorSeverity::Warning,
                true,
                "gateway_timeout",
                message,
            ),
            GatewayError::Http(_) => Self::new(
                ErrorCategory::Network,
                ErrorSeverity::Error,
                true,
                "gateway_network_error",
                message,
            ),
            GatewayError::Api { status, .. } => match *status {
                401 => Self::new(
                    ErrorCategory::Authentication,
                    ErrorSeverity::Critical,
                    false,
                    "gateway_auth_error",
                    message,
                ),
                403 => Self::new(
                    ErrorCategory::Authorization,
                    ErrorSeverity::Error,
                    false,
                    "gateway_forbidden",
                    message,
                ),
                404 => Self::new(
                    ErrorCategory::InvalidInput,
                    ErrorSeverity::Error,
                    false,
                    "gateway_not_found",
                    message,
                ),
                408 => Self::new(
                    ErrorCategory::Timeout,
                    ErrorSeverity::Warning,
                    true,
                    "gateway_timeout",
                    message,
                ),
                429 => Self::new(
                    ErrorCategory::RateLimit,
                    ErrorSeverity::Warning,
                    true,
                    "gateway_rate_limited",
                    message,
                ),
                500..=599 => Self::new(
                    ErrorCategory::Internal,
                    ErrorSeverity::Error,
                    true,
                    format!("gateway_server_{status}"),
                    message,
                ),
                _ => Self::new(
                    ErrorCategory::InvalidInput,
                    ErrorSeverity::Error,
                    false,
                    "gateway_invalid_request",
                    message,
                ),
            },
            GatewayError::Decode(_) => Self::new(
                ErrorCategory::Parse,
                ErrorSeverity::Error,
                false,
                "gateway_parse_error",
                message,
            ),
            GatewayError::Io(_) => Self::new(
                ErrorCategory::Internal,
                ErrorSeverity::Error,
                true,
                "gateway_io_error",
                message,
            ),
        }
    }
}

impl From<&UploadError> for ErrorEnvelope {
    fn from(value: &UploadError) -> Self {
        match value {
            UploadError::Read { .. } => Self::new(
                ErrorCategory::InvalidInput,
                ErrorSeverity::Error,
                false,
                "upload_read_failed",
                value.to_string(),
            ),
            UploadError::Stage { .. } => Self::new(
                ErrorCategory::Internal,
                ErrorSeverity::Error,
                true,
                "upload_stage_failed",
                value.to_string(),
            ),
            UploadError::Gateway { source, .. } => {
                let mut envelope = Self::from(source);
                envelope.message = value.to_string();
                envelope
            }
            UploadError::NotConfirmed { .. } => Self::new(
                ErrorCategory::State,
                ErrorSeverity::Warning,
                true,
                "delete_not_confirmed",
                value.to_string(),
            ),
            UploadError::NotFound(_) => Self::new(
                ErrorCategory::InvalidInput,
                ErrorSeverity::Warning,
                false,
                "document_not_found",
                value.to_string(),
            ),
        }
    }
}

impl From<&RunTimeoutError> for ErrorEnvelope {
    fn from(value: &RunTimeoutError) -> Self {
        Self::new(
            ErrorCategory::Timeout,
            ErrorSeverity::Warning,
            true,
            "run_timeout",
            value.to_string(),
        )
    }
}

impl From<&RunFailedError> for ErrorEnvelope {
    fn from(value: &RunFailedError) -> Self {
        Self::new(
            ErrorCategory::Run,
            ErrorSeverity::Error,
            true,
            format!("run_{}", value.status),
            value.to_string(),
        )
    }
}

impl From<&UnsupportedActionError> for ErrorEnvelope {
    fn from(value: &UnsupportedActionError) -> Self {
        Self::new(
            ErrorCategory::State,
            ErrorSeverity::Warning,
            true,
            "run_requires_action",
            value.to_string(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RunError, RunStatus};

    fn api(status: u16) -> GatewayError {
        GatewayError::Api {
            status,
            message: "nope".to_string(),
        }
    }

    #[test]
    fn api_statuses_map_to_categories() {
        let auth = ErrorEnvelope::from(&api(401));
        assert_eq!(auth.category, ErrorCategory::Authentication);
        assert_eq!(auth.severity, ErrorSeverity::Critical);
        assert!(!auth.recoverable);

        let limited = ErrorEnvelope::from(&api(429));
        assert_eq!(limited.category, ErrorCategory::RateLimit);
        assert!(limited.recoverable);

        let server = ErrorEnvelope::from(&api(503));
        assert_eq!(server.code, "gateway_server_503");
        assert_eq!(server.summary(), "[gateway_server_503] HTTP 503: nope");
    }

    #[test]
    fn upload_gateway_error_keeps_gateway_category() {
        let err = UploadError::Gateway {
            target: "Ley.pdf".to_string(),
            source: api(429),
        };
        let envelope = ErrorEnvelope::from(&err);
        assert_eq!(envelope.category, ErrorCategory::RateLimit);
        assert!(envelope.message.contains("Ley.pdf"));
    }

    #[test]
    fn run_failure_code_includes_status() {
        let err = RunFailedError {
            status: RunStatus::Expired,
            last_error: Some(RunError {
                code: "rate_limit_exceeded".to_string(),
                message: "slow down".to_string(),
            }),
        };
        let envelope = ErrorEnvelope::from(&err);
        assert_eq!(envelope.code, "run_expired");
        assert_eq!(envelope.category, ErrorCategory::Run);
        assert!(envelope.message.contains("slow down"));
    }
}
