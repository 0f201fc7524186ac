//! API error types and responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use lz_vending_core::ProvisionError;

/// API error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Unauthorized - missing or invalid credentials.
    #[error("unauthorized")]
    Unauthorized,

    /// Bad request - invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Conflict - the account name is registered to another account.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The step terminated fatally; re-invoking it will not help.
    #[error("provisioning failed: {0}")]
    Provisioning(String),

    /// Account creation may have succeeded; an operator must reconcile it.
    #[error("creation unresolved: {message}")]
    CreationUnresolved {
        /// Diagnostic message.
        message: String,
        /// The create-account operation handle, if known.
        request_id: Option<String>,
        /// The created account, if known.
        account_id: Option<String>,
    },

    /// A collaborator failed outside any retry loop.
    #[error("external service error: {0}")]
    ExternalService(String),

    /// The step was interrupted by shutdown.
    #[error("cancelled: {0}")]
    Cancelled(String),

    /// A polling or retry loop ran out of attempts.
    #[error("retries exhausted: {message}")]
    RetriesExhausted {
        /// Diagnostic message.
        message: String,
        /// The loop that gave up.
        operation: &'static str,
        /// Attempts made.
        attempts: u32,
    },
}

/// JSON error response body.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = match &self {
            Self::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                self.to_string(),
                None,
            ),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone(), None),
            Self::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg.clone(), None),
            Self::Provisioning(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "provisioning_failed",
                msg.clone(),
                None,
            ),
            Self::CreationUnresolved {
                message,
                request_id,
                account_id,
            } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "creation_unresolved",
                message.clone(),
                Some(serde_json::json!({
                    "request_id": request_id,
                    "account_id": account_id
                })),
            ),
            Self::ExternalService(msg) => (
                StatusCode::BAD_GATEWAY,
                "external_service_error",
                msg.clone(),
                None,
            ),
            Self::Cancelled(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "cancelled",
                msg.clone(),
                None,
            ),
            Self::RetriesExhausted {
                message,
                operation,
                attempts,
            } => (
                StatusCode::GATEWAY_TIMEOUT,
                "retries_exhausted",
                message.clone(),
                Some(serde_json::json!({
                    "operation": operation,
                    "attempts": attempts
                })),
            ),
        };

        let body = ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message,
                details,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<ProvisionError> for ApiError {
    fn from(err: ProvisionError) -> Self {
        let message = err.to_string();
        match err {
            ProvisionError::InvalidInput(_) | ProvisionError::InvalidId(_) => {
                Self::BadRequest(message)
            }
            ProvisionError::InventoryConflict { .. } => Self::Conflict(message),
            ProvisionError::SubmissionRejected { .. }
            | ProvisionError::CreationFailed { .. }
            | ProvisionError::StackRolledBack { .. }
            | ProvisionError::StackUnusable { .. }
            | ProvisionError::AliasTaken { .. }
            | ProvisionError::Policy(_)
            | ProvisionError::InvalidTemplate { .. } => Self::Provisioning(message),
            ProvisionError::CreationUnresolved {
                request_id,
                account_id,
                ..
            } => Self::CreationUnresolved {
                message,
                request_id,
                account_id,
            },
            ProvisionError::Service { .. } | ProvisionError::Inventory(_) => {
                Self::ExternalService(message)
            }
            ProvisionError::Cancelled { .. } => Self::Cancelled(message),
            ProvisionError::RetriesExhausted {
                operation,
                attempts,
                ..
            } => Self::RetriesExhausted {
                message,
                operation,
                attempts,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn saga_failures_map_to_status_classes() {
        let cases = [
            (
                ProvisionError::InvalidInput("blank".into()),
                StatusCode::BAD_REQUEST,
            ),
            (
                ProvisionError::CreationFailed {
                    request_id: "car-1".into(),
                    reason: "EMAIL_ALREADY_EXISTS".into(),
                },
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                ProvisionError::AliasTaken {
                    alias: "team-a".into(),
                    current: vec![],
                },
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                ProvisionError::Cancelled { operation: "poll" },
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                ProvisionError::RetriesExhausted {
                    operation: "assume_role",
                    attempts: 3,
                    last_error: "AccessDenied".into(),
                },
                StatusCode::GATEWAY_TIMEOUT,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(ApiError::from(err).into_response().status(), status);
        }
    }
}
