//! HTTP error types for the `SecurityX` server.
//!
//! Maps domain errors from `securityx-core` into HTTP responses. Every
//! variant produces a JSON body with a machine-readable `error` field and a
//! human-readable `message`; validation failures add a `fields` map.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use securityx_core::dashboard::CardError;
use securityx_core::error::{BackendError, RepositoryError};
use securityx_core::validation::FieldErrors;

/// Application-level error returned from HTTP handlers.
#[derive(Debug)]
pub enum AppError {
    /// No session, or the session was refused.
    Unauthorized(String),
    /// Requested resource not found.
    NotFound(String),
    /// Client sent invalid input.
    BadRequest(String),
    /// One or more form fields failed validation.
    Validation(FieldErrors),
    /// A conflict (e.g., email already registered).
    Conflict(String),
    /// A hosted service failed; the message is safe to show.
    Upstream(String),
    /// Internal server error. Details are logged, not returned.
    Internal(String),
}

/// JSON error response body.
#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    fields: Option<FieldErrors>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let mut fields = None;
        let (status, error_type, message) = match self {
            Self::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            Self::Validation(errors) => {
                let message = format!("{} field(s) failed validation", errors.len());
                fields = Some(errors);
                (StatusCode::BAD_REQUEST, "validation", message)
            }
            Self::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg),
            Self::Upstream(msg) => (StatusCode::BAD_GATEWAY, "upstream", msg),
            Self::Internal(msg) => {
                tracing::error!(error = %msg, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "internal server error".to_owned(),
                )
            }
        };

        let body = ErrorBody {
            error: error_type,
            message,
            fields,
        };

        (status, axum::Json(body)).into_response()
    }
}

impl From<FieldErrors> for AppError {
    fn from(errors: FieldErrors) -> Self {
        Self::Validation(errors)
    }
}

impl From<BackendError> for AppError {
    fn from(err: BackendError) -> Self {
        match err {
            // Auth messages come from the backend and are meant for the user.
            BackendError::Auth { reason } => Self::Unauthorized(reason),
            BackendError::Conflict { reason } => Self::Conflict(reason),
            BackendError::NotFound { .. } => Self::NotFound(err.to_string()),
            BackendError::NotReady { .. } => {
                tracing::warn!(error = %err, "backend not ready");
                Self::Upstream("The service is not ready yet. Please try again later.".to_owned())
            }
            BackendError::Transport { .. } | BackendError::Decode { .. } => {
                tracing::warn!(error = %err, "backend call failed");
                Self::Upstream("The service is unavailable. Please try again.".to_owned())
            }
        }
    }
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::UnknownIntegration { .. } => Self::NotFound(err.to_string()),
            RepositoryError::Storage(_) | RepositoryError::Snapshot(_) => {
                Self::Internal(err.to_string())
            }
        }
    }
}

impl From<CardError> for AppError {
    fn from(err: CardError) -> Self {
        match err {
            CardError::UnknownIndex(_) => Self::NotFound(err.to_string()),
            CardError::MissingCredentials(_) | CardError::UnknownField(..) => {
                Self::BadRequest(err.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses() {
        let cases = [
            (AppError::from(CardError::UnknownIndex(9)), StatusCode::NOT_FOUND),
            (
                AppError::from(CardError::MissingCredentials("Slack")),
                StatusCode::BAD_REQUEST,
            ),
            (
                AppError::from(BackendError::Auth {
                    reason: "Invalid login credentials".to_owned(),
                }),
                StatusCode::UNAUTHORIZED,
            ),
            (
                AppError::from(BackendError::NotReady {
                    reason: "no table".to_owned(),
                }),
                StatusCode::BAD_GATEWAY,
            ),
            (AppError::from(FieldErrors::new()), StatusCode::BAD_REQUEST),
            (AppError::Internal("boom".to_owned()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }
}
