//! HTTP error types for the Garage console server.
//!
//! Maps domain errors from `garage-console-core` and
//! `garage-console-storage` into HTTP responses. Every variant produces the
//! same JSON envelope, `{ "error": "<message>" }`. Internal failures are
//! logged with their detail and answered with a generic message. Proxy
//! credential and gateway failures are logged once by the proxy service,
//! with the cluster id, and answered generically here.

use axum::extract::rejection::{BytesRejection, JsonRejection, PathRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use garage_console_core::error::{CipherError, ProxyError, SessionError};
use garage_console_storage::RegistryError;

/// Application-level error returned from HTTP handlers.
#[derive(Debug)]
pub enum AppError {
    /// Missing or malformed credentials.
    Unauthorized(String),
    /// Credentials were presented but are not valid.
    Forbidden(String),
    /// Requested resource not found.
    NotFound(String),
    /// Client sent invalid input.
    BadRequest(String),
    /// A conflict (e.g., duplicate cluster id).
    Conflict(String),
    /// The request body exceeds the route's limit.
    PayloadTooLarge(String),
    /// The upstream cluster could not be reached.
    BadGateway,
    /// A stored cluster credential cannot be used.
    CredentialUnavailable,
    /// Internal server error. Detail is logged only.
    Internal(String),
}

/// JSON error response body.
#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            Self::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::Conflict(msg) => (StatusCode::CONFLICT, msg),
            Self::PayloadTooLarge(msg) => (StatusCode::PAYLOAD_TOO_LARGE, msg),
            Self::BadGateway => (
                StatusCode::BAD_GATEWAY,
                "upstream cluster unreachable".to_owned(),
            ),
            Self::CredentialUnavailable => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal server error".to_owned(),
            ),
            Self::Internal(detail) => {
                tracing::error!(error = %detail, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_owned(),
                )
            }
        };

        (status, axum::Json(ErrorBody { error: message })).into_response()
    }
}

impl From<ProxyError> for AppError {
    fn from(err: ProxyError) -> Self {
        match err {
            ProxyError::ClusterNotFound { .. } => Self::NotFound(err.to_string()),
            ProxyError::BadGateway(_) => Self::BadGateway,
            ProxyError::Credential { .. } | ProxyError::UnusableCredential { .. } => {
                Self::CredentialUnavailable
            }
            ProxyError::Registry(_) => Self::Internal(err.to_string()),
        }
    }
}

impl From<RegistryError> for AppError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::NotFound { .. } => Self::NotFound(err.to_string()),
            RegistryError::AlreadyExists { .. } => Self::Conflict(err.to_string()),
            RegistryError::Open { .. }
            | RegistryError::Read { .. }
            | RegistryError::Write { .. }
            | RegistryError::Delete { .. } => Self::Internal(err.to_string()),
        }
    }
}

impl From<CipherError> for AppError {
    fn from(err: CipherError) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::Expired | SessionError::Invalid { .. } => {
                Self::Forbidden("invalid or expired session".to_owned())
            }
            SessionError::WeakSecret { .. } | SessionError::Signing { .. } => {
                Self::Internal(err.to_string())
            }
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<BytesRejection> for AppError {
    fn from(rejection: BytesRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            Self::PayloadTooLarge(rejection.body_text())
        } else {
            Self::BadRequest(rejection.body_text())
        }
    }
}
