//! Session Gate error types.
//!
//! All errors map to HTTP status codes via the `IntoResponse` impl. Token
//! verification errors never reach a client through the request gate; they
//! degrade to an anonymous request instead. Identity provider rejections
//! during explicit login/confirm calls relay the provider's message.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Session Gate error type.
///
/// Maps to HTTP status codes:
/// - InvalidToken, UnsupportedAlgorithm, Unauthenticated, AuthenticationFailed: 401
/// - Forbidden: 403
/// - UserNotConfirmed, UnsupportedState, Provider, BadRequest: 400
/// - KeyLookup, ServiceUnavailable: 503
/// - Internal: 500
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Key lookup failed: {0}")]
    KeyLookup(String),

    #[error("Unsupported signing algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("Authentication required")]
    Unauthenticated,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("User not confirmed: {0}")]
    UserNotConfirmed(String),

    #[error("Unsupported user state: {0}")]
    UnsupportedState(String),

    #[error("Identity provider error: {0}")]
    Provider(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Internal server error")]
    Internal,
}

impl SessionError {
    /// HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            SessionError::InvalidToken(_)
            | SessionError::UnsupportedAlgorithm(_)
            | SessionError::Unauthenticated
            | SessionError::AuthenticationFailed(_) => 401,
            SessionError::Forbidden(_) => 403,
            SessionError::UserNotConfirmed(_)
            | SessionError::UnsupportedState(_)
            | SessionError::Provider(_)
            | SessionError::BadRequest(_) => 400,
            SessionError::KeyLookup(_) | SessionError::ServiceUnavailable(_) => 503,
            SessionError::Internal => 500,
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

impl IntoResponse for SessionError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            SessionError::InvalidToken(_) | SessionError::UnsupportedAlgorithm(_) => (
                StatusCode::UNAUTHORIZED,
                "INVALID_TOKEN",
                "The session token is invalid or expired".to_string(),
            ),
            SessionError::Unauthenticated => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHENTICATED",
                "Authentication required".to_string(),
            ),
            SessionError::AuthenticationFailed(message) => (
                StatusCode::UNAUTHORIZED,
                "AUTHENTICATION_FAILED",
                message.clone(),
            ),
            SessionError::Forbidden(reason) => (StatusCode::FORBIDDEN, "FORBIDDEN", reason.clone()),
            SessionError::UserNotConfirmed(message) => (
                StatusCode::BAD_REQUEST,
                "USER_NOT_CONFIRMED",
                message.clone(),
            ),
            SessionError::UnsupportedState(message) => (
                StatusCode::BAD_REQUEST,
                "UNSUPPORTED_USER_STATE",
                message.clone(),
            ),
            SessionError::Provider(message) => {
                (StatusCode::BAD_REQUEST, "PROVIDER_ERROR", message.clone())
            }
            SessionError::BadRequest(reason) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST", reason.clone())
            }
            SessionError::KeyLookup(reason) | SessionError::ServiceUnavailable(reason) => {
                // Log actual reason server-side
                tracing::warn!(target: "sg.availability", reason = %reason, "Service unavailable");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "SERVICE_UNAVAILABLE",
                    "Service temporarily unavailable".to_string(),
                )
            }
            SessionError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
            ),
        };

        let error_response = ErrorResponse {
            error: ErrorDetail {
                code: code.to_string(),
                message,
            },
        };

        let mut response = (status, Json(error_response)).into_response();

        if matches!(self, SessionError::Unauthenticated) {
            if let Ok(header_value) = "Cookie realm=\"session-gate\"".parse() {
                response
                    .headers_mut()
                    .insert("WWW-Authenticate", header_value);
            }
        }

        response
    }
}
