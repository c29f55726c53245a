//! Auth Service error types.
//!
//! All errors map to HTTP status codes via the `IntoResponse` impl. Messages
//! returned for 5xx errors are generic; the detail is logged server-side.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::observability::{metrics::record_error, ErrorCategory};

/// Generic message for any token verification failure.
pub const INVALID_TOKEN_MESSAGE: &str = "The token is invalid or expired";

/// Identical message for unknown email and wrong password.
pub const AUTHENTICATION_FAILED_MESSAGE: &str = "Invalid email or password";

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid email or password")]
    AuthenticationFailed,

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Account is not active")]
    AccountInactive,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Revocation store error: {0}")]
    Revocation(String),

    #[error("Cryptographic error: {0}")]
    Crypto(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Token rejection with the shared generic message.
    pub fn invalid_token() -> Self {
        AuthError::InvalidToken(INVALID_TOKEN_MESSAGE.to_string())
    }

    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::Conflict(_) => StatusCode::CONFLICT,
            AuthError::AuthenticationFailed | AuthError::InvalidToken(_) => {
                StatusCode::UNAUTHORIZED
            }
            AuthError::AccountInactive => StatusCode::FORBIDDEN,
            AuthError::Validation(_) => StatusCode::BAD_REQUEST,
            AuthError::NotFound(_) => StatusCode::NOT_FOUND,
            AuthError::Database(_)
            | AuthError::Revocation(_)
            | AuthError::Crypto(_)
            | AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            AuthError::Conflict(_) => "CONFLICT",
            AuthError::AuthenticationFailed => "AUTHENTICATION_FAILED",
            AuthError::InvalidToken(_) => "INVALID_TOKEN",
            AuthError::AccountInactive => "ACCOUNT_INACTIVE",
            AuthError::Validation(_) => "VALIDATION_ERROR",
            AuthError::NotFound(_) => "NOT_FOUND",
            AuthError::Database(_) => "DATABASE_ERROR",
            AuthError::Revocation(_) => "REVOCATION_STORE_ERROR",
            AuthError::Crypto(_) => "CRYPTO_ERROR",
            AuthError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<sqlx::Error> for AuthError {
    fn from(err: sqlx::Error) -> Self {
        AuthError::Database(err.to_string())
    }
}

impl From<redis::RedisError> for AuthError {
    fn from(err: redis::RedisError) -> Self {
        AuthError::Revocation(err.to_string())
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

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            AuthError::Conflict(reason)
            | AuthError::InvalidToken(reason)
            | AuthError::Validation(reason)
            | AuthError::NotFound(reason) => reason.clone(),
            AuthError::AuthenticationFailed => AUTHENTICATION_FAILED_MESSAGE.to_string(),
            AuthError::AccountInactive => "This account is not active".to_string(),
            AuthError::Database(err) => {
                tracing::error!(target: "auth.database", error = %err, "Database operation failed");
                "An internal database error occurred".to_string()
            }
            AuthError::Revocation(err) => {
                tracing::error!(target: "auth.revocation", error = %err, "Revocation store operation failed");
                "An internal error occurred".to_string()
            }
            AuthError::Crypto(err) => {
                tracing::error!(target: "auth.crypto", error = %err, "Cryptographic operation failed");
                "An internal cryptographic error occurred".to_string()
            }
            AuthError::Internal(err) => {
                tracing::error!(target: "auth.internal", error = %err, "Internal error");
                "An internal error occurred".to_string()
            }
        };

        record_error(ErrorCategory::from(&self).as_str(), status.as_u16());

        let body = ErrorResponse {
            error: ErrorDetail {
                code: self.code().to_string(),
                message,
            },
        };

        let mut response = (status, Json(body)).into_response();
        if status == StatusCode::UNAUTHORIZED {
            response.headers_mut().insert(
                header::WWW_AUTHENTICATE,
                HeaderValue::from_static("Bearer"),
            );
        }
        response
    }
}
