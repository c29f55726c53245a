//! Observability module for the auth service.
//!
//! # Privacy by Default
//!
//! Instrumentation uses `#[instrument(skip_all)]` and explicit field allow-listing.
//! Fields are categorized as:
//! - **SAFE**: Can be logged in plaintext (enums, operation types, org ids)
//! - **HASHED**: Must go through [`hash_for_correlation`] (email, user_id)
//! - **NEVER**: Must never appear in logs (passwords, tokens, keys)

pub mod metrics;

use crate::errors::AuthError;
use sha2::{Digest, Sha256};

/// Hash a field value for correlation in logs (SHA-256, first 8 hex chars)
///
/// This is a one-way hash for correlation only. It is not a substitute for
/// hashing secrets.
pub fn hash_for_correlation(value: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(value.as_bytes());
    let result = hasher.finalize();
    hex::encode(result.get(..4).unwrap_or_default())
}

/// Error categories for metrics labels (bounded cardinality)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Bad credentials or inactive account
    Authentication,
    /// Token rejected (malformed, expired, revoked, wrong type)
    Token,
    /// Caller input problems (validation, conflict, missing resource)
    Client,
    /// Database, revocation store, crypto or other server faults
    Internal,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Authentication => "authentication",
            ErrorCategory::Token => "token",
            ErrorCategory::Client => "client",
            ErrorCategory::Internal => "internal",
        }
    }
}

impl From<&AuthError> for ErrorCategory {
    fn from(err: &AuthError) -> Self {
        match err {
            AuthError::AuthenticationFailed | AuthError::AccountInactive => {
                ErrorCategory::Authentication
            }
            AuthError::InvalidToken(_) => ErrorCategory::Token,
            AuthError::Conflict(_) | AuthError::Validation(_) | AuthError::NotFound(_) => {
                ErrorCategory::Client
            }
            AuthError::Database(_)
            | AuthError::Revocation(_)
            | AuthError::Crypto(_)
            | AuthError::Internal(_) => ErrorCategory::Internal,
        }
    }
}
