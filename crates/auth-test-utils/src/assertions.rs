//! Custom test assertions for issued tokens
//!
//! These decode without verifying the signature; they check shape only.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::Utc;
use common::jwt::TokenType;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct JwtHeader {
    typ: String,
    #[serde(default)]
    kid: Option<String>,
}

#[derive(Debug, Deserialize)]
struct JwtClaims {
    sub: String,
    typ: TokenType,
    iat: i64,
    exp: i64,
}

fn decode_segment<T: serde::de::DeserializeOwned>(token: &str, index: usize, what: &str) -> T {
    let segment = token
        .split('.')
        .nth(index)
        .unwrap_or_else(|| panic!("JWT is missing its {what} segment"));
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .unwrap_or_else(|e| panic!("Failed to base64 decode JWT {what}: {e}"));
    serde_json::from_slice(&bytes).unwrap_or_else(|e| panic!("Failed to parse JWT {what}: {e}"))
}

/// Custom assertions for issued tokens
///
/// # Example
/// ```rust,ignore
/// tokens.access_token
///     .assert_valid_jwt()
///     .assert_token_type(TokenType::Access)
///     .assert_expires_in(1800);
/// ```
pub trait TokenAssertions {
    /// Three base64url segments, `typ: JWT` header with a `kid`.
    fn assert_valid_jwt(&self) -> &Self;

    fn assert_token_type(&self, expected: TokenType) -> &Self;

    /// `exp - iat` equals `seconds`.
    fn assert_expires_in(&self, seconds: i64) -> &Self;

    fn assert_for_subject(&self, subject: &str) -> &Self;

    /// `exp` is in the future.
    fn assert_not_expired(&self) -> &Self;
}

impl TokenAssertions for String {
    fn assert_valid_jwt(&self) -> &Self {
        let parts = self.split('.').count();
        assert_eq!(
            parts, 3,
            "JWT must have 3 parts (header.payload.signature), got {parts}"
        );

        let header: JwtHeader = decode_segment(self, 0, "header");
        assert_eq!(header.typ, "JWT", "Expected JWT type");
        assert!(header.kid.is_some(), "JWT header must carry a kid");

        let _: JwtClaims = decode_segment(self, 1, "payload");
        self
    }

    fn assert_token_type(&self, expected: TokenType) -> &Self {
        let claims: JwtClaims = decode_segment(self, 1, "payload");
        assert_eq!(claims.typ, expected, "Unexpected token type");
        self
    }

    fn assert_expires_in(&self, seconds: i64) -> &Self {
        let claims: JwtClaims = decode_segment(self, 1, "payload");
        assert_eq!(
            claims.exp - claims.iat,
            seconds,
            "Token lifetime mismatch"
        );
        self
    }

    fn assert_for_subject(&self, subject: &str) -> &Self {
        let claims: JwtClaims = decode_segment(self, 1, "payload");
        assert_eq!(claims.sub, subject, "Token subject mismatch");
        self
    }

    fn assert_not_expired(&self) -> &Self {
        let claims: JwtClaims = decode_segment(self, 1, "payload");
        assert!(
            claims.exp > Utc::now().timestamp(),
            "Token expired at {}",
            claims.exp
        );
        self
    }
}
