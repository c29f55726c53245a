//! Password hashing and JWT signing/verification.

mod signer;

pub use signer::{signer_from_config, Ed25519Signer, HmacSigner, TokenSigner};

use crate::config::{MAX_BCRYPT_COST, MIN_BCRYPT_COST};
use crate::errors::AuthError;
use crate::models::Role;
use crate::observability::metrics::record_token_validation;
use common::jwt::{check_token_size, validate_iat, TokenType};
use common::types::{OrgId, SessionId, UserId};
use jsonwebtoken::{decode, encode, Header, Validation};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::instrument;
use uuid::Uuid;

/// JWT payload shared by access and refresh tokens.
///
/// `sub`, `sid` and `jti` are redacted in Debug output.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject (user id)
    pub sub: UserId,
    pub org_id: OrgId,
    pub role: Role,
    /// Session id shared by one login's access/refresh pair
    pub sid: SessionId,
    /// Unique token id
    pub jti: Uuid,
    pub typ: TokenType,
    pub iat: i64,
    pub exp: i64,
}

impl fmt::Debug for TokenClaims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenClaims")
            .field("sub", &"[REDACTED]")
            .field("org_id", &self.org_id)
            .field("role", &self.role)
            .field("sid", &"[REDACTED]")
            .field("jti", &"[REDACTED]")
            .field("typ", &self.typ)
            .field("iat", &self.iat)
            .field("exp", &self.exp)
            .finish()
    }
}

impl TokenClaims {
    /// Seconds until `exp`, floored at one second.
    pub fn remaining_lifetime(&self, now: i64) -> Duration {
        let secs = self.exp.saturating_sub(now).max(1);
        Duration::from_secs(u64::try_from(secs).unwrap_or(1))
    }
}

/// Sign claims with the signer's algorithm and key id.
#[instrument(skip_all)]
pub fn sign_token(signer: &dyn TokenSigner, claims: &TokenClaims) -> Result<String, AuthError> {
    let mut header = Header::new(signer.algorithm());
    header.typ = Some("JWT".to_string());
    header.kid = Some(signer.key_id().to_string());

    encode(&header, claims, signer.encoding_key())
        .map_err(|e| AuthError::Crypto(format!("JWT signing operation failed: {e}")))
}

/// Verify a token and return its claims.
///
/// Checks, in order: size limit, signature with the signer's single
/// algorithm, `exp` with zero leeway, `iat` against `clock_skew`, and `typ`.
/// Every failure maps to the same generic `InvalidToken`.
#[instrument(skip_all, fields(expected = %expected))]
pub fn verify_token(
    signer: &dyn TokenSigner,
    token: &str,
    expected: TokenType,
    clock_skew: Duration,
) -> Result<TokenClaims, AuthError> {
    let result = verify_token_inner(signer, token, expected, clock_skew);
    match &result {
        Ok(_) => record_token_validation(expected.as_str(), "success", None),
        Err(reason) => record_token_validation(expected.as_str(), "error", Some(*reason)),
    }
    result.map_err(|_| AuthError::invalid_token())
}

fn verify_token_inner(
    signer: &dyn TokenSigner,
    token: &str,
    expected: TokenType,
    clock_skew: Duration,
) -> Result<TokenClaims, &'static str> {
    check_token_size(token).map_err(|_| "too_large")?;

    let mut validation = Validation::new(signer.algorithm());
    validation.leeway = 0;
    validation.validate_exp = true;
    validation.set_required_spec_claims(&["exp", "iat", "sub"]);

    let token_data = decode::<TokenClaims>(token, signer.decoding_key(), &validation).map_err(
        |e| {
            tracing::debug!(target: "auth.crypto", error = %e, "Token verification failed");
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => "expired",
                jsonwebtoken::errors::ErrorKind::InvalidSignature => "signature",
                _ => "malformed",
            }
        },
    )?;

    validate_iat(token_data.claims.iat, clock_skew).map_err(|_| "clock_skew")?;
    token_data.claims.typ.require(expected).map_err(|_| "wrong_type")?;

    Ok(token_data.claims)
}

/// Plaintext behind the dummy hash verified when a login email is unknown.
pub const DUMMY_PASSWORD: &str = "unknown-account-placeholder";

/// Bcrypt hash of [`DUMMY_PASSWORD`] at `cost`.
///
/// Must be built at the same cost as stored hashes so unknown-email and
/// wrong-password logins take the same time.
pub fn dummy_password_hash(cost: u32) -> Result<String, AuthError> {
    hash_password(DUMMY_PASSWORD, cost)
}

/// Hash a password with bcrypt.
///
/// # Errors
///
/// Returns `AuthError::Crypto` if the cost is outside 10-14 or hashing fails.
#[instrument(skip_all)]
pub fn hash_password(password: &str, cost: u32) -> Result<String, AuthError> {
    if !(MIN_BCRYPT_COST..=MAX_BCRYPT_COST).contains(&cost) {
        return Err(AuthError::Crypto(format!(
            "Invalid bcrypt cost: {cost} (must be {MIN_BCRYPT_COST}-{MAX_BCRYPT_COST})"
        )));
    }

    bcrypt::hash(password, cost)
        .map_err(|e| AuthError::Crypto(format!("Password hashing failed: {e}")))
}

/// Verify a password against a bcrypt hash.
#[instrument(skip_all)]
pub fn verify_password(password: &str, hash: &str) -> Result<bool, AuthError> {
    bcrypt::verify(password, hash)
        .map_err(|e| AuthError::Crypto(format!("Password verification failed: {e}")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};

    fn hmac() -> HmacSigner {
        HmacSigner::new(&[42u8; 32]).unwrap()
    }

    fn claims(typ: TokenType, iat: i64, exp: i64) -> TokenClaims {
        TokenClaims {
            sub: UserId(Uuid::from_u128(1)),
            org_id: OrgId(Uuid::from_u128(2)),
            role: Role::Admin,
            sid: SessionId(Uuid::from_u128(3)),
            jti: Uuid::from_u128(4),
            typ,
            iat,
            exp,
        }
    }

    fn now() -> i64 {
        chrono::Utc::now().timestamp()
    }

    const SKEW: Duration = Duration::from_secs(300);

    #[test]
    fn test_sign_and_verify_access_token_hs256() {
        let signer = hmac();
        let original = claims(TokenType::Access, now(), now() + 1800);
        let token = sign_token(&signer, &original).unwrap();

        let verified = verify_token(&signer, &token, TokenType::Access, SKEW).unwrap();
        assert_eq!(verified, original);
    }

    #[test]
    fn test_sign_and_verify_refresh_token_eddsa() {
        let signer = Ed25519Signer::generate().unwrap();
        let original = claims(TokenType::Refresh, now(), now() + 86400);
        let token = sign_token(&signer, &original).unwrap();

        let verified = verify_token(&signer, &token, TokenType::Refresh, SKEW).unwrap();
        assert_eq!(verified.sid, original.sid);
    }

    #[test]
    fn test_header_carries_kid_and_alg() {
        let signer = Ed25519Signer::generate().unwrap();
        let token = sign_token(&signer, &claims(TokenType::Access, now(), now() + 60)).unwrap();

        let header = jsonwebtoken::decode_header(&token).unwrap();
        assert_eq!(header.alg, jsonwebtoken::Algorithm::EdDSA);
        assert_eq!(header.kid.as_deref(), Some(signer.key_id()));
    }

    #[test]
    fn test_verify_rejects_wrong_token_type() {
        let signer = hmac();
        let token = sign_token(&signer, &claims(TokenType::Refresh, now(), now() + 60)).unwrap();

        let result = verify_token(&signer, &token, TokenType::Access, SKEW);
        assert!(matches!(result, Err(AuthError::InvalidToken(_))));
    }

    #[test]
    fn test_verify_rejects_expired_token_without_leeway() {
        let signer = hmac();
        let token =
            sign_token(&signer, &claims(TokenType::Access, now() - 120, now() - 5)).unwrap();

        let result = verify_token(&signer, &token, TokenType::Access, SKEW);
        assert!(matches!(result, Err(AuthError::InvalidToken(_))));
    }

    #[test]
    fn test_verify_rejects_future_iat() {
        let signer = hmac();
        let token =
            sign_token(&signer, &claims(TokenType::Access, now() + 3600, now() + 7200)).unwrap();

        let result = verify_token(&signer, &token, TokenType::Access, SKEW);
        assert!(matches!(result, Err(AuthError::InvalidToken(_))));
    }

    #[test]
    fn test_verify_rejects_other_key() {
        let token =
            sign_token(&hmac(), &claims(TokenType::Access, now(), now() + 60)).unwrap();
        let other = HmacSigner::new(&[7u8; 32]).unwrap();

        let result = verify_token(&other, &token, TokenType::Access, SKEW);
        assert!(matches!(result, Err(AuthError::InvalidToken(_))));
    }

    #[test]
    fn test_verify_rejects_algorithm_switch() {
        // HS256 token presented to an EdDSA verifier
        let token =
            sign_token(&hmac(), &claims(TokenType::Access, now(), now() + 60)).unwrap();
        let eddsa = Ed25519Signer::generate().unwrap();

        let result = verify_token(&eddsa, &token, TokenType::Access, SKEW);
        assert!(matches!(result, Err(AuthError::InvalidToken(_))));
    }

    #[test]
    fn test_verify_rejects_tampered_payload() {
        let signer = hmac();
        let token = sign_token(&signer, &claims(TokenType::Access, now(), now() + 60)).unwrap();
        let mut parts: Vec<String> = token.split('.').map(ToString::to_string).collect();

        let mut tampered = claims(TokenType::Access, now(), now() + 60);
        tampered.role = Role::Member;
        *parts.get_mut(1).unwrap() = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&tampered).unwrap());

        let result = verify_token(&signer, &parts.join("."), TokenType::Access, SKEW);
        assert!(matches!(result, Err(AuthError::InvalidToken(_))));
    }

    #[test]
    fn test_verify_rejects_oversized_token() {
        let signer = hmac();
        let oversized = "a".repeat(common::jwt::MAX_JWT_SIZE_BYTES + 1);

        let result = verify_token(&signer, &oversized, TokenType::Access, SKEW);
        assert!(matches!(result, Err(AuthError::InvalidToken(_))));
    }

    #[test]
    fn test_verify_rejects_garbage() {
        let result = verify_token(&hmac(), "not.a.jwt", TokenType::Access, SKEW);
        assert!(matches!(result, Err(AuthError::InvalidToken(msg)) if msg == crate::errors::INVALID_TOKEN_MESSAGE));
    }

    #[test]
    fn test_claims_debug_redacts_identifiers() {
        let c = claims(TokenType::Access, 1, 2);
        let debug = format!("{c:?}");
        assert!(!debug.contains("00000000-0000-0000-0000-000000000001"));
        assert!(!debug.contains("00000000-0000-0000-0000-000000000003"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn test_remaining_lifetime() {
        let c = claims(TokenType::Refresh, 0, 1000);
        assert_eq!(c.remaining_lifetime(400), Duration::from_secs(600));
        assert_eq!(c.remaining_lifetime(1000), Duration::from_secs(1));
        assert_eq!(c.remaining_lifetime(5000), Duration::from_secs(1));
    }

    #[test]
    fn test_hash_and_verify_password() {
        let hash = hash_password("pw123", MIN_BCRYPT_COST).unwrap();
        assert!(hash.starts_with("$2b$10$"));
        assert!(verify_password("pw123", &hash).unwrap());
        assert!(!verify_password("pw124", &hash).unwrap());
    }

    #[test]
    fn test_hash_password_rejects_bad_cost() {
        assert!(matches!(
            hash_password("pw123", 4),
            Err(AuthError::Crypto(_))
        ));
        assert!(matches!(
            hash_password("pw123", 15),
            Err(AuthError::Crypto(_))
        ));
    }

    #[test]
    fn test_dummy_hash_follows_cost() {
        let hash = dummy_password_hash(11).unwrap();
        assert!(hash.starts_with("$2b$11$"), "unexpected hash prefix: {hash}");
        assert!(!verify_password("anything", &hash).unwrap());
        assert!(verify_password(DUMMY_PASSWORD, &hash).unwrap());
    }
}
