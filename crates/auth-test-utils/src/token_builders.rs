//! Builder for signed test tokens.

use crate::test_ids::{TEST_ORG_ACME, TEST_SESSION_1, TEST_USER_ALICE};
use auth_service::crypto::{sign_token, TokenClaims, TokenSigner};
use auth_service::models::Role;
use chrono::{Duration, Utc};
use common::jwt::TokenType;
use common::types::{OrgId, SessionId, UserId};
use uuid::Uuid;

/// Builder for `TokenClaims` with sensible defaults.
///
/// # Example
/// ```rust,ignore
/// let token = TestTokenBuilder::new()
///     .for_user(TEST_USER_ALICE)
///     .refresh()
///     .expires_in(-10)
///     .sign(&test_hmac_signer());
/// ```
pub struct TestTokenBuilder {
    claims: TokenClaims,
}

impl TestTokenBuilder {
    /// Access token for Alice in Acme, valid for one hour.
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            claims: TokenClaims {
                sub: TEST_USER_ALICE,
                org_id: TEST_ORG_ACME,
                role: Role::Admin,
                sid: TEST_SESSION_1,
                jti: Uuid::new_v4(),
                typ: TokenType::Access,
                iat: now.timestamp(),
                exp: (now + Duration::seconds(3600)).timestamp(),
            },
        }
    }

    pub fn for_user(mut self, user_id: UserId) -> Self {
        self.claims.sub = user_id;
        self
    }

    pub fn in_org(mut self, org_id: OrgId) -> Self {
        self.claims.org_id = org_id;
        self
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.claims.role = role;
        self
    }

    pub fn with_session(mut self, sid: SessionId) -> Self {
        self.claims.sid = sid;
        self
    }

    pub fn refresh(mut self) -> Self {
        self.claims.typ = TokenType::Refresh;
        self
    }

    /// Set expiration in seconds from now (negative for an expired token).
    pub fn expires_in(mut self, seconds: i64) -> Self {
        self.claims.exp = (Utc::now() + Duration::seconds(seconds)).timestamp();
        self
    }

    pub fn issued_at(mut self, timestamp: i64) -> Self {
        self.claims.iat = timestamp;
        self
    }

    pub fn build(self) -> TokenClaims {
        self.claims
    }

    pub fn sign(self, signer: &dyn TokenSigner) -> String {
        sign_token(signer, &self.claims).expect("test token signing should succeed")
    }
}

impl Default for TestTokenBuilder {
    fn default() -> Self {
        Self::new()
    }
}
