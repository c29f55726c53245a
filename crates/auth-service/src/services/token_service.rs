//! Issuance, verification and rotation of access/refresh token pairs.

use crate::config::Config;
use crate::crypto::{self, TokenClaims, TokenSigner};
use crate::errors::AuthError;
use crate::models::{
    LoginRequest, NewOrganizationWithAdmin, OrganizationResponse, Principal, RegistrationRequest,
    RegistrationResponse, TokenResponse, User, UserProfile,
};
use crate::observability::hash_for_correlation;
use crate::observability::metrics::{
    record_bcrypt_duration, record_login_failure, record_logout, record_refresh_outcome,
    record_token_issuance,
};
use crate::repositories::{RevocationStore, UserStore};
use crate::services::validation::{normalize_email, validate_password, validate_registration};
use chrono::Utc;
use common::jwt::TokenType;
use common::secret::{ExposeSecret, SecretString};
use common::types::SessionId;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::OnceCell;
use tracing::instrument;
use uuid::Uuid;

/// Lifetimes and limits applied by [`TokenService`].
#[derive(Debug, Clone)]
pub struct TokenSettings {
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
    pub clock_skew: Duration,
    pub bcrypt_cost: u32,
    pub password_min_length: usize,
}

impl TokenSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            access_ttl: Duration::from_secs(config.access_token_ttl_seconds),
            refresh_ttl: Duration::from_secs(config.refresh_token_ttl_days * 24 * 60 * 60),
            clock_skew: Duration::from_secs(config.jwt_clock_skew_seconds),
            bcrypt_cost: config.bcrypt_cost,
            password_min_length: config.password_min_length,
        }
    }
}

fn secs_i64(duration: Duration) -> i64 {
    i64::try_from(duration.as_secs()).unwrap_or(i64::MAX)
}

pub struct TokenService {
    users: Arc<dyn UserStore>,
    revocations: Arc<dyn RevocationStore>,
    signer: Arc<dyn TokenSigner>,
    settings: TokenSettings,
    /// Built on first use at `settings.bcrypt_cost`.
    dummy_hash: OnceCell<String>,
}

impl TokenService {
    pub fn new(
        users: Arc<dyn UserStore>,
        revocations: Arc<dyn RevocationStore>,
        signer: Arc<dyn TokenSigner>,
        settings: TokenSettings,
    ) -> Self {
        Self {
            users,
            revocations,
            signer,
            settings,
            dummy_hash: OnceCell::new(),
        }
    }

    pub fn settings(&self) -> &TokenSettings {
        &self.settings
    }

    /// Create an organization with its admin user and log the admin in.
    #[instrument(skip_all)]
    pub async fn register(
        &self,
        request: RegistrationRequest,
    ) -> Result<RegistrationResponse, AuthError> {
        let start = Instant::now();
        let result = self.register_inner(request).await;
        record_token_issuance("registration", outcome(&result), start.elapsed());
        result
    }

    async fn register_inner(
        &self,
        request: RegistrationRequest,
    ) -> Result<RegistrationResponse, AuthError> {
        let validated = validate_registration(
            &request.organization_name,
            &request.first_name,
            &request.last_name,
            &request.email,
            request.phone.as_deref(),
        )?;
        validate_password(
            request.password.expose_secret(),
            self.settings.password_min_length,
        )?;

        let password_hash = self.hash_password(request.password).await?;

        let (organization, user) = self
            .users
            .create_organization_with_admin(NewOrganizationWithAdmin {
                organization_name: validated.organization_name,
                slug: validated.slug,
                email: validated.email,
                password_hash,
                first_name: validated.first_name,
                last_name: validated.last_name,
                phone: validated.phone,
            })
            .await?;

        tracing::info!(
            target: "auth.service.register",
            org_id = %organization.org_id,
            user = %hash_for_correlation(&user.user_id.to_string()),
            "Organization registered"
        );

        let (principal, tokens) = self.issue_pair(&user)?;

        Ok(RegistrationResponse {
            principal,
            organization: OrganizationResponse::from(&organization),
            tokens,
        })
    }

    /// Authenticate by email and password.
    #[instrument(skip_all)]
    pub async fn login(&self, request: LoginRequest) -> Result<TokenResponse, AuthError> {
        let start = Instant::now();
        let result = self.login_inner(request).await;
        record_token_issuance("password", outcome(&result), start.elapsed());
        result
    }

    async fn login_inner(&self, request: LoginRequest) -> Result<TokenResponse, AuthError> {
        let email = normalize_email(&request.email);
        let user = self.users.find_user_by_email(&email).await?;

        // Unknown emails still pay for one bcrypt verification
        let hash = match user.as_ref() {
            Some(u) => u.password_hash.clone(),
            None => self.dummy_hash().await?,
        };
        let password_matches = self.verify_password(request.password, hash).await?;

        let user = match user {
            Some(user) if password_matches => user,
            Some(_) => {
                record_login_failure("bad_password");
                tracing::debug!(
                    target: "auth.service.login",
                    email = %hash_for_correlation(&email),
                    "Login failed: password mismatch"
                );
                return Err(AuthError::AuthenticationFailed);
            }
            None => {
                record_login_failure("unknown_email");
                tracing::debug!(
                    target: "auth.service.login",
                    email = %hash_for_correlation(&email),
                    "Login failed: unknown email"
                );
                return Err(AuthError::AuthenticationFailed);
            }
        };

        if !user.status.is_active() {
            record_login_failure("inactive");
            tracing::info!(
                target: "auth.service.login",
                user = %hash_for_correlation(&user.user_id.to_string()),
                status = user.status.as_str(),
                "Login rejected: account not active"
            );
            return Err(AuthError::AccountInactive);
        }

        if let Err(e) = self.users.record_login(user.user_id).await {
            tracing::warn!(
                target: "auth.service.login",
                error = %e,
                "Failed to record last login"
            );
        }

        let (_, tokens) = self.issue_pair(&user)?;
        Ok(tokens)
    }

    /// Exchange a refresh token for a new pair, revoking the old session.
    ///
    /// The revocation insert decides the winner when one token is presented
    /// concurrently.
    #[instrument(skip_all)]
    pub async fn refresh(&self, refresh_token: &SecretString) -> Result<TokenResponse, AuthError> {
        let start = Instant::now();
        let result = self.refresh_inner(refresh_token).await;
        record_token_issuance("refresh_token", outcome(&result), start.elapsed());
        result
    }

    async fn refresh_inner(&self, refresh_token: &SecretString) -> Result<TokenResponse, AuthError> {
        let claims = match self.verify(refresh_token.expose_secret(), TokenType::Refresh) {
            Ok(claims) => claims,
            Err(e) => {
                record_refresh_outcome("invalid");
                return Err(e);
            }
        };

        let now = Utc::now().timestamp();
        let first_use = self
            .revocations
            .revoke(claims.sid, claims.remaining_lifetime(now))
            .await?;

        if !first_use {
            record_refresh_outcome("replayed");
            tracing::warn!(
                target: "auth.service.refresh",
                user = %hash_for_correlation(&claims.sub.to_string()),
                "Refresh token reuse rejected"
            );
            return Err(AuthError::invalid_token());
        }

        let user = match self.users.find_user_by_id(claims.sub).await? {
            Some(user) if user.status.is_active() => user,
            _ => {
                record_refresh_outcome("invalid");
                tracing::info!(
                    target: "auth.service.refresh",
                    user = %hash_for_correlation(&claims.sub.to_string()),
                    "Refresh rejected: user missing or not active"
                );
                return Err(AuthError::invalid_token());
            }
        };

        record_refresh_outcome("rotated");
        let (_, tokens) = self.issue_pair(&user)?;
        Ok(tokens)
    }

    /// Revoke the session of a refresh token.
    ///
    /// Tokens that fail verification are ignored so the call is idempotent.
    #[instrument(skip_all)]
    pub async fn logout(&self, refresh_token: &SecretString) -> Result<(), AuthError> {
        let Ok(claims) = self.verify(refresh_token.expose_secret(), TokenType::Refresh) else {
            record_logout("invalid_token");
            return Ok(());
        };

        let now = Utc::now().timestamp();
        let newly_revoked = self
            .revocations
            .revoke(claims.sid, claims.remaining_lifetime(now))
            .await?;

        record_logout(if newly_revoked {
            "revoked"
        } else {
            "already_revoked"
        });
        Ok(())
    }

    /// Decode an access token into the principal it was issued for.
    ///
    /// Access tokens are never checked against the revocation set.
    pub fn resolve_current_principal(&self, access_token: &str) -> Result<Principal, AuthError> {
        let claims = self.verify(access_token, TokenType::Access)?;
        Ok(Principal {
            user_id: claims.sub,
            org_id: claims.org_id,
            role: claims.role,
            issued_at: claims.iat,
        })
    }

    /// Profile of the principal's user.
    #[instrument(skip_all)]
    pub async fn current_user(&self, principal: &Principal) -> Result<UserProfile, AuthError> {
        let user = self.active_user(principal).await?;
        Ok(UserProfile::from(&user))
    }

    /// Organization the principal belongs to.
    #[instrument(skip_all)]
    pub async fn current_organization(
        &self,
        principal: &Principal,
    ) -> Result<OrganizationResponse, AuthError> {
        let user = self.active_user(principal).await?;
        self.users
            .find_organization_by_id(user.org_id)
            .await?
            .map(|org| OrganizationResponse::from(&org))
            .ok_or_else(|| AuthError::NotFound("Organization not found".to_string()))
    }

    /// Load the principal's user, which must still exist in the same
    /// organization and be active.
    async fn active_user(&self, principal: &Principal) -> Result<User, AuthError> {
        let user = match self.users.find_user_by_id(principal.user_id).await? {
            Some(user) if user.org_id == principal.org_id => user,
            _ => return Err(AuthError::invalid_token()),
        };
        if !user.status.is_active() {
            tracing::info!(
                target: "auth.service.principal",
                user = %hash_for_correlation(&user.user_id.to_string()),
                status = user.status.as_str(),
                "Rejected principal: account not active"
            );
            return Err(AuthError::AccountInactive);
        }
        Ok(user)
    }

    fn verify(&self, token: &str, expected: TokenType) -> Result<TokenClaims, AuthError> {
        crypto::verify_token(
            self.signer.as_ref(),
            token,
            expected,
            self.settings.clock_skew,
        )
    }

    /// Mint an access/refresh pair under a fresh session id.
    fn issue_pair(&self, user: &User) -> Result<(Principal, TokenResponse), AuthError> {
        let now = Utc::now().timestamp();
        let sid = SessionId::new();

        let claims_for = |typ: TokenType, ttl: Duration| TokenClaims {
            sub: user.user_id,
            org_id: user.org_id,
            role: user.role,
            sid,
            jti: Uuid::new_v4(),
            typ,
            iat: now,
            exp: now.saturating_add(secs_i64(ttl)),
        };

        let access_token = crypto::sign_token(
            self.signer.as_ref(),
            &claims_for(TokenType::Access, self.settings.access_ttl),
        )?;
        let refresh_token = crypto::sign_token(
            self.signer.as_ref(),
            &claims_for(TokenType::Refresh, self.settings.refresh_ttl),
        )?;

        let principal = Principal {
            user_id: user.user_id,
            org_id: user.org_id,
            role: user.role,
            issued_at: now,
        };

        Ok((
            principal,
            TokenResponse {
                access_token,
                refresh_token,
                token_type: "Bearer".to_string(),
                expires_in: self.settings.access_ttl.as_secs(),
            },
        ))
    }

    async fn hash_password(&self, password: SecretString) -> Result<String, AuthError> {
        let cost = self.settings.bcrypt_cost;
        let start = Instant::now();
        let result = tokio::task::spawn_blocking(move || {
            crypto::hash_password(password.expose_secret(), cost)
        })
        .await
        .map_err(|e| AuthError::Internal(format!("Password hashing task failed: {e}")))?;
        record_bcrypt_duration("hash", start.elapsed());
        result
    }

    async fn dummy_hash(&self) -> Result<String, AuthError> {
        let cost = self.settings.bcrypt_cost;
        self.dummy_hash
            .get_or_try_init(|| async move {
                tokio::task::spawn_blocking(move || crypto::dummy_password_hash(cost))
                    .await
                    .map_err(|e| AuthError::Internal(format!("Dummy hash task failed: {e}")))?
            })
            .await
            .cloned()
    }

    async fn verify_password(
        &self,
        password: SecretString,
        hash: String,
    ) -> Result<bool, AuthError> {
        let start = Instant::now();
        let result = tokio::task::spawn_blocking(move || {
            crypto::verify_password(password.expose_secret(), &hash)
        })
        .await
        .map_err(|e| AuthError::Internal(format!("Password verification task failed: {e}")))?;
        record_bcrypt_duration("verify", start.elapsed());
        result
    }
}

fn outcome<T>(result: &Result<T, AuthError>) -> &'static str {
    if result.is_ok() {
        "success"
    } else {
        "error"
    }
}
