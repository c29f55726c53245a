//! Auth Service configuration.
//!
//! Configuration is loaded from environment variables. Connection URLs and key
//! material are redacted in Debug output.

use base64::{engine::general_purpose, Engine as _};
use common::jwt::{DEFAULT_CLOCK_SKEW, MAX_CLOCK_SKEW};
use common::secret::{ExposeSecret, SecretBox};
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;
use thiserror::Error;

/// Default HTTP bind address.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8000";

/// Default access token lifetime (30 minutes).
pub const DEFAULT_ACCESS_TOKEN_TTL_SECONDS: u64 = 1800;

/// Allowed access token lifetime range in seconds.
pub const ACCESS_TOKEN_TTL_RANGE: RangeInclusive<u64> = 60..=86_400;

/// Default refresh token lifetime in days.
pub const DEFAULT_REFRESH_TOKEN_TTL_DAYS: u64 = 7;

/// Allowed refresh token lifetime range in days.
pub const REFRESH_TOKEN_TTL_DAYS_RANGE: RangeInclusive<u64> = 1..=90;

/// Default bcrypt cost factor (~200ms per hash).
pub const DEFAULT_BCRYPT_COST: u32 = 12;

/// Minimum bcrypt cost accepted by configuration and hashing.
pub const MIN_BCRYPT_COST: u32 = 10;

/// Maximum bcrypt cost accepted by configuration and hashing.
pub const MAX_BCRYPT_COST: u32 = 14;

/// Default minimum password length in bytes.
pub const DEFAULT_PASSWORD_MIN_LENGTH: usize = 8;

/// bcrypt only reads the first 72 bytes of input.
pub const MAX_PASSWORD_LENGTH: usize = 72;

/// Minimum HMAC secret length for HS256.
pub const MIN_HMAC_SECRET_BYTES: usize = 32;

/// Default interval between expired-revocation purges.
pub const DEFAULT_REVOCATION_PURGE_INTERVAL_SECONDS: u64 = 3600;

/// Default database pool size.
pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;

/// Default CORS origins (local frontend dev servers).
pub const DEFAULT_ALLOWED_ORIGINS: &str = "http://localhost:5173,http://localhost:3000";

/// JWT signing algorithm selected by `JWT_SIGNING_ALGORITHM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SigningAlgorithm {
    Hs256,
    EdDsa,
}

impl FromStr for SigningAlgorithm {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "HS256" => Ok(SigningAlgorithm::Hs256),
            "EDDSA" => Ok(SigningAlgorithm::EdDsa),
            other => Err(ConfigError::InvalidSigningKey(format!(
                "JWT_SIGNING_ALGORITHM must be HS256 or EdDSA, got '{other}'"
            ))),
        }
    }
}

/// Auth Service configuration.
pub struct Config {
    /// PostgreSQL connection URL.
    pub database_url: String,

    /// Redis URL for the revocation store. Postgres is used when unset.
    pub redis_url: Option<String>,

    /// Server bind address (default: "0.0.0.0:8000").
    pub bind_address: String,

    pub jwt_signing_algorithm: SigningAlgorithm,

    /// Decoded HS256 secret (required when the algorithm is HS256).
    pub jwt_secret_key: Option<SecretBox<Vec<u8>>>,

    /// Decoded Ed25519 PKCS#8 document (required when the algorithm is EdDSA).
    pub jwt_signing_key_pkcs8: Option<SecretBox<Vec<u8>>>,

    pub access_token_ttl_seconds: u64,

    pub refresh_token_ttl_days: u64,

    /// Clock skew tolerance for `iat` validation.
    pub jwt_clock_skew_seconds: u64,

    pub bcrypt_cost: u32,

    pub password_min_length: usize,

    /// CORS allow-list.
    pub allowed_origins: Vec<String>,

    pub revocation_purge_interval_seconds: u64,

    pub db_max_connections: u32,
}

fn clone_secret(secret: &Option<SecretBox<Vec<u8>>>) -> Option<SecretBox<Vec<u8>>> {
    secret
        .as_ref()
        .map(|s| SecretBox::new(Box::new(s.expose_secret().clone())))
}

impl Clone for Config {
    fn clone(&self) -> Self {
        Self {
            database_url: self.database_url.clone(),
            redis_url: self.redis_url.clone(),
            bind_address: self.bind_address.clone(),
            jwt_signing_algorithm: self.jwt_signing_algorithm,
            jwt_secret_key: clone_secret(&self.jwt_secret_key),
            jwt_signing_key_pkcs8: clone_secret(&self.jwt_signing_key_pkcs8),
            access_token_ttl_seconds: self.access_token_ttl_seconds,
            refresh_token_ttl_days: self.refresh_token_ttl_days,
            jwt_clock_skew_seconds: self.jwt_clock_skew_seconds,
            bcrypt_cost: self.bcrypt_cost,
            password_min_length: self.password_min_length,
            allowed_origins: self.allowed_origins.clone(),
            revocation_purge_interval_seconds: self.revocation_purge_interval_seconds,
            db_max_connections: self.db_max_connections,
        }
    }
}

/// Custom Debug implementation that redacts sensitive fields.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("database_url", &"[REDACTED]")
            .field("redis_url", &self.redis_url.as_ref().map(|_| "[REDACTED]"))
            .field("bind_address", &self.bind_address)
            .field("jwt_signing_algorithm", &self.jwt_signing_algorithm)
            .field("jwt_secret_key", &self.jwt_secret_key)
            .field("jwt_signing_key_pkcs8", &self.jwt_signing_key_pkcs8)
            .field("access_token_ttl_seconds", &self.access_token_ttl_seconds)
            .field("refresh_token_ttl_days", &self.refresh_token_ttl_days)
            .field("jwt_clock_skew_seconds", &self.jwt_clock_skew_seconds)
            .field("bcrypt_cost", &self.bcrypt_cost)
            .field("password_min_length", &self.password_min_length)
            .field("allowed_origins", &self.allowed_origins)
            .field(
                "revocation_purge_interval_seconds",
                &self.revocation_purge_interval_seconds,
            )
            .field("db_max_connections", &self.db_max_connections)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid signing key configuration: {0}")]
    InvalidSigningKey(String),

    #[error("Invalid token lifetime configuration: {0}")]
    InvalidTokenLifetime(String),

    #[error("Invalid JWT clock skew configuration: {0}")]
    InvalidJwtClockSkew(String),

    #[error("Invalid bcrypt cost configuration: {0}")]
    InvalidBcryptCost(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    #[error("Base64 decode error: {0}")]
    Base64Error(#[from] base64::DecodeError),
}

/// Parse an optional numeric variable, enforcing an inclusive range.
fn parse_in_range<T>(
    vars: &HashMap<String, String>,
    name: &str,
    default: T,
    range: RangeInclusive<T>,
    err: fn(String) -> ConfigError,
) -> Result<T, ConfigError>
where
    T: FromStr + PartialOrd + fmt::Display + Copy,
    T::Err: fmt::Display,
{
    let Some(value_str) = vars.get(name) else {
        return Ok(default);
    };

    let value: T = value_str.trim().parse().map_err(|e| {
        err(format!(
            "{name} must be a valid integer, got '{value_str}': {e}"
        ))
    })?;

    if !range.contains(&value) {
        return Err(err(format!(
            "{name} must be between {} and {}, got {value}",
            range.start(),
            range.end()
        )));
    }

    Ok(value)
}

fn decode_key(vars: &HashMap<String, String>, name: &str) -> Result<Option<Vec<u8>>, ConfigError> {
    match vars.get(name) {
        Some(encoded) => Ok(Some(general_purpose::STANDARD.decode(encoded.trim())?)),
        None => Ok(None),
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let database_url = vars
            .get("DATABASE_URL")
            .ok_or_else(|| ConfigError::MissingEnvVar("DATABASE_URL".to_string()))?
            .clone();

        let redis_url = vars
            .get("REDIS_URL")
            .filter(|url| !url.trim().is_empty())
            .cloned();

        let bind_address = vars
            .get("BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        let jwt_signing_algorithm = match vars.get("JWT_SIGNING_ALGORITHM") {
            Some(value) => value.parse()?,
            None => SigningAlgorithm::Hs256,
        };

        let jwt_secret_key = decode_key(vars, "JWT_SECRET_KEY")?;
        let jwt_signing_key_pkcs8 = decode_key(vars, "JWT_SIGNING_KEY_PKCS8")?;

        match jwt_signing_algorithm {
            SigningAlgorithm::Hs256 => {
                let secret = jwt_secret_key
                    .as_ref()
                    .ok_or_else(|| ConfigError::MissingEnvVar("JWT_SECRET_KEY".to_string()))?;
                if secret.len() < MIN_HMAC_SECRET_BYTES {
                    return Err(ConfigError::InvalidSigningKey(format!(
                        "JWT_SECRET_KEY must decode to at least {MIN_HMAC_SECRET_BYTES} bytes, got {}",
                        secret.len()
                    )));
                }
            }
            SigningAlgorithm::EdDsa => {
                if jwt_signing_key_pkcs8.is_none() {
                    return Err(ConfigError::MissingEnvVar(
                        "JWT_SIGNING_KEY_PKCS8".to_string(),
                    ));
                }
            }
        }

        let access_token_ttl_seconds = parse_in_range(
            vars,
            "ACCESS_TOKEN_TTL_SECONDS",
            DEFAULT_ACCESS_TOKEN_TTL_SECONDS,
            ACCESS_TOKEN_TTL_RANGE,
            ConfigError::InvalidTokenLifetime,
        )?;

        let refresh_token_ttl_days = parse_in_range(
            vars,
            "REFRESH_TOKEN_TTL_DAYS",
            DEFAULT_REFRESH_TOKEN_TTL_DAYS,
            REFRESH_TOKEN_TTL_DAYS_RANGE,
            ConfigError::InvalidTokenLifetime,
        )?;

        let jwt_clock_skew_seconds = parse_in_range(
            vars,
            "JWT_CLOCK_SKEW_SECONDS",
            DEFAULT_CLOCK_SKEW.as_secs(),
            0..=MAX_CLOCK_SKEW.as_secs(),
            ConfigError::InvalidJwtClockSkew,
        )?;

        let bcrypt_cost = parse_in_range(
            vars,
            "BCRYPT_COST",
            DEFAULT_BCRYPT_COST,
            MIN_BCRYPT_COST..=MAX_BCRYPT_COST,
            ConfigError::InvalidBcryptCost,
        )?;

        let password_min_length = parse_in_range(
            vars,
            "PASSWORD_MIN_LENGTH",
            DEFAULT_PASSWORD_MIN_LENGTH,
            1..=MAX_PASSWORD_LENGTH,
            ConfigError::InvalidValue,
        )?;

        let allowed_origins = vars
            .get("ALLOWED_ORIGINS")
            .map_or(DEFAULT_ALLOWED_ORIGINS, String::as_str)
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(ToString::to_string)
            .collect();

        let revocation_purge_interval_seconds = parse_in_range(
            vars,
            "REVOCATION_PURGE_INTERVAL_SECONDS",
            DEFAULT_REVOCATION_PURGE_INTERVAL_SECONDS,
            1..=u64::MAX,
            ConfigError::InvalidValue,
        )?;

        let db_max_connections = parse_in_range(
            vars,
            "DB_MAX_CONNECTIONS",
            DEFAULT_DB_MAX_CONNECTIONS,
            1..=u32::MAX,
            ConfigError::InvalidValue,
        )?;

        Ok(Config {
            database_url,
            redis_url,
            bind_address,
            jwt_signing_algorithm,
            jwt_secret_key: jwt_secret_key.map(|k| SecretBox::new(Box::new(k))),
            jwt_signing_key_pkcs8: jwt_signing_key_pkcs8.map(|k| SecretBox::new(Box::new(k))),
            access_token_ttl_seconds,
            refresh_token_ttl_days,
            jwt_clock_skew_seconds,
            bcrypt_cost,
            password_min_length,
            allowed_origins,
            revocation_purge_interval_seconds,
            db_max_connections,
        })
    }
}
