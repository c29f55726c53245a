//! Token signing keys.
//!
//! The token service only sees `dyn TokenSigner`, so the algorithm can be
//! switched by configuration without touching issuance or verification.

use crate::config::{Config, SigningAlgorithm, MIN_HMAC_SECRET_BYTES};
use crate::errors::AuthError;
use common::secret::ExposeSecret;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey};
use ring::{
    rand::SystemRandom,
    signature::{Ed25519KeyPair, KeyPair},
};
use sha2::{Digest, Sha256};
use std::fmt;
use std::sync::Arc;

/// A single signing algorithm plus its key material.
pub trait TokenSigner: Send + Sync {
    /// The only algorithm tokens are signed and verified with.
    fn algorithm(&self) -> Algorithm;

    /// Key identifier placed in the JWT `kid` header.
    fn key_id(&self) -> &str;

    fn encoding_key(&self) -> &EncodingKey;

    fn decoding_key(&self) -> &DecodingKey;
}

/// Key id derived from public material: `prefix-` + first 8 bytes of SHA-256, hex.
fn derive_key_id(prefix: &str, material: &[u8]) -> String {
    let digest = Sha256::digest(material);
    format!("{prefix}-{}", hex::encode(digest.get(..8).unwrap_or_default()))
}

/// HS256 signer with a shared secret.
pub struct HmacSigner {
    key_id: String,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl HmacSigner {
    /// # Errors
    ///
    /// Returns `AuthError::Crypto` if the secret is shorter than 32 bytes.
    pub fn new(secret: &[u8]) -> Result<Self, AuthError> {
        if secret.len() < MIN_HMAC_SECRET_BYTES {
            return Err(AuthError::Crypto(format!(
                "HMAC secret must be at least {MIN_HMAC_SECRET_BYTES} bytes, got {}",
                secret.len()
            )));
        }

        let key_id = derive_key_id("hs256", &Sha256::digest(secret));

        Ok(Self {
            key_id,
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
        })
    }
}

impl TokenSigner for HmacSigner {
    fn algorithm(&self) -> Algorithm {
        Algorithm::HS256
    }

    fn key_id(&self) -> &str {
        &self.key_id
    }

    fn encoding_key(&self) -> &EncodingKey {
        &self.encoding_key
    }

    fn decoding_key(&self) -> &DecodingKey {
        &self.decoding_key
    }
}

impl fmt::Debug for HmacSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HmacSigner")
            .field("key_id", &self.key_id)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

/// EdDSA (Ed25519) signer backed by a PKCS#8 document.
pub struct Ed25519Signer {
    key_id: String,
    public_key: Vec<u8>,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl Ed25519Signer {
    /// Generate a fresh keypair using the system CSPRNG.
    ///
    /// Tokens signed with a generated key do not survive a restart.
    pub fn generate() -> Result<Self, AuthError> {
        let rng = SystemRandom::new();
        let pkcs8 = Ed25519KeyPair::generate_pkcs8(&rng)
            .map_err(|e| AuthError::Crypto(format!("Keypair generation failed: {e}")))?;
        Self::from_pkcs8(pkcs8.as_ref())
    }

    /// Load a keypair from a PKCS#8 v1 or v2 document.
    pub fn from_pkcs8(pkcs8: &[u8]) -> Result<Self, AuthError> {
        let key_pair = Ed25519KeyPair::from_pkcs8_maybe_unchecked(pkcs8)
            .map_err(|e| AuthError::Crypto(format!("Invalid Ed25519 private key: {e}")))?;

        let public_key = key_pair.public_key().as_ref().to_vec();
        let key_id = derive_key_id("ed25519", &public_key);

        Ok(Self {
            key_id,
            encoding_key: EncodingKey::from_ed_der(pkcs8),
            decoding_key: DecodingKey::from_ed_der(&public_key),
            public_key,
        })
    }

    /// Raw 32-byte public key.
    pub fn public_key(&self) -> &[u8] {
        &self.public_key
    }
}

impl TokenSigner for Ed25519Signer {
    fn algorithm(&self) -> Algorithm {
        Algorithm::EdDSA
    }

    fn key_id(&self) -> &str {
        &self.key_id
    }

    fn encoding_key(&self) -> &EncodingKey {
        &self.encoding_key
    }

    fn decoding_key(&self) -> &DecodingKey {
        &self.decoding_key
    }
}

impl fmt::Debug for Ed25519Signer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ed25519Signer")
            .field("key_id", &self.key_id)
            .field("private_key", &"[REDACTED]")
            .finish()
    }
}

/// Build the signer selected by configuration.
pub fn signer_from_config(config: &Config) -> Result<Arc<dyn TokenSigner>, AuthError> {
    match config.jwt_signing_algorithm {
        SigningAlgorithm::Hs256 => {
            let secret = config
                .jwt_secret_key
                .as_ref()
                .ok_or_else(|| AuthError::Crypto("JWT_SECRET_KEY is not configured".to_string()))?;
            Ok(Arc::new(HmacSigner::new(secret.expose_secret())?))
        }
        SigningAlgorithm::EdDsa => {
            let pkcs8 = config.jwt_signing_key_pkcs8.as_ref().ok_or_else(|| {
                AuthError::Crypto("JWT_SIGNING_KEY_PKCS8 is not configured".to_string())
            })?;
            Ok(Arc::new(Ed25519Signer::from_pkcs8(pkcs8.expose_secret())?))
        }
    }
}
