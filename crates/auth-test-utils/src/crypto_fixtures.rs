//! Deterministic cryptographic fixtures for testing
//!
//! Same seed, same key. Never use these outside tests.

use auth_service::crypto::{Ed25519Signer, HmacSigner};
use base64::engine::general_purpose;
use base64::Engine;
use ring::signature::{Ed25519KeyPair, KeyPair};
use thiserror::Error;

/// Test fixture error type
#[derive(Error, Debug)]
pub enum FixtureError {
    #[error("Cryptographic operation failed: {0}")]
    Crypto(String),
}

/// Fixed 32-byte HS256 secret.
pub fn test_hmac_secret() -> [u8; 32] {
    [0x5a; 32]
}

/// `JWT_SECRET_KEY` value for [`test_hmac_secret`].
pub fn test_hmac_secret_base64() -> String {
    general_purpose::STANDARD.encode(test_hmac_secret())
}

pub fn test_hmac_signer() -> HmacSigner {
    HmacSigner::new(&test_hmac_secret()).expect("fixed test secret is 32 bytes")
}

fn seed_bytes(seed: u8) -> [u8; 32] {
    let mut bytes = [0u8; 32];
    for (i, byte) in bytes.iter_mut().enumerate() {
        let i = i as u8;
        *byte = seed.wrapping_mul(31).wrapping_add(i.wrapping_mul(7));
    }
    bytes
}

/// PKCS#8 v1 DER document wrapping an Ed25519 seed (RFC 8410).
fn pkcs8_v1_from_seed(seed: &[u8; 32]) -> Vec<u8> {
    const PREFIX: [u8; 16] = [
        0x30, 0x2e, // SEQUENCE, 46 bytes
        0x02, 0x01, 0x00, // INTEGER 0 (v1)
        0x30, 0x05, 0x06, 0x03, 0x2b, 0x65, 0x70, // AlgorithmIdentifier id-Ed25519
        0x04, 0x22, 0x04, 0x20, // OCTET STRING { OCTET STRING (32 bytes) }
    ];
    let mut der = PREFIX.to_vec();
    der.extend_from_slice(seed);
    der
}

/// Deterministic Ed25519 key as `(raw_public_key, pkcs8_der)`.
pub fn test_ed25519_key(seed: u8) -> Result<(Vec<u8>, Vec<u8>), FixtureError> {
    let seed = seed_bytes(seed);
    let key_pair = Ed25519KeyPair::from_seed_unchecked(&seed)
        .map_err(|e| FixtureError::Crypto(format!("Failed to derive test keypair: {e:?}")))?;

    Ok((
        key_pair.public_key().as_ref().to_vec(),
        pkcs8_v1_from_seed(&seed),
    ))
}

/// `JWT_SIGNING_KEY_PKCS8` value for a seeded key.
pub fn test_ed25519_pkcs8_base64(seed: u8) -> Result<String, FixtureError> {
    let (_, pkcs8) = test_ed25519_key(seed)?;
    Ok(general_purpose::STANDARD.encode(pkcs8))
}

pub fn test_ed25519_signer(seed: u8) -> Result<Ed25519Signer, FixtureError> {
    let (_, pkcs8) = test_ed25519_key(seed)?;
    Ed25519Signer::from_pkcs8(&pkcs8).map_err(|e| FixtureError::Crypto(e.to_string()))
}
