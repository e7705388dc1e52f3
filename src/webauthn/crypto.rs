//! `WebAuthn` cryptography operations
//!
//! This module provides the cryptographic operations needed for `WebAuthn`
//! such as signature verification and challenge generation.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use ring::digest;
use ring::rand::SecureRandom;
use ring::signature;

use super::errors::WebAuthnError;

/// Generate a secure random challenge
///
/// # Errors
/// Returns `WebAuthnError::InternalError` if the system random source fails
pub fn generate_challenge() -> Result<String, WebAuthnError> {
    // 32 bytes of random data (256 bits)
    generate_random_id(32)
}

/// Generate `len` random bytes encoded as Base64URL
///
/// # Errors
/// Returns `WebAuthnError::InternalError` if the system random source fails
pub fn generate_random_id(len: usize) -> Result<String, WebAuthnError> {
    let mut bytes = vec![0u8; len];
    ring::rand::SystemRandom::new()
        .fill(&mut bytes)
        .map_err(|_| WebAuthnError::InternalError("Failed to generate random bytes".to_string()))?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}

/// Encode bytes as Base64URL without padding
#[must_use]
pub fn encode_b64url(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Decode a Base64URL value; `what` names the field in the error
///
/// # Errors
/// Returns `WebAuthnError::EncodingError` if the value is not valid Base64URL
pub fn decode_b64url(value: &str, what: &str) -> Result<Vec<u8>, WebAuthnError> {
    URL_SAFE_NO_PAD
        .decode(value.trim_end_matches('='))
        .map_err(|_| WebAuthnError::EncodingError(format!("Invalid {what} encoding")))
}

/// Hash data using SHA-256
#[must_use]
pub fn sha256(data: &[u8]) -> Vec<u8> {
    digest::digest(&digest::SHA256, data).as_ref().to_vec()
}

/// Verify ES256 signature (ECDSA P-256 with SHA-256)
///
/// # Arguments
/// * `public_key` - Uncompressed SEC1 point (`0x04 || x || y`)
/// * `data` - The data that was signed
/// * `signature` - ASN.1 DER signature
///
/// # Errors
/// Returns `WebAuthnError::VerificationFailed` if the signature does not match
pub fn verify_es256_signature(
    public_key: &[u8],
    data: &[u8],
    signature: &[u8],
) -> Result<(), WebAuthnError> {
    signature::UnparsedPublicKey::new(&signature::ECDSA_P256_SHA256_ASN1, public_key)
        .verify(data, signature)
        .map_err(|_| WebAuthnError::VerificationFailed("Invalid signature".to_string()))
}
