//! `WebAuthn` error types

use thiserror::Error;

/// Errors raised while decoding or verifying `WebAuthn` structures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WebAuthnError {
    /// Base64, JSON or CBOR payload could not be decoded
    #[error("Encoding error: {0}")]
    EncodingError(String),
    /// A structure decoded correctly but failed a verification check
    #[error("Verification failed: {0}")]
    VerificationFailed(String),
    /// Algorithm, key type or attestation format is not supported
    #[error("Not supported: {0}")]
    NotSupported(String),
    /// Random generation or key handling failed
    #[error("Internal error: {0}")]
    InternalError(String),
}
