//! `WebAuthn` implementation
//!
//! This module provides the `WebAuthn` pieces shared by the ceremony client and the
//! reference verification gateway: wire types, client data and authenticator data
//! parsing, CBOR attestation decoding and ES256 signature verification.

mod attestation;
mod authenticator_data;
mod cbor;
mod crypto;
mod errors;
mod settings;
mod types;

// Re-exports for public use
pub use attestation::{
    verify_assertion, verify_attestation, verify_client_data, ClientData, VerifiedRegistration,
};
pub use authenticator_data::{AttestedCredentialData, AuthenticatorData, AuthenticatorFlags};
pub use cbor::{cose_key_to_sec1, encode_none_attestation, sec1_to_cose_key};
pub use crypto::{
    decode_b64url, encode_b64url, generate_challenge, generate_random_id, sha256,
    verify_es256_signature,
};
pub use errors::WebAuthnError;
pub use settings::WebAuthnSettings;
pub use types::*;
