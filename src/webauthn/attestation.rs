//! `WebAuthn` attestation and assertion verification
//!
//! This module verifies the signed structures returned by authenticators:
//! the client data shared by both ceremonies, "none" attestation objects during
//! registration and ES256 assertions during authentication.

use serde::{Deserialize, Serialize};

use super::authenticator_data::AuthenticatorData;
use super::cbor::{cose_key_to_sec1, decode_attestation_object};
use super::crypto::{decode_b64url, sha256, verify_es256_signature};
use super::errors::WebAuthnError;
use super::settings::WebAuthnSettings;
use super::types::{AuthenticationCredential, CeremonyKind, RegistrationCredential};

/// Collected client data as serialized by the platform
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ClientData {
    #[serde(rename = "type")]
    pub r#type: String,
    pub challenge: String,
    pub origin: String,
    #[serde(default)]
    pub cross_origin: bool,
}

/// Credential produced by a successful registration
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerifiedRegistration {
    pub credential_id: String, // Base64URL-encoded credential ID
    pub public_key_cose: Vec<u8>,
    pub sign_count: u32,
    pub user_verified: bool,
}

/// Verify client data JSON
///
/// # Arguments
/// * `client_data_json_b64` - Base64URL-encoded client data JSON
/// * `kind` - Ceremony the client data must belong to
/// * `expected_challenge` - Challenge issued by the relying party
/// * `expected_origin` - Origin the relying party is served from
///
/// # Errors
/// Returns `WebAuthnError::EncodingError` if the client data cannot be decoded and
/// `WebAuthnError::VerificationFailed` if type, challenge or origin do not match
pub fn verify_client_data(
    client_data_json_b64: &str,
    kind: CeremonyKind,
    expected_challenge: &str,
    expected_origin: &str,
) -> Result<ClientData, WebAuthnError> {
    let client_data_bytes = decode_b64url(client_data_json_b64, "client data")?;
    let client_data: ClientData = serde_json::from_slice(&client_data_bytes)
        .map_err(|_| WebAuthnError::EncodingError("Invalid client data JSON".to_string()))?;

    if client_data.r#type != kind.client_data_type() {
        return Err(WebAuthnError::VerificationFailed(format!(
            "Invalid type, expected {}",
            kind.client_data_type()
        )));
    }

    // The signed challenge is compared with what the relying party issued, never with a
    // value supplied next to the response
    if client_data.challenge.trim_end_matches('=') != expected_challenge.trim_end_matches('=') {
        return Err(WebAuthnError::VerificationFailed(
            "Challenge mismatch".to_string(),
        ));
    }

    if client_data.origin != expected_origin {
        return Err(WebAuthnError::VerificationFailed(
            "Origin mismatch".to_string(),
        ));
    }

    Ok(client_data)
}

/// Extract and verify the credential from a registration response
///
/// # Errors
/// Returns a `WebAuthnError` if client data, attestation format, RP ID hash, flags or
/// the credential public key are invalid
pub fn verify_attestation(
    credential: &RegistrationCredential,
    expected_challenge: &str,
    settings: &WebAuthnSettings,
) -> Result<VerifiedRegistration, WebAuthnError> {
    verify_client_data(
        &credential.response.client_data_json,
        CeremonyKind::Registration,
        expected_challenge,
        &settings.rp_origin,
    )?;

    let attestation_bytes =
        decode_b64url(&credential.response.attestation_object, "attestation object")?;
    let attestation = decode_attestation_object(&attestation_bytes)?;
    if attestation.fmt != "none" {
        return Err(WebAuthnError::NotSupported(format!(
            "Attestation format {}",
            attestation.fmt
        )));
    }

    let auth_data = AuthenticatorData::parse(&attestation.auth_data)?;
    verify_rp_and_presence(&auth_data, settings)?;

    let Some(attested) = auth_data.attested_credential else {
        return Err(WebAuthnError::VerificationFailed(
            "No attested credential data".to_string(),
        ));
    };

    let credential_id = super::crypto::encode_b64url(&attested.credential_id);
    if credential_id != credential.id.trim_end_matches('=') {
        return Err(WebAuthnError::VerificationFailed(
            "Credential ID does not match attested credential".to_string(),
        ));
    }

    // Reject keys we could not verify assertions with later
    cose_key_to_sec1(&attested.public_key_cose)?;

    Ok(VerifiedRegistration {
        credential_id,
        public_key_cose: attested.public_key_cose,
        sign_count: auth_data.sign_count,
        user_verified: auth_data.flags.user_verified(),
    })
}

/// Verify an assertion against a stored credential
///
/// Returns the new signature counter on success.
///
/// # Errors
/// Returns a `WebAuthnError` if client data, RP ID hash, flags, signature or the
/// signature counter are invalid
pub fn verify_assertion(
    credential: &AuthenticationCredential,
    expected_challenge: &str,
    settings: &WebAuthnSettings,
    public_key_cose: &[u8],
    stored_sign_count: u32,
) -> Result<u32, WebAuthnError> {
    verify_client_data(
        &credential.response.client_data_json,
        CeremonyKind::Authentication,
        expected_challenge,
        &settings.rp_origin,
    )?;

    let auth_data_bytes =
        decode_b64url(&credential.response.authenticator_data, "authenticator data")?;
    let auth_data = AuthenticatorData::parse(&auth_data_bytes)?;
    verify_rp_and_presence(&auth_data, settings)?;

    let client_data_bytes = decode_b64url(&credential.response.client_data_json, "client data")?;
    let mut signed = auth_data_bytes;
    signed.extend_from_slice(&sha256(&client_data_bytes));

    let signature = decode_b64url(&credential.response.signature, "signature")?;
    let public_key = cose_key_to_sec1(public_key_cose)?;
    verify_es256_signature(&public_key, &signed, &signature)?;

    // Authenticators without counters always report zero
    if (auth_data.sign_count != 0 || stored_sign_count != 0)
        && auth_data.sign_count <= stored_sign_count
    {
        return Err(WebAuthnError::VerificationFailed(format!(
            "Signature counter did not increase ({} <= {stored_sign_count})",
            auth_data.sign_count
        )));
    }

    Ok(auth_data.sign_count)
}

fn verify_rp_and_presence(
    auth_data: &AuthenticatorData,
    settings: &WebAuthnSettings,
) -> Result<(), WebAuthnError> {
    if auth_data.rp_id_hash != sha256(settings.rp_id.as_bytes()) {
        return Err(WebAuthnError::VerificationFailed(
            "RP ID hash mismatch".to_string(),
        ));
    }

    if !auth_data.flags.user_present() {
        return Err(WebAuthnError::VerificationFailed(
            "User presence flag not set".to_string(),
        ));
    }

    if settings.user_verification == "required" && !auth_data.flags.user_verified() {
        return Err(WebAuthnError::VerificationFailed(
            "User verification required".to_string(),
        ));
    }

    Ok(())
}
