//! `WebAuthn` core types
//!
//! This module defines the JSON structures exchanged between the ceremony client,
//! the platform authenticator and the verification gateway. Field names follow the
//! browser credential API (`camelCase`), binary values are Base64URL without padding.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Credential type used by every `WebAuthn` descriptor
pub const PUBLIC_KEY_TYPE: &str = "public-key";

/// COSE algorithm identifier for ECDSA P-256 with SHA-256
pub const COSE_ALG_ES256: i64 = -7;

/// The two ceremonies a relying party runs
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum CeremonyKind {
    /// Attestation: bind a new credential to an identity
    Registration,
    /// Assertion: prove possession of a registered credential
    Authentication,
}

impl CeremonyKind {
    /// Client data `type` the platform embeds for this ceremony
    #[must_use]
    pub fn client_data_type(self) -> &'static str {
        match self {
            CeremonyKind::Registration => "webauthn.create",
            CeremonyKind::Authentication => "webauthn.get",
        }
    }

    /// Path segment of the gateway endpoints for this ceremony
    #[must_use]
    pub fn endpoint_segment(self) -> &'static str {
        match self {
            CeremonyKind::Registration => "register",
            CeremonyKind::Authentication => "auth",
        }
    }
}

impl fmt::Display for CeremonyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CeremonyKind::Registration => write!(f, "registration"),
            CeremonyKind::Authentication => write!(f, "authentication"),
        }
    }
}

/// `WebAuthn` registration options sent to the client
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationOptions {
    pub challenge: String, // Base64URL-encoded random challenge
    pub rp: RelyingParty,  // Relying party information
    pub user: UserEntity,  // User information
    pub pub_key_cred_params: Vec<PublicKeyCredentialParameters>, // Allowed algorithms
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u32>, // Timeout in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attestation: Option<String>, // "none", "indirect", "direct"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authenticator_selection: Option<AuthenticatorSelectionCriteria>,
    #[serde(default)]
    pub exclude_credentials: Vec<PublicKeyCredentialDescriptor>,
}

/// `WebAuthn` authentication options sent to the client
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticationOptions {
    pub challenge: String, // Base64URL-encoded random challenge
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u32>, // Timeout in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rp_id: Option<String>, // Relying party ID
    #[serde(default)]
    pub allow_credentials: Vec<PublicKeyCredentialDescriptor>, // Empty means discoverable
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_verification: Option<String>, // "required", "preferred", "discouraged"
}

/// `WebAuthn` relying party information
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct RelyingParty {
    pub id: String,   // Domain name (e.g., "example.com")
    pub name: String, // Display name
}

/// `WebAuthn` user entity
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserEntity {
    pub id: String,           // Base64URL-encoded user handle
    pub name: String,         // Username (e.g., email)
    pub display_name: String, // Display name
}

/// Public key credential parameters
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct PublicKeyCredentialParameters {
    #[serde(rename = "type")]
    pub r#type: String, // Always "public-key"
    pub alg: i64, // Algorithm identifier (-7 for ES256, -257 for RS256)
}

/// Authenticator selection criteria
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatorSelectionCriteria {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authenticator_attachment: Option<String>, // "platform", "cross-platform"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resident_key: Option<String>, // "required", "preferred", "discouraged"
    #[serde(default)]
    pub require_resident_key: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_verification: Option<String>,
}

/// Public key credential descriptor
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct PublicKeyCredentialDescriptor {
    #[serde(rename = "type")]
    pub r#type: String, // Always "public-key"
    pub id: String, // Base64URL-encoded credential ID
}

impl PublicKeyCredentialDescriptor {
    /// Descriptor for a public-key credential with the given Base64URL id
    #[must_use]
    pub fn public_key(id: &str) -> Self {
        Self {
            r#type: PUBLIC_KEY_TYPE.to_string(),
            id: id.to_string(),
        }
    }
}

/// Attestation produced by the platform during registration
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationCredential {
    pub id: String,     // Base64URL-encoded credential ID
    pub raw_id: String, // Base64URL-encoded raw credential ID
    pub response: AuthenticatorAttestationResponse,
    #[serde(rename = "type")]
    pub r#type: String, // Always "public-key"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_extension_results: Option<serde_json::Value>,
}

/// Assertion produced by the platform during authentication
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticationCredential {
    pub id: String,     // Base64URL-encoded credential ID
    pub raw_id: String, // Base64URL-encoded raw credential ID
    pub response: AuthenticatorAssertionResponse,
    #[serde(rename = "type")]
    pub r#type: String, // Always "public-key"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_extension_results: Option<serde_json::Value>,
}

/// Authenticator attestation response during registration
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatorAttestationResponse {
    #[serde(rename = "clientDataJSON")]
    pub client_data_json: String, // Base64URL-encoded client data JSON
    pub attestation_object: String, // Base64URL-encoded attestation object
}

/// Authenticator assertion response during authentication
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatorAssertionResponse {
    #[serde(rename = "clientDataJSON")]
    pub client_data_json: String, // Base64URL-encoded client data JSON
    pub authenticator_data: String, // Base64URL-encoded authenticator data
    pub signature: String,          // Base64URL-encoded DER signature
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_handle: Option<String>, // Base64URL-encoded user handle
}

/// Options request body: `{email}`
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct OptionsRequest {
    pub email: String,
}

/// Verification request body: `{email, response, challenge}`
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct VerifyRequest<R> {
    pub email: String,
    pub response: R,
    pub challenge: String, // The challenge issued with the options, echoed back
}

/// Verdict returned by the verification endpoints
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct VerificationVerdict {
    pub verified: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl VerificationVerdict {
    #[must_use]
    pub fn verified() -> Self {
        Self {
            verified: true,
            reason: None,
        }
    }

    #[must_use]
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self {
            verified: false,
            reason: Some(reason.into()),
        }
    }
}
