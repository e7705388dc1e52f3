//! Software platform authenticator
//!
//! Generates P-256 credentials with `ring` and produces the same structures a
//! browser returns: client data JSON, authenticator data, "none" attestation
//! objects and DER-encoded ES256 assertion signatures. Credentials live in memory
//! for the lifetime of the authenticator.

use async_trait::async_trait;
use ring::rand::{SecureRandom, SystemRandom};
use ring::signature::{EcdsaKeyPair, KeyPair, ECDSA_P256_SHA256_ASN1_SIGNING};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Mutex;

use crate::ceremony::{PlatformAuthenticator, PlatformError};
use crate::webauthn::{
    encode_b64url, encode_none_attestation, sec1_to_cose_key, sha256, AttestedCredentialData,
    AuthenticationCredential, AuthenticationOptions, AuthenticatorAssertionResponse,
    AuthenticatorAttestationResponse, AuthenticatorData, AuthenticatorFlags, CeremonyKind,
    RegistrationCredential, RegistrationOptions, WebAuthnError, WebAuthnSettings,
    COSE_ALG_ES256, PUBLIC_KEY_TYPE,
};

const CREDENTIAL_ID_LEN: usize = 16;

/// What the authenticator does when asked for a ceremony
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthenticatorBehavior {
    /// Perform the ceremony
    Cooperative,
    /// The user dismisses the prompt
    UserCancels,
    /// The platform refuses the request
    Decline,
    /// Never complete
    Hang,
}

struct SoftwareCredential {
    id: Vec<u8>,
    rp_id: String,
    user_handle: String,
    key_pair: EcdsaKeyPair,
    sign_count: u32,
}

/// In-memory platform authenticator with real ES256 keys
pub struct SoftwareAuthenticator {
    rp_id: String,
    origin: String,
    behavior: AuthenticatorBehavior,
    rng: SystemRandom,
    credentials: Mutex<Vec<SoftwareCredential>>,
    invocations: AtomicUsize,
}

impl std::fmt::Debug for SoftwareAuthenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SoftwareAuthenticator")
            .field("rp_id", &self.rp_id)
            .field("origin", &self.origin)
            .field("behavior", &self.behavior)
            .finish_non_exhaustive()
    }
}

impl SoftwareAuthenticator {
    /// Cooperative authenticator for a page served from `origin`
    #[must_use]
    pub fn new(rp_id: &str, origin: &str) -> Self {
        Self {
            rp_id: rp_id.to_string(),
            origin: origin.to_string(),
            behavior: AuthenticatorBehavior::Cooperative,
            rng: SystemRandom::new(),
            credentials: Mutex::new(Vec::new()),
            invocations: AtomicUsize::new(0),
        }
    }

    /// Cooperative authenticator matching a relying party configuration
    #[must_use]
    pub fn for_settings(settings: &WebAuthnSettings) -> Self {
        Self::new(&settings.rp_id, &settings.rp_origin)
    }

    #[must_use]
    pub fn with_behavior(mut self, behavior: AuthenticatorBehavior) -> Self {
        self.behavior = behavior;
        self
    }

    /// Number of ceremonies the authenticator was asked to perform
    pub fn invocations(&self) -> usize {
        self.invocations.load(Ordering::SeqCst)
    }

    /// Number of credentials created so far
    pub async fn credential_count(&self) -> usize {
        self.credentials.lock().await.len()
    }

    async fn prompt(&self) -> Result<(), PlatformError> {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        match self.behavior {
            AuthenticatorBehavior::Cooperative => Ok(()),
            AuthenticatorBehavior::UserCancels => Err(PlatformError::Cancelled),
            AuthenticatorBehavior::Decline => Err(PlatformError::NotAllowed(
                "user verification was declined".to_string(),
            )),
            AuthenticatorBehavior::Hang => std::future::pending().await,
        }
    }

    fn client_data_json(&self, kind: CeremonyKind, challenge: &str) -> Vec<u8> {
        json!({
            "type": kind.client_data_type(),
            "challenge": challenge,
            "origin": self.origin,
            "crossOrigin": false,
        })
        .to_string()
        .into_bytes()
    }

    fn generate_key_pair(&self) -> Result<EcdsaKeyPair, PlatformError> {
        let pkcs8 = EcdsaKeyPair::generate_pkcs8(&ECDSA_P256_SHA256_ASN1_SIGNING, &self.rng)
            .map_err(|_| PlatformError::Unsupported("key generation failed".to_string()))?;
        EcdsaKeyPair::from_pkcs8(&ECDSA_P256_SHA256_ASN1_SIGNING, pkcs8.as_ref(), &self.rng)
            .map_err(|e| PlatformError::Unsupported(format!("key rejected: {e}")))
    }

    fn generate_credential_id(&self) -> Result<Vec<u8>, PlatformError> {
        let mut id = vec![0u8; CREDENTIAL_ID_LEN];
        self.rng
            .fill(&mut id)
            .map_err(|_| PlatformError::Unsupported("random generation failed".to_string()))?;
        Ok(id)
    }
}

fn unsupported(error: WebAuthnError) -> PlatformError {
    PlatformError::Unsupported(error.to_string())
}

#[async_trait]
impl PlatformAuthenticator for SoftwareAuthenticator {
    async fn create_credential(
        &self,
        options: &RegistrationOptions,
    ) -> Result<RegistrationCredential, PlatformError> {
        self.prompt().await?;

        if !options
            .pub_key_cred_params
            .iter()
            .any(|param| param.alg == COSE_ALG_ES256)
        {
            return Err(PlatformError::Unsupported(
                "no supported public key algorithm".to_string(),
            ));
        }
        if options.rp.id != self.rp_id {
            return Err(PlatformError::NotAllowed(format!(
                "relying party {} is not valid for this origin",
                options.rp.id
            )));
        }

        let mut credentials = self.credentials.lock().await;
        let excluded = credentials.iter().any(|existing| {
            existing.rp_id == options.rp.id
                && options
                    .exclude_credentials
                    .iter()
                    .any(|descriptor| descriptor.id == encode_b64url(&existing.id))
        });
        if excluded {
            return Err(PlatformError::NotAllowed(
                "a credential for this account already exists on this device".to_string(),
            ));
        }

        let key_pair = self.generate_key_pair()?;
        let credential_id = self.generate_credential_id()?;
        let public_key_cose =
            sec1_to_cose_key(key_pair.public_key().as_ref()).map_err(unsupported)?;

        let auth_data = AuthenticatorData {
            rp_id_hash: sha256(options.rp.id.as_bytes()),
            flags: AuthenticatorFlags(
                AuthenticatorFlags::USER_PRESENT
                    | AuthenticatorFlags::USER_VERIFIED
                    | AuthenticatorFlags::ATTESTED_CREDENTIAL_DATA,
            ),
            sign_count: 0,
            attested_credential: Some(AttestedCredentialData {
                aaguid: [0u8; 16],
                credential_id: credential_id.clone(),
                public_key_cose,
            }),
        };
        let attestation_object =
            encode_none_attestation(&auth_data.to_bytes()).map_err(unsupported)?;
        let client_data = self.client_data_json(CeremonyKind::Registration, &options.challenge);

        let id = encode_b64url(&credential_id);
        credentials.push(SoftwareCredential {
            id: credential_id,
            rp_id: options.rp.id.clone(),
            user_handle: options.user.id.clone(),
            key_pair,
            sign_count: 0,
        });

        Ok(RegistrationCredential {
            id: id.clone(),
            raw_id: id,
            response: AuthenticatorAttestationResponse {
                client_data_json: encode_b64url(&client_data),
                attestation_object: encode_b64url(&attestation_object),
            },
            r#type: PUBLIC_KEY_TYPE.to_string(),
            client_extension_results: None,
        })
    }

    async fn get_assertion(
        &self,
        options: &AuthenticationOptions,
    ) -> Result<AuthenticationCredential, PlatformError> {
        self.prompt().await?;

        let rp_id = options.rp_id.as_deref().unwrap_or(&self.rp_id);
        let mut credentials = self.credentials.lock().await;
        let credential = credentials
            .iter_mut()
            .find(|candidate| {
                candidate.rp_id == rp_id
                    && (options.allow_credentials.is_empty()
                        || options
                            .allow_credentials
                            .iter()
                            .any(|descriptor| descriptor.id == encode_b64url(&candidate.id)))
            })
            .ok_or(PlatformError::NoMatchingCredential)?;

        credential.sign_count += 1;
        let auth_data = AuthenticatorData {
            rp_id_hash: sha256(rp_id.as_bytes()),
            flags: AuthenticatorFlags(
                AuthenticatorFlags::USER_PRESENT | AuthenticatorFlags::USER_VERIFIED,
            ),
            sign_count: credential.sign_count,
            attested_credential: None,
        }
        .to_bytes();
        let client_data = self.client_data_json(CeremonyKind::Authentication, &options.challenge);

        let mut signed = auth_data.clone();
        signed.extend_from_slice(&sha256(&client_data));
        let signature = credential
            .key_pair
            .sign(&self.rng, &signed)
            .map_err(|_| PlatformError::Unsupported("signing failed".to_string()))?;

        let id = encode_b64url(&credential.id);
        Ok(AuthenticationCredential {
            id: id.clone(),
            raw_id: id,
            response: AuthenticatorAssertionResponse {
                client_data_json: encode_b64url(&client_data),
                authenticator_data: encode_b64url(&auth_data),
                signature: encode_b64url(signature.as_ref()),
                user_handle: Some(credential.user_handle.clone()),
            },
            r#type: PUBLIC_KEY_TYPE.to_string(),
            client_extension_results: None,
        })
    }
}
