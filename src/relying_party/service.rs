//! Reference verification gateway service
//!
//! Issues registration and authentication options with fresh challenges and
//! verifies the signed responses against the pending challenge of the user.
//! A response that fails verification yields `{"verified": false}`; only
//! unknown users, malformed requests and internal faults are errors.

use async_trait::async_trait;
use chrono::{Duration, Utc};

use crate::ceremony::{GatewayError, VerificationGateway};
use crate::utils::logging::LoggingHelper;
use crate::webauthn::{
    generate_challenge, verify_assertion, verify_attestation, AuthenticationCredential,
    AuthenticationOptions, AuthenticatorSelectionCriteria, CeremonyKind,
    PublicKeyCredentialDescriptor, PublicKeyCredentialParameters, RegistrationCredential,
    RegistrationOptions, RelyingParty, UserEntity, VerificationVerdict, VerifyRequest,
    WebAuthnSettings, COSE_ALG_ES256, PUBLIC_KEY_TYPE,
};

use super::errors::RelyingPartyError;
use super::store::{CredentialStore, PendingChallenge, StoredCredential};

/// Relying party service backing the four gateway endpoints
#[derive(Debug, Clone)]
pub struct RelyingPartyService {
    settings: WebAuthnSettings,
    store: CredentialStore,
}

impl RelyingPartyService {
    #[must_use]
    pub fn new(settings: WebAuthnSettings) -> Self {
        Self::with_store(settings, CredentialStore::new())
    }

    #[must_use]
    pub fn with_store(settings: WebAuthnSettings, store: CredentialStore) -> Self {
        Self { settings, store }
    }

    #[must_use]
    pub fn settings(&self) -> &WebAuthnSettings {
        &self.settings
    }

    #[must_use]
    pub fn store(&self) -> &CredentialStore {
        &self.store
    }

    /// Issue registration options, creating the user on first sight
    ///
    /// # Errors
    ///
    /// Returns `RelyingPartyError::InvalidRequest` for an empty email and
    /// `RelyingPartyError::Internal` if no challenge can be generated
    pub async fn registration_options(
        &self,
        email: &str,
    ) -> Result<RegistrationOptions, RelyingPartyError> {
        let email = normalize_email(email)?;
        self.store
            .prune_abandoned(Utc::now(), self.challenge_ttl(), email)
            .await;
        let user = self.store.get_or_create_user(email).await;
        let challenge = self.issue_challenge(email, CeremonyKind::Registration).await?;

        Ok(RegistrationOptions {
            challenge,
            rp: RelyingParty {
                id: self.settings.rp_id.clone(),
                name: self.settings.rp_name.clone(),
            },
            user: UserEntity {
                id: user.user_handle,
                name: email.to_string(),
                display_name: email.to_string(),
            },
            pub_key_cred_params: vec![PublicKeyCredentialParameters {
                r#type: PUBLIC_KEY_TYPE.to_string(),
                alg: COSE_ALG_ES256,
            }],
            timeout: Some(self.settings.timeout_millis()),
            attestation: Some("none".to_string()),
            authenticator_selection: Some(AuthenticatorSelectionCriteria {
                authenticator_attachment: self.settings.authenticator_attachment.clone(),
                resident_key: Some("preferred".to_string()),
                require_resident_key: false,
                user_verification: Some(self.settings.user_verification.clone()),
            }),
            exclude_credentials: user
                .credentials
                .iter()
                .map(|c| PublicKeyCredentialDescriptor::public_key(&c.credential_id))
                .collect(),
        })
    }

    /// Verify an attestation and store the new credential on success
    ///
    /// # Errors
    ///
    /// Returns `RelyingPartyError::UnknownUser` if no options were ever issued for the email
    pub async fn verify_registration(
        &self,
        request: &VerifyRequest<RegistrationCredential>,
    ) -> Result<VerificationVerdict, RelyingPartyError> {
        let email = normalize_email(&request.email)?;
        let pending = self.store.take_pending(email).await?;

        let issued = match self.check_pending(pending, CeremonyKind::Registration, &request.challenge)
        {
            Ok(issued) => issued,
            Err(reason) => return Ok(reject(CeremonyKind::Registration, email, reason)),
        };

        let registration = match verify_attestation(&request.response, &issued, &self.settings) {
            Ok(registration) => registration,
            Err(e) => return Ok(reject(CeremonyKind::Registration, email, e.to_string())),
        };

        let credential_id = registration.credential_id.clone();
        let stored = StoredCredential {
            credential_id: registration.credential_id,
            public_key_cose: registration.public_key_cose,
            sign_count: registration.sign_count,
            user_verified: registration.user_verified,
            created_at: Utc::now(),
            last_used_at: None,
        };
        if !self.store.add_credential(email, stored).await {
            return Ok(reject(
                CeremonyKind::Registration,
                email,
                "Credential already registered".to_string(),
            ));
        }

        LoggingHelper::log_credential_registered(email, &credential_id);
        Ok(VerificationVerdict::verified())
    }

    /// Issue authentication options listing the user's credentials
    ///
    /// # Errors
    ///
    /// Returns `RelyingPartyError::UnknownUser` or `RelyingPartyError::NoCredentials`
    /// if there is nothing to authenticate with
    pub async fn authentication_options(
        &self,
        email: &str,
    ) -> Result<AuthenticationOptions, RelyingPartyError> {
        let email = normalize_email(email)?;
        let user = self
            .store
            .user(email)
            .await
            .ok_or_else(|| RelyingPartyError::UnknownUser(email.to_string()))?;
        if user.credentials.is_empty() {
            return Err(RelyingPartyError::NoCredentials(email.to_string()));
        }

        let challenge = self
            .issue_challenge(email, CeremonyKind::Authentication)
            .await?;

        Ok(AuthenticationOptions {
            challenge,
            timeout: Some(self.settings.timeout_millis()),
            rp_id: Some(self.settings.rp_id.clone()),
            allow_credentials: user
                .credentials
                .iter()
                .map(|c| PublicKeyCredentialDescriptor::public_key(&c.credential_id))
                .collect(),
            user_verification: Some(self.settings.user_verification.clone()),
        })
    }

    /// Verify an assertion against the stored credential and advance its counter
    ///
    /// # Errors
    ///
    /// Returns `RelyingPartyError::UnknownUser` if the email is not known
    pub async fn verify_authentication(
        &self,
        request: &VerifyRequest<AuthenticationCredential>,
    ) -> Result<VerificationVerdict, RelyingPartyError> {
        let email = normalize_email(&request.email)?;
        let pending = self.store.take_pending(email).await?;

        let issued =
            match self.check_pending(pending, CeremonyKind::Authentication, &request.challenge) {
                Ok(issued) => issued,
                Err(reason) => return Ok(reject(CeremonyKind::Authentication, email, reason)),
            };

        let credential_id = request.response.id.trim_end_matches('=');
        let Some(stored) = self
            .store
            .user(email)
            .await
            .and_then(|user| user.credential(credential_id).cloned())
        else {
            return Ok(reject(
                CeremonyKind::Authentication,
                email,
                "Credential not found".to_string(),
            ));
        };

        let sign_count = match verify_assertion(
            &request.response,
            &issued,
            &self.settings,
            &stored.public_key_cose,
            stored.sign_count,
        ) {
            Ok(sign_count) => sign_count,
            Err(e) => return Ok(reject(CeremonyKind::Authentication, email, e.to_string())),
        };

        self.store
            .record_usage(email, &stored.credential_id, sign_count)
            .await;
        LoggingHelper::log_authentication_verified(email, &stored.credential_id, sign_count);
        Ok(VerificationVerdict::verified())
    }

    async fn issue_challenge(
        &self,
        email: &str,
        kind: CeremonyKind,
    ) -> Result<String, RelyingPartyError> {
        let challenge = generate_challenge()?;
        if !self
            .store
            .set_pending(email, PendingChallenge::new(challenge.clone(), kind))
            .await
        {
            return Err(RelyingPartyError::UnknownUser(email.to_string()));
        }
        LoggingHelper::log_challenge_issued(kind, email);
        Ok(challenge)
    }

    /// Return the issued challenge if it is usable for this verify call
    fn check_pending(
        &self,
        pending: Option<PendingChallenge>,
        kind: CeremonyKind,
        supplied: &str,
    ) -> Result<String, String> {
        let Some(pending) = pending else {
            return Err("No pending challenge".to_string());
        };
        if pending.kind != kind {
            return Err(format!("Pending challenge was issued for {}", pending.kind));
        }
        if pending.is_expired_at(Utc::now(), self.challenge_ttl()) {
            return Err("Challenge expired".to_string());
        }
        if supplied.trim_end_matches('=') != pending.challenge {
            return Err("Challenge does not match the issued challenge".to_string());
        }
        Ok(pending.challenge)
    }

    fn challenge_ttl(&self) -> Duration {
        let seconds = u32::try_from(self.settings.timeout_seconds).unwrap_or(u32::MAX);
        Duration::seconds(i64::from(seconds))
    }
}

fn normalize_email(email: &str) -> Result<&str, RelyingPartyError> {
    let email = email.trim();
    if email.is_empty() {
        return Err(RelyingPartyError::InvalidRequest(
            "email is required".to_string(),
        ));
    }
    Ok(email)
}

fn reject(kind: CeremonyKind, email: &str, reason: String) -> VerificationVerdict {
    LoggingHelper::log_verification_rejected(kind, email, &reason);
    VerificationVerdict::rejected(reason)
}

/// In-process gateway: errors surface as the HTTP status and body the handlers would send
#[async_trait]
impl VerificationGateway for RelyingPartyService {
    async fn registration_options(&self, email: &str) -> Result<RegistrationOptions, GatewayError> {
        RelyingPartyService::registration_options(self, email)
            .await
            .map_err(into_gateway_error)
    }

    async fn verify_registration(
        &self,
        request: &VerifyRequest<RegistrationCredential>,
    ) -> Result<VerificationVerdict, GatewayError> {
        RelyingPartyService::verify_registration(self, request)
            .await
            .map_err(into_gateway_error)
    }

    async fn authentication_options(
        &self,
        email: &str,
    ) -> Result<AuthenticationOptions, GatewayError> {
        RelyingPartyService::authentication_options(self, email)
            .await
            .map_err(into_gateway_error)
    }

    async fn verify_authentication(
        &self,
        request: &VerifyRequest<AuthenticationCredential>,
    ) -> Result<VerificationVerdict, GatewayError> {
        RelyingPartyService::verify_authentication(self, request)
            .await
            .map_err(into_gateway_error)
    }
}

fn into_gateway_error(error: RelyingPartyError) -> GatewayError {
    use actix_web::ResponseError;

    GatewayError::Status {
        status: error.status_code().as_u16(),
        body: serde_json::json!({
            "error": error.error_code(),
            "message": error.to_string(),
        })
        .to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ceremony::PlatformAuthenticator;
    use crate::testing::authenticator::SoftwareAuthenticator;
    use crate::testing::fixtures::TestFixtures;
    use crate::webauthn::{decode_b64url, encode_b64url, AuthenticatorData};

    const ALICE: &str = "alice@example.com";

    fn service() -> RelyingPartyService {
        RelyingPartyService::new(TestFixtures::webauthn_settings())
    }

    fn authenticator() -> SoftwareAuthenticator {
        SoftwareAuthenticator::for_settings(&TestFixtures::webauthn_settings())
    }

    async fn register(service: &RelyingPartyService, authenticator: &SoftwareAuthenticator) {
        let options = service.registration_options(ALICE).await.unwrap();
        let response = authenticator.create_credential(&options).await.unwrap();
        let verdict = service
            .verify_registration(&VerifyRequest {
                email: ALICE.to_string(),
                response,
                challenge: options.challenge,
            })
            .await
            .unwrap();
        assert!(verdict.verified, "registration rejected: {:?}", verdict.reason);
    }

    async fn assertion(
        service: &RelyingPartyService,
        authenticator: &SoftwareAuthenticator,
    ) -> (AuthenticationOptions, AuthenticationCredential) {
        let options = service.authentication_options(ALICE).await.unwrap();
        let response = authenticator.get_assertion(&options).await.unwrap();
        (options, response)
    }

    #[tokio::test]
    async fn test_registration_options_shape() {
        let service = service();
        let options = service.registration_options(ALICE).await.unwrap();

        assert_eq!(options.rp.id, "localhost");
        assert_eq!(options.user.name, ALICE);
        assert_eq!(options.pub_key_cred_params[0].alg, COSE_ALG_ES256);
        assert_eq!(options.attestation.as_deref(), Some("none"));
        assert_eq!(options.timeout, Some(60_000));
        assert!(options.exclude_credentials.is_empty());
        // 32 random bytes encode to 43 Base64URL characters
        assert_eq!(options.challenge.len(), 43);

        let again = service.registration_options(ALICE).await.unwrap();
        assert_ne!(options.challenge, again.challenge);
        assert_eq!(options.user.id, again.user.id);
    }

    #[tokio::test]
    async fn test_register_then_authenticate() {
        let service = service();
        let authenticator = authenticator();
        register(&service, &authenticator).await;

        let (options, response) = assertion(&service, &authenticator).await;
        assert_eq!(options.allow_credentials.len(), 1);
        let credential_id = response.id.clone();
        let verdict = service
            .verify_authentication(&VerifyRequest {
                email: ALICE.to_string(),
                response,
                challenge: options.challenge,
            })
            .await
            .unwrap();

        assert_eq!(verdict, VerificationVerdict::verified());
        let user = service.store().user(ALICE).await.unwrap();
        let stored = user.credential(&credential_id).unwrap();
        assert_eq!(stored.sign_count, 1);
        assert!(stored.last_used_at.is_some());
    }

    #[tokio::test]
    async fn test_registered_credentials_are_excluded() {
        let service = service();
        let authenticator = authenticator();
        register(&service, &authenticator).await;

        let options = service.registration_options(ALICE).await.unwrap();
        assert_eq!(options.exclude_credentials.len(), 1);
    }

    #[tokio::test]
    async fn test_consumed_challenge_cannot_be_replayed() {
        let service = service();
        let authenticator = authenticator();
        register(&service, &authenticator).await;

        let (options, response) = assertion(&service, &authenticator).await;
        let request = VerifyRequest {
            email: ALICE.to_string(),
            response,
            challenge: options.challenge,
        };
        assert!(service.verify_authentication(&request).await.unwrap().verified);

        let replay = service.verify_authentication(&request).await.unwrap();
        assert!(!replay.verified);
        assert_eq!(replay.reason.as_deref(), Some("No pending challenge"));
    }

    #[tokio::test]
    async fn test_stale_challenge_is_rejected() {
        let service = service();
        let authenticator = authenticator();
        register(&service, &authenticator).await;

        let (stale_options, stale_response) = assertion(&service, &authenticator).await;
        // A newer options call replaces the pending challenge
        service.authentication_options(ALICE).await.unwrap();

        let verdict = service
            .verify_authentication(&VerifyRequest {
                email: ALICE.to_string(),
                response: stale_response,
                challenge: stale_options.challenge,
            })
            .await
            .unwrap();
        assert!(!verdict.verified);
    }

    #[tokio::test]
    async fn test_supplied_challenge_must_match_issued() {
        let service = service();
        let authenticator = authenticator();
        register(&service, &authenticator).await;

        let (_, response) = assertion(&service, &authenticator).await;
        let verdict = service
            .verify_authentication(&VerifyRequest {
                email: ALICE.to_string(),
                response,
                challenge: "abc123".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(
            verdict.reason.as_deref(),
            Some("Challenge does not match the issued challenge")
        );
    }

    #[tokio::test]
    async fn test_signed_challenge_must_match_issued() {
        let service = service();
        let authenticator = authenticator();
        register(&service, &authenticator).await;

        let options = service.authentication_options(ALICE).await.unwrap();
        let forged = AuthenticationOptions {
            challenge: encode_b64url(b"some other challenge"),
            ..options.clone()
        };
        let response = authenticator.get_assertion(&forged).await.unwrap();

        let verdict = service
            .verify_authentication(&VerifyRequest {
                email: ALICE.to_string(),
                response,
                challenge: options.challenge,
            })
            .await
            .unwrap();
        assert!(!verdict.verified);
        assert!(verdict.reason.unwrap().contains("Challenge mismatch"));
    }

    #[tokio::test]
    async fn test_tampered_signature_is_rejected() {
        let service = service();
        let authenticator = authenticator();
        register(&service, &authenticator).await;

        let (options, mut response) = assertion(&service, &authenticator).await;
        let mut signature = decode_b64url(&response.response.signature, "signature").unwrap();
        let last = signature.len() - 1;
        signature[last] ^= 0x01;
        response.response.signature = encode_b64url(&signature);

        let verdict = service
            .verify_authentication(&VerifyRequest {
                email: ALICE.to_string(),
                response,
                challenge: options.challenge,
            })
            .await
            .unwrap();
        assert!(!verdict.verified);
    }

    #[tokio::test]
    async fn test_wrong_origin_is_rejected() {
        let service = service();
        let authenticator = authenticator();
        register(&service, &authenticator).await;

        let phishing = SoftwareAuthenticator::for_settings(&WebAuthnSettings {
            rp_origin: "https://evil.example".to_string(),
            ..TestFixtures::webauthn_settings()
        });
        let options = service.registration_options("bob@example.com").await.unwrap();
        let response = phishing.create_credential(&options).await.unwrap();
        let verdict = service
            .verify_registration(&VerifyRequest {
                email: "bob@example.com".to_string(),
                response,
                challenge: options.challenge,
            })
            .await
            .unwrap();
        assert_eq!(verdict.reason.as_deref(), Some("Verification failed: Origin mismatch"));
    }

    #[tokio::test]
    async fn test_wrong_client_data_type_is_rejected() {
        let service = service();
        let authenticator = authenticator();
        register(&service, &authenticator).await;

        // Registration client data submitted to the authentication endpoint
        let (options, mut response) = assertion(&service, &authenticator).await;
        let registration = authenticator
            .create_credential(&TestFixtures::registration_options(&options.challenge))
            .await
            .unwrap();
        response.response.client_data_json = registration.response.client_data_json;

        let verdict = service
            .verify_authentication(&VerifyRequest {
                email: ALICE.to_string(),
                response,
                challenge: options.challenge,
            })
            .await
            .unwrap();
        assert!(verdict.reason.unwrap().contains("expected webauthn.get"));
    }

    #[tokio::test]
    async fn test_regressing_counter_is_rejected() {
        let service = service();
        let authenticator = authenticator();
        register(&service, &authenticator).await;

        let (options, response) = assertion(&service, &authenticator).await;
        let credential_id = response.id.clone();
        let signed_count = AuthenticatorData::parse(
            &decode_b64url(&response.response.authenticator_data, "authenticator data").unwrap(),
        )
        .unwrap()
        .sign_count;
        // Pretend a cloned authenticator already went further
        service
            .store()
            .record_usage(ALICE, &credential_id, signed_count + 5)
            .await;

        let verdict = service
            .verify_authentication(&VerifyRequest {
                email: ALICE.to_string(),
                response,
                challenge: options.challenge,
            })
            .await
            .unwrap();
        assert!(verdict.reason.unwrap().contains("Signature counter did not increase"));
    }

    #[tokio::test]
    async fn test_expired_challenge_is_rejected() {
        let service = RelyingPartyService::new(WebAuthnSettings {
            timeout_seconds: 0,
            ..TestFixtures::webauthn_settings()
        });
        let authenticator = authenticator();

        let options = service.registration_options(ALICE).await.unwrap();
        let response = authenticator.create_credential(&options).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;

        let verdict = service
            .verify_registration(&VerifyRequest {
                email: ALICE.to_string(),
                response,
                challenge: options.challenge,
            })
            .await
            .unwrap();
        assert_eq!(verdict.reason.as_deref(), Some("Challenge expired"));
    }

    #[tokio::test]
    async fn test_unfinished_registration_is_forgotten_after_expiry() {
        let service = RelyingPartyService::new(WebAuthnSettings {
            timeout_seconds: 0,
            ..TestFixtures::webauthn_settings()
        });

        service.registration_options(ALICE).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        service.registration_options("bob@example.com").await.unwrap();

        assert!(service.store().user(ALICE).await.is_none());
        assert!(service.store().user("bob@example.com").await.is_some());
    }

    #[tokio::test]
    async fn test_unknown_user_and_missing_credentials() {
        let service = service();
        assert!(matches!(
            service.authentication_options(ALICE).await,
            Err(RelyingPartyError::UnknownUser(_))
        ));

        service.registration_options(ALICE).await.unwrap();
        assert!(matches!(
            service.authentication_options(ALICE).await,
            Err(RelyingPartyError::NoCredentials(_))
        ));
        assert!(matches!(
            service.registration_options("  ").await,
            Err(RelyingPartyError::InvalidRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_in_process_gateway_reports_http_status() {
        let service = service();
        let result = VerificationGateway::authentication_options(&service, ALICE).await;
        match result {
            Err(GatewayError::Status { status, body }) => {
                assert_eq!(status, 404);
                assert!(body.contains("unknown_user"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
