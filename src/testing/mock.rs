//! Mock objects and scripted implementations for testing
//!
//! `MockGateway` issues fixed challenges and records what the client submits;
//! `MockPlatform` returns canned credentials or fails the way a browser would.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use crate::ceremony::{GatewayError, PlatformAuthenticator, PlatformError, VerificationGateway};
use crate::webauthn::{
    encode_b64url, AuthenticationCredential, AuthenticationOptions,
    AuthenticatorAssertionResponse, AuthenticatorAttestationResponse, CeremonyKind,
    RegistrationCredential, RegistrationOptions, VerificationVerdict, VerifyRequest,
    PUBLIC_KEY_TYPE,
};

use super::constants::{TEST_CREDENTIAL_ID, TEST_ORIGIN};
use super::fixtures::TestFixtures;

/// How a scripted gateway step misbehaves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fault {
    Status(u16),
    Hang,
    Malformed,
}

/// Scripted verification gateway
///
/// Accepts a submission when the configured verdict is positive and the echoed
/// challenge equals the one it issued. Each verify call takes the issued
/// challenge, so a replayed submission is not verified.
#[derive(Debug)]
pub struct MockGateway {
    challenge: String,
    verdict: bool,
    options_fault: Option<Fault>,
    verify_fault: Option<Fault>,
    issued: Mutex<Option<String>>,
    options_requests: AtomicUsize,
    registrations: Mutex<Vec<VerifyRequest<RegistrationCredential>>>,
    authentications: Mutex<Vec<VerifyRequest<AuthenticationCredential>>>,
}

impl MockGateway {
    /// Gateway issuing `challenge` and verifying matching submissions
    #[must_use]
    pub fn cooperative(challenge: &str) -> Self {
        Self {
            challenge: challenge.to_string(),
            verdict: true,
            options_fault: None,
            verify_fault: None,
            issued: Mutex::new(None),
            options_requests: AtomicUsize::new(0),
            registrations: Mutex::new(Vec::new()),
            authentications: Mutex::new(Vec::new()),
        }
    }

    /// Answer verification requests with this verdict
    #[must_use]
    pub fn with_verdict(mut self, verified: bool) -> Self {
        self.verdict = verified;
        self
    }

    /// Fail options requests with this HTTP status
    #[must_use]
    pub fn failing_options(mut self, status: u16) -> Self {
        self.options_fault = Some(Fault::Status(status));
        self
    }

    /// Fail verification requests with this HTTP status
    #[must_use]
    pub fn failing_verify(mut self, status: u16) -> Self {
        self.verify_fault = Some(Fault::Status(status));
        self
    }

    /// Never answer options requests
    #[must_use]
    pub fn hanging_options(mut self) -> Self {
        self.options_fault = Some(Fault::Hang);
        self
    }

    /// Never answer verification requests
    #[must_use]
    pub fn hanging_verify(mut self) -> Self {
        self.verify_fault = Some(Fault::Hang);
        self
    }

    /// Answer options requests with a body lacking `challenge`
    #[must_use]
    pub fn malformed_options(mut self) -> Self {
        self.options_fault = Some(Fault::Malformed);
        self
    }

    /// Answer verification requests with a body lacking `verified`
    #[must_use]
    pub fn malformed_verdict(mut self) -> Self {
        self.verify_fault = Some(Fault::Malformed);
        self
    }

    /// Number of options requests received
    pub fn options_requests(&self) -> usize {
        self.options_requests.load(Ordering::SeqCst)
    }

    /// Registration submissions received, in order
    pub fn submitted_registrations(&self) -> Vec<VerifyRequest<RegistrationCredential>> {
        self.registrations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Authentication submissions received, in order
    pub fn submitted_authentications(&self) -> Vec<VerifyRequest<AuthenticationCredential>> {
        self.authentications
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    async fn options_call<T: DeserializeOwned>(&self, options: T) -> Result<T, GatewayError> {
        self.options_requests.fetch_add(1, Ordering::SeqCst);
        match self.options_fault {
            Some(Fault::Status(status)) => Err(GatewayError::Status {
                status,
                body: json!({"detail": "Options unavailable"}).to_string(),
            }),
            Some(Fault::Hang) => std::future::pending().await,
            Some(Fault::Malformed) => {
                decode(json!({"rp": {"id": "localhost", "name": "Test App"}}))
            }
            None => {
                *self.issued.lock().unwrap_or_else(PoisonError::into_inner) =
                    Some(self.challenge.clone());
                Ok(options)
            }
        }
    }

    async fn verdict_for(&self, challenge: &str) -> Result<VerificationVerdict, GatewayError> {
        let issued = self
            .issued
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match self.verify_fault {
            Some(Fault::Status(status)) => Err(GatewayError::Status {
                status,
                body: json!({"detail": "Verification failed"}).to_string(),
            }),
            Some(Fault::Hang) => std::future::pending().await,
            Some(Fault::Malformed) => decode(json!({})),
            None if self.verdict && issued.as_deref() == Some(challenge) => {
                Ok(VerificationVerdict::verified())
            }
            None => Ok(VerificationVerdict {
                verified: false,
                reason: None,
            }),
        }
    }
}

/// Decode a canned body the way `HttpGateway` decodes a real one
fn decode<T: DeserializeOwned>(body: serde_json::Value) -> Result<T, GatewayError> {
    serde_json::from_value(body).map_err(|e| GatewayError::Malformed(e.to_string()))
}

#[async_trait]
impl VerificationGateway for MockGateway {
    async fn registration_options(&self, _email: &str) -> Result<RegistrationOptions, GatewayError> {
        self.options_call(TestFixtures::registration_options(&self.challenge))
            .await
    }

    async fn verify_registration(
        &self,
        request: &VerifyRequest<RegistrationCredential>,
    ) -> Result<VerificationVerdict, GatewayError> {
        self.registrations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());
        self.verdict_for(&request.challenge).await
    }

    async fn authentication_options(
        &self,
        _email: &str,
    ) -> Result<AuthenticationOptions, GatewayError> {
        self.options_call(TestFixtures::authentication_options(&self.challenge))
            .await
    }

    async fn verify_authentication(
        &self,
        request: &VerifyRequest<AuthenticationCredential>,
    ) -> Result<VerificationVerdict, GatewayError> {
        self.authentications
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());
        self.verdict_for(&request.challenge).await
    }
}

/// What a `MockPlatform` does when invoked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformBehavior {
    /// Return a canned credential with id `cred1`
    Succeed,
    /// The user dismisses the prompt
    UserCancels,
    /// The platform refuses the request
    Decline,
    /// Never complete
    Hang,
}

/// Scripted platform authenticator with canned, unsigned responses
#[derive(Debug)]
pub struct MockPlatform {
    behavior: PlatformBehavior,
    invocations: AtomicUsize,
}

impl MockPlatform {
    #[must_use]
    pub fn new(behavior: PlatformBehavior) -> Self {
        Self {
            behavior,
            invocations: AtomicUsize::new(0),
        }
    }

    /// Number of ceremonies the platform was asked to perform
    pub fn invocations(&self) -> usize {
        self.invocations.load(Ordering::SeqCst)
    }

    async fn perform(&self) -> Result<(), PlatformError> {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        match self.behavior {
            PlatformBehavior::Succeed => Ok(()),
            PlatformBehavior::UserCancels => Err(PlatformError::Cancelled),
            PlatformBehavior::Decline => Err(PlatformError::NotAllowed(
                "user verification was declined".to_string(),
            )),
            PlatformBehavior::Hang => std::future::pending().await,
        }
    }
}

fn client_data(kind: CeremonyKind, challenge: &str) -> String {
    let client_data = json!({
        "type": kind.client_data_type(),
        "challenge": challenge,
        "origin": TEST_ORIGIN,
    });
    encode_b64url(client_data.to_string().as_bytes())
}

#[async_trait]
impl PlatformAuthenticator for MockPlatform {
    async fn create_credential(
        &self,
        options: &RegistrationOptions,
    ) -> Result<RegistrationCredential, PlatformError> {
        self.perform().await?;
        Ok(RegistrationCredential {
            id: TEST_CREDENTIAL_ID.to_string(),
            raw_id: TEST_CREDENTIAL_ID.to_string(),
            response: AuthenticatorAttestationResponse {
                client_data_json: client_data(CeremonyKind::Registration, &options.challenge),
                attestation_object: encode_b64url(b"attestation"),
            },
            r#type: PUBLIC_KEY_TYPE.to_string(),
            client_extension_results: None,
        })
    }

    async fn get_assertion(
        &self,
        options: &AuthenticationOptions,
    ) -> Result<AuthenticationCredential, PlatformError> {
        self.perform().await?;
        Ok(AuthenticationCredential {
            id: TEST_CREDENTIAL_ID.to_string(),
            raw_id: TEST_CREDENTIAL_ID.to_string(),
            response: AuthenticatorAssertionResponse {
                client_data_json: client_data(CeremonyKind::Authentication, &options.challenge),
                authenticator_data: encode_b64url(b"authenticator data"),
                signature: encode_b64url(b"signature"),
                user_handle: None,
            },
            r#type: PUBLIC_KEY_TYPE.to_string(),
            client_extension_results: None,
        })
    }
}
