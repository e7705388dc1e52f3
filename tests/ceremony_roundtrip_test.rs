// End-to-end ceremonies against the in-process reference gateway
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use passkey_ceremony::ceremony::{
    CeremonyClient, CeremonyError, CeremonyPanel, GatewayError, VerificationGateway,
};
use passkey_ceremony::testing::constants::{OTHER_EMAIL, TEST_EMAIL};
use passkey_ceremony::testing::{
    AuthenticatorBehavior, MockGateway, MockPlatform, PlatformBehavior, SoftwareAuthenticator,
    TestFixtures,
};
use passkey_ceremony::webauthn::{
    AuthenticationCredential, AuthenticationOptions, CeremonyKind, RegistrationCredential,
    RegistrationOptions, VerificationVerdict, VerifyRequest,
};
use passkey_ceremony::RelyingPartyService;

/// Forwards to the reference service and keeps the last authentication submission
struct RecordingGateway {
    inner: RelyingPartyService,
    last_authentication: Mutex<Option<VerifyRequest<AuthenticationCredential>>>,
}

impl RecordingGateway {
    fn new(inner: RelyingPartyService) -> Self {
        Self {
            inner,
            last_authentication: Mutex::new(None),
        }
    }

    fn last_authentication(&self) -> Option<VerifyRequest<AuthenticationCredential>> {
        self.last_authentication.lock().unwrap().clone()
    }
}

#[async_trait]
impl VerificationGateway for RecordingGateway {
    async fn registration_options(&self, email: &str) -> Result<RegistrationOptions, GatewayError> {
        VerificationGateway::registration_options(&self.inner, email).await
    }

    async fn verify_registration(
        &self,
        request: &VerifyRequest<RegistrationCredential>,
    ) -> Result<VerificationVerdict, GatewayError> {
        VerificationGateway::verify_registration(&self.inner, request).await
    }

    async fn authentication_options(
        &self,
        email: &str,
    ) -> Result<AuthenticationOptions, GatewayError> {
        VerificationGateway::authentication_options(&self.inner, email).await
    }

    async fn verify_authentication(
        &self,
        request: &VerifyRequest<AuthenticationCredential>,
    ) -> Result<VerificationVerdict, GatewayError> {
        *self.last_authentication.lock().unwrap() = Some(request.clone());
        VerificationGateway::verify_authentication(&self.inner, request).await
    }
}

fn reference_service() -> RelyingPartyService {
    RelyingPartyService::new(TestFixtures::webauthn_settings())
}

fn software_authenticator() -> Arc<SoftwareAuthenticator> {
    Arc::new(SoftwareAuthenticator::for_settings(
        &TestFixtures::webauthn_settings(),
    ))
}

#[tokio::test]
async fn test_register_then_authenticate() {
    let service = reference_service();
    let client = CeremonyClient::new(
        Arc::new(service.clone()),
        software_authenticator(),
        TestFixtures::fast_timeouts(),
    );

    let registration = client.run_registration(TEST_EMAIL).await;
    assert_eq!(registration.message(), "Registration successful!");

    let authentication = client.run_authentication(TEST_EMAIL).await;
    assert_eq!(authentication.message(), "Login successful!");

    let user = service.store().user(TEST_EMAIL).await.unwrap();
    assert_eq!(user.credentials.len(), 1);
    assert_eq!(user.credentials[0].sign_count, 1);
    assert!(user.pending.is_none());
}

#[tokio::test]
async fn test_replayed_submission_is_not_verified() {
    let gateway = Arc::new(RecordingGateway::new(reference_service()));
    let client = CeremonyClient::new(
        gateway.clone(),
        software_authenticator(),
        TestFixtures::fast_timeouts(),
    );

    assert!(client.run_registration(TEST_EMAIL).await.is_verified());
    assert!(client.run_authentication(TEST_EMAIL).await.is_verified());

    let submitted = gateway.last_authentication().unwrap();
    let replay = gateway.verify_authentication(&submitted).await.unwrap();
    assert!(!replay.verified);
}

#[tokio::test]
async fn test_scripted_gateway_scenario() {
    // Options carry challenge "abc123"; the platform answers with credential "cred1"
    let gateway = Arc::new(MockGateway::cooperative("abc123"));
    let client = CeremonyClient::new(
        gateway.clone(),
        Arc::new(MockPlatform::new(PlatformBehavior::Succeed)),
        TestFixtures::fast_timeouts(),
    );

    let mut panel = CeremonyPanel::new(CeremonyKind::Registration);
    panel.set_email(TEST_EMAIL);
    let outcome = panel.submit(&client).await;
    assert_eq!(outcome.message(), "Registration successful!");

    let submitted = gateway.submitted_registrations();
    assert_eq!(submitted.len(), 1);
    assert_eq!(submitted[0].challenge, "abc123");
    assert_eq!(submitted[0].response.id, "cred1");

    // Replaying the consumed "abc123" submission is refused
    let replay = gateway.verify_registration(&submitted[0]).await.unwrap();
    assert!(!replay.verified);
    assert_eq!(panel.message().as_deref(), Some("Registration successful!"));
}

#[tokio::test]
async fn test_login_for_unknown_identity_never_prompts() {
    let authenticator = software_authenticator();
    let client = CeremonyClient::new(
        Arc::new(reference_service()),
        authenticator.clone(),
        TestFixtures::fast_timeouts(),
    );

    let outcome = client.run_authentication(TEST_EMAIL).await;

    assert_eq!(
        outcome.error(),
        Some(&CeremonyError::OptionsFetch("User not found".to_string()))
    );
    assert_eq!(
        outcome.message(),
        "Error: could not get options from the server: User not found"
    );
    assert_eq!(authenticator.invocations(), 0);
}

#[tokio::test]
async fn test_cancelled_platform_prompt_stores_nothing() {
    let service = reference_service();
    let authenticator = Arc::new(
        SoftwareAuthenticator::for_settings(&TestFixtures::webauthn_settings())
            .with_behavior(AuthenticatorBehavior::UserCancels),
    );
    let client = CeremonyClient::new(
        Arc::new(service.clone()),
        authenticator,
        TestFixtures::fast_timeouts(),
    );

    let outcome = client.run_registration(TEST_EMAIL).await;

    assert!(matches!(
        outcome.error(),
        Some(CeremonyError::CeremonyAborted(_))
    ));
    assert!(!outcome.message().contains("server"));
    let user = service.store().user(TEST_EMAIL).await.unwrap();
    assert!(user.credentials.is_empty());
    // The issued challenge stays pending until the next verify or options call
    assert!(user.pending.is_some());
}

#[tokio::test]
async fn test_second_registration_on_same_device_is_refused() {
    let client = CeremonyClient::new(
        Arc::new(reference_service()),
        software_authenticator(),
        TestFixtures::fast_timeouts(),
    );

    assert!(client.run_registration(TEST_EMAIL).await.is_verified());
    let again = client.run_registration(TEST_EMAIL).await;

    assert!(matches!(
        again.error(),
        Some(CeremonyError::CeremonyAborted(_))
    ));
}

#[tokio::test]
async fn test_concurrent_ceremonies_for_different_identities() {
    let service = reference_service();
    let client = CeremonyClient::new(
        Arc::new(service.clone()),
        software_authenticator(),
        TestFixtures::fast_timeouts(),
    );

    let (alice, bob) = tokio::join!(
        client.run_registration(TEST_EMAIL),
        client.run_registration(OTHER_EMAIL)
    );
    assert!(alice.is_verified());
    assert!(bob.is_verified());

    let (alice, bob) = tokio::join!(
        client.run_authentication(TEST_EMAIL),
        client.run_authentication(OTHER_EMAIL)
    );
    assert!(alice.is_verified());
    assert!(bob.is_verified());
}
