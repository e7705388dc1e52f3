//! Test fixtures providing pre-built test objects

use std::time::Duration;

use crate::ceremony::CeremonyTimeouts;
use crate::settings::{CeremonySettings, ClientSettings};
use crate::webauthn::{
    AuthenticationOptions, AuthenticatorSelectionCriteria, PublicKeyCredentialParameters,
    RegistrationOptions, RelyingParty, UserEntity, WebAuthnSettings, COSE_ALG_ES256,
    PUBLIC_KEY_TYPE,
};

use super::constants::{TEST_EMAIL, TEST_ORIGIN};

/// Central fixture provider for all test data
pub struct TestFixtures;

impl TestFixtures {
    /// Timeouts short enough for hang and timeout tests
    #[must_use]
    pub fn fast_timeouts() -> CeremonyTimeouts {
        CeremonyTimeouts {
            options: Duration::from_secs(2),
            ceremony: Duration::from_millis(500),
            verify: Duration::from_secs(2),
        }
    }

    /// Relying party settings for `localhost`
    #[must_use]
    pub fn webauthn_settings() -> WebAuthnSettings {
        WebAuthnSettings {
            rp_id: "localhost".to_string(),
            rp_name: "Test App".to_string(),
            rp_origin: TEST_ORIGIN.to_string(),
            timeout_seconds: 60,
            user_verification: "preferred".to_string(),
            authenticator_attachment: None,
        }
    }

    /// Full settings pointing the client at `gateway_url`
    #[must_use]
    pub fn settings(gateway_url: &str) -> CeremonySettings {
        CeremonySettings {
            client: ClientSettings {
                gateway_url: gateway_url.to_string(),
                options_timeout_seconds: 5,
                ceremony_timeout_seconds: 5,
                verify_timeout_seconds: 5,
            },
            webauthn: Self::webauthn_settings(),
            ..Default::default()
        }
    }

    /// Registration options as a gateway would issue them
    #[must_use]
    pub fn registration_options(challenge: &str) -> RegistrationOptions {
        RegistrationOptions {
            challenge: challenge.to_string(),
            rp: RelyingParty {
                id: "localhost".to_string(),
                name: "Test App".to_string(),
            },
            user: UserEntity {
                id: "dXNlci0x".to_string(),
                name: TEST_EMAIL.to_string(),
                display_name: TEST_EMAIL.to_string(),
            },
            pub_key_cred_params: vec![PublicKeyCredentialParameters {
                r#type: PUBLIC_KEY_TYPE.to_string(),
                alg: COSE_ALG_ES256,
            }],
            timeout: Some(60_000),
            attestation: Some("none".to_string()),
            authenticator_selection: Some(AuthenticatorSelectionCriteria {
                resident_key: Some("preferred".to_string()),
                user_verification: Some("preferred".to_string()),
                ..Default::default()
            }),
            exclude_credentials: Vec::new(),
        }
    }

    /// Authentication options without an allow list
    #[must_use]
    pub fn authentication_options(challenge: &str) -> AuthenticationOptions {
        AuthenticationOptions {
            challenge: challenge.to_string(),
            timeout: Some(60_000),
            rp_id: Some("localhost".to_string()),
            allow_credentials: Vec::new(),
            user_verification: Some("preferred".to_string()),
        }
    }
}
