//! Platform credential API boundary
//!
//! The platform (browser, OS or security key) owns key generation and user
//! verification. The ceremony client only hands it options and forwards whatever
//! it signs.

use async_trait::async_trait;
use thiserror::Error;

use crate::webauthn::{
    AuthenticationCredential, AuthenticationOptions, RegistrationCredential, RegistrationOptions,
};

/// Reasons a platform ceremony ends without a signed result
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlatformError {
    /// The user dismissed the prompt
    #[error("the user cancelled the request")]
    Cancelled,
    /// The platform refused, e.g. the user declined verification
    #[error("the request was not allowed: {0}")]
    NotAllowed(String),
    /// No credential on this device matches the allowed list
    #[error("no matching credential is available on this device")]
    NoMatchingCredential,
    /// Options asked for something the authenticator cannot do
    #[error("the authenticator does not support the request: {0}")]
    Unsupported(String),
}

/// Platform credential ceremony primitive
#[async_trait]
pub trait PlatformAuthenticator: Send + Sync {
    /// Create a new credential (attestation ceremony)
    ///
    /// # Errors
    ///
    /// Returns an error if the user cancels or the platform rejects the request
    async fn create_credential(
        &self,
        options: &RegistrationOptions,
    ) -> Result<RegistrationCredential, PlatformError>;

    /// Sign a challenge with an existing credential (assertion ceremony)
    ///
    /// # Errors
    ///
    /// Returns an error if the user cancels, no credential matches or the platform
    /// rejects the request
    async fn get_assertion(
        &self,
        options: &AuthenticationOptions,
    ) -> Result<AuthenticationCredential, PlatformError>;
}
