//! Ceremony client
//!
//! Sequences a single registration or authentication ceremony:
//!
//! 1. request options (and a fresh challenge) from the gateway
//! 2. hand the options to the platform authenticator and wait for the signed result
//! 3. submit `{email, response, challenge}`, threading the step 1 challenge unchanged
//! 4. turn the verdict, or whatever failed on the way, into one outcome
//!
//! The client keeps no state between invocations; both ceremonies can run concurrently.

use std::sync::Arc;
use std::time::Duration;

use crate::settings::ClientSettings;
use crate::utils::logging::LoggingHelper;
use crate::webauthn::{CeremonyKind, VerificationVerdict, VerifyRequest};

use super::cancel::{bounded, CancelSignal};
use super::errors::{CeremonyError, CeremonyStep};
use super::gateway::{GatewayError, HttpGateway, VerificationGateway};
use super::outcome::CeremonyOutcome;
use super::platform::PlatformAuthenticator;

/// Deadlines for the three suspending steps
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CeremonyTimeouts {
    pub options: Duration,
    /// Upper bound for the platform step; options may ask for less
    pub ceremony: Duration,
    pub verify: Duration,
}

impl CeremonyTimeouts {
    /// Platform deadline: the options' own timeout, capped by the configured one
    #[must_use]
    pub fn ceremony_deadline(&self, options_timeout_ms: Option<u32>) -> Duration {
        match options_timeout_ms {
            Some(ms) if ms > 0 => Duration::from_millis(u64::from(ms)).min(self.ceremony),
            _ => self.ceremony,
        }
    }
}

impl Default for CeremonyTimeouts {
    fn default() -> Self {
        Self::from(&ClientSettings::default())
    }
}

impl From<&ClientSettings> for CeremonyTimeouts {
    fn from(settings: &ClientSettings) -> Self {
        Self {
            options: Duration::from_secs(settings.options_timeout_seconds),
            ceremony: Duration::from_secs(settings.ceremony_timeout_seconds),
            verify: Duration::from_secs(settings.verify_timeout_seconds),
        }
    }
}

/// Drives registration and authentication ceremonies
#[derive(Clone)]
pub struct CeremonyClient {
    gateway: Arc<dyn VerificationGateway>,
    platform: Arc<dyn PlatformAuthenticator>,
    timeouts: CeremonyTimeouts,
}

impl CeremonyClient {
    #[must_use]
    pub fn new(
        gateway: Arc<dyn VerificationGateway>,
        platform: Arc<dyn PlatformAuthenticator>,
        timeouts: CeremonyTimeouts,
    ) -> Self {
        Self {
            gateway,
            platform,
            timeouts,
        }
    }

    /// Build a client talking HTTP to the configured gateway base URL
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::InvalidBaseUrl` if the configured URL is unusable
    pub fn from_settings(
        settings: &ClientSettings,
        platform: Arc<dyn PlatformAuthenticator>,
    ) -> Result<Self, GatewayError> {
        let gateway = HttpGateway::new(&settings.gateway_url)?;
        Ok(Self::new(
            Arc::new(gateway),
            platform,
            CeremonyTimeouts::from(settings),
        ))
    }

    #[must_use]
    pub fn timeouts(&self) -> CeremonyTimeouts {
        self.timeouts
    }

    /// Register a new platform credential for `identity`
    pub async fn run_registration(&self, identity: &str) -> CeremonyOutcome {
        self.run_registration_with(identity, &CancelSignal::never())
            .await
    }

    /// Register a new platform credential, observing `cancel`
    pub async fn run_registration_with(
        &self,
        identity: &str,
        cancel: &CancelSignal,
    ) -> CeremonyOutcome {
        let result = self.try_registration(identity, cancel).await;
        finish(CeremonyKind::Registration, identity, result)
    }

    /// Authenticate `identity` with a registered platform credential
    pub async fn run_authentication(&self, identity: &str) -> CeremonyOutcome {
        self.run_authentication_with(identity, &CancelSignal::never())
            .await
    }

    /// Authenticate `identity`, observing `cancel`
    pub async fn run_authentication_with(
        &self,
        identity: &str,
        cancel: &CancelSignal,
    ) -> CeremonyOutcome {
        let result = self.try_authentication(identity, cancel).await;
        finish(CeremonyKind::Authentication, identity, result)
    }

    /// Registration ceremony returning the positive verdict or the failure
    ///
    /// # Errors
    ///
    /// Returns the `CeremonyError` of the first step that failed, or
    /// `CeremonyError::NotVerified` for a negative verdict
    pub async fn try_registration(
        &self,
        identity: &str,
        cancel: &CancelSignal,
    ) -> Result<VerificationVerdict, CeremonyError> {
        require_identity(identity)?;
        LoggingHelper::log_ceremony_started(CeremonyKind::Registration, identity);

        let options = bounded(
            CeremonyStep::FetchOptions,
            self.timeouts.options,
            cancel,
            async {
                self.gateway
                    .registration_options(identity)
                    .await
                    .map_err(options_error)
            },
        )
        .await?;
        require_challenge(&options.challenge)?;

        let response = bounded(
            CeremonyStep::PlatformCeremony,
            self.timeouts.ceremony_deadline(options.timeout),
            cancel,
            async {
                self.platform
                    .create_credential(&options)
                    .await
                    .map_err(|e| CeremonyError::CeremonyAborted(e.to_string()))
            },
        )
        .await?;
        LoggingHelper::log_platform_completed(CeremonyKind::Registration, &response.id);

        let request = VerifyRequest {
            email: identity.to_string(),
            response,
            challenge: options.challenge,
        };
        let verdict = bounded(
            CeremonyStep::SubmitResponse,
            self.timeouts.verify,
            cancel,
            async {
                self.gateway
                    .verify_registration(&request)
                    .await
                    .map_err(verification_error)
            },
        )
        .await?;

        accept(verdict)
    }

    /// Authentication ceremony returning the positive verdict or the failure
    ///
    /// # Errors
    ///
    /// Returns the `CeremonyError` of the first step that failed, or
    /// `CeremonyError::NotVerified` for a negative verdict
    pub async fn try_authentication(
        &self,
        identity: &str,
        cancel: &CancelSignal,
    ) -> Result<VerificationVerdict, CeremonyError> {
        require_identity(identity)?;
        LoggingHelper::log_ceremony_started(CeremonyKind::Authentication, identity);

        let options = bounded(
            CeremonyStep::FetchOptions,
            self.timeouts.options,
            cancel,
            async {
                self.gateway
                    .authentication_options(identity)
                    .await
                    .map_err(options_error)
            },
        )
        .await?;
        require_challenge(&options.challenge)?;

        let response = bounded(
            CeremonyStep::PlatformCeremony,
            self.timeouts.ceremony_deadline(options.timeout),
            cancel,
            async {
                self.platform
                    .get_assertion(&options)
                    .await
                    .map_err(|e| CeremonyError::CeremonyAborted(e.to_string()))
            },
        )
        .await?;
        LoggingHelper::log_platform_completed(CeremonyKind::Authentication, &response.id);

        let request = VerifyRequest {
            email: identity.to_string(),
            response,
            challenge: options.challenge,
        };
        let verdict = bounded(
            CeremonyStep::SubmitResponse,
            self.timeouts.verify,
            cancel,
            async {
                self.gateway
                    .verify_authentication(&request)
                    .await
                    .map_err(verification_error)
            },
        )
        .await?;

        accept(verdict)
    }
}

fn finish(
    kind: CeremonyKind,
    identity: &str,
    result: Result<VerificationVerdict, CeremonyError>,
) -> CeremonyOutcome {
    let outcome = CeremonyOutcome::from((kind, result.map(|_| ())));
    LoggingHelper::log_ceremony_outcome(&outcome, identity);
    outcome
}

fn require_identity(identity: &str) -> Result<(), CeremonyError> {
    if identity.trim().is_empty() {
        return Err(CeremonyError::InvalidIdentity);
    }
    Ok(())
}

fn require_challenge(challenge: &str) -> Result<(), CeremonyError> {
    if challenge.trim().is_empty() {
        return Err(CeremonyError::MalformedResponse {
            step: CeremonyStep::FetchOptions,
            detail: "empty challenge".to_string(),
        });
    }
    Ok(())
}

fn accept(verdict: VerificationVerdict) -> Result<VerificationVerdict, CeremonyError> {
    if verdict.verified {
        Ok(verdict)
    } else {
        Err(CeremonyError::NotVerified(verdict.reason))
    }
}

fn options_error(error: GatewayError) -> CeremonyError {
    match error {
        GatewayError::Malformed(detail) => CeremonyError::MalformedResponse {
            step: CeremonyStep::FetchOptions,
            detail,
        },
        GatewayError::Status { status, body } => {
            let reason = rejection_reason(&body).unwrap_or_else(|| format!("HTTP {status}"));
            CeremonyError::OptionsFetch(reason)
        }
        other => CeremonyError::OptionsFetch(other.to_string()),
    }
}

fn verification_error(error: GatewayError) -> CeremonyError {
    if error.is_rejection() {
        // Reached the gateway and it said no: a verdict, not a fault
        let reason = match &error {
            GatewayError::Status { body, .. } => rejection_reason(body),
            _ => None,
        };
        return CeremonyError::NotVerified(reason);
    }
    match error {
        GatewayError::Malformed(detail) => CeremonyError::MalformedResponse {
            step: CeremonyStep::SubmitResponse,
            detail,
        },
        other => CeremonyError::VerificationFetch(other.to_string()),
    }
}

/// Human-readable reason from a gateway error body (`message` or `detail`)
fn rejection_reason(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    ["message", "detail"]
        .iter()
        .find_map(|key| value.get(key).and_then(serde_json::Value::as_str))
        .map(ToString::to_string)
}
