//! Ceremony error taxonomy

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// The three suspending steps of a ceremony
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CeremonyStep {
    FetchOptions,
    PlatformCeremony,
    SubmitResponse,
}

impl fmt::Display for CeremonyStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CeremonyStep::FetchOptions => write!(f, "requesting options"),
            CeremonyStep::PlatformCeremony => write!(f, "waiting for the authenticator"),
            CeremonyStep::SubmitResponse => write!(f, "submitting the response"),
        }
    }
}

/// Everything that can end a ceremony without a positive verdict
///
/// Every variant is converted into a single user-facing message at the ceremony
/// boundary; none are retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CeremonyError {
    /// Identity was empty; nothing was sent
    #[error("an email address is required")]
    InvalidIdentity,
    /// Gateway unreachable or returned a non-success status for options
    #[error("could not get options from the server: {0}")]
    OptionsFetch(String),
    /// The user cancelled or the platform rejected the ceremony
    #[error("the authenticator did not complete the ceremony: {0}")]
    CeremonyAborted(String),
    /// Gateway unreachable while submitting the signed response
    #[error("could not reach the server to verify: {0}")]
    VerificationFetch(String),
    /// Gateway answered with a negative verdict
    #[error("the server did not verify the credential{}", reason_suffix(.0.as_deref()))]
    NotVerified(Option<String>),
    /// A step exceeded its deadline
    #[error("timed out after {}s while {step}", .after.as_secs_f32())]
    Timeout { step: CeremonyStep, after: Duration },
    /// The caller cancelled the ceremony
    #[error("cancelled while {step}")]
    Cancelled { step: CeremonyStep },
    /// Gateway response did not carry the required fields
    #[error("unexpected server response while {step}: {detail}")]
    MalformedResponse { step: CeremonyStep, detail: String },
}

fn reason_suffix(reason: Option<&str>) -> String {
    reason.map(|r| format!(" ({r})")).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_failing_step() {
        let timeout = CeremonyError::Timeout {
            step: CeremonyStep::PlatformCeremony,
            after: Duration::from_millis(1500),
        };
        assert_eq!(
            timeout.to_string(),
            "timed out after 1.5s while waiting for the authenticator"
        );

        let cancelled = CeremonyError::Cancelled {
            step: CeremonyStep::FetchOptions,
        };
        assert_eq!(cancelled.to_string(), "cancelled while requesting options");
    }

    #[test]
    fn test_not_verified_reason_is_optional() {
        assert_eq!(
            CeremonyError::NotVerified(None).to_string(),
            "the server did not verify the credential"
        );
        assert_eq!(
            CeremonyError::NotVerified(Some("challenge mismatch".to_string())).to_string(),
            "the server did not verify the credential (challenge mismatch)"
        );
    }

    #[test]
    fn test_aborted_is_distinct_from_gateway_errors() {
        let aborted = CeremonyError::CeremonyAborted("user cancelled".to_string()).to_string();
        let options = CeremonyError::OptionsFetch("user cancelled".to_string()).to_string();
        let verify = CeremonyError::VerificationFetch("user cancelled".to_string()).to_string();
        assert_ne!(aborted, options);
        assert_ne!(aborted, verify);
    }
}
