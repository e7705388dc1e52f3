//! Ceremony outcome rendered to the user

use crate::webauthn::CeremonyKind;

use super::errors::CeremonyError;

/// Terminal result of one ceremony attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CeremonyOutcome {
    kind: CeremonyKind,
    result: Result<(), CeremonyError>,
}

impl CeremonyOutcome {
    #[must_use]
    pub fn verified(kind: CeremonyKind) -> Self {
        Self {
            kind,
            result: Ok(()),
        }
    }

    #[must_use]
    pub fn failed(kind: CeremonyKind, error: CeremonyError) -> Self {
        Self {
            kind,
            result: Err(error),
        }
    }

    #[must_use]
    pub fn kind(&self) -> CeremonyKind {
        self.kind
    }

    #[must_use]
    pub fn is_verified(&self) -> bool {
        self.result.is_ok()
    }

    #[must_use]
    pub fn error(&self) -> Option<&CeremonyError> {
        self.result.as_ref().err()
    }

    /// The single line shown to the user
    #[must_use]
    pub fn message(&self) -> String {
        match (&self.result, self.kind) {
            (Ok(()), CeremonyKind::Registration) => "Registration successful!".to_string(),
            (Ok(()), CeremonyKind::Authentication) => "Login successful!".to_string(),
            (Err(CeremonyError::NotVerified(_)), CeremonyKind::Registration) => {
                "Registration failed.".to_string()
            }
            (Err(CeremonyError::NotVerified(_)), CeremonyKind::Authentication) => {
                "Login failed.".to_string()
            }
            (Err(error), _) => format!("Error: {error}"),
        }
    }
}

impl From<(CeremonyKind, Result<(), CeremonyError>)> for CeremonyOutcome {
    fn from((kind, result): (CeremonyKind, Result<(), CeremonyError>)) -> Self {
        Self { kind, result }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ceremony::CeremonyStep;

    #[test]
    fn test_success_messages() {
        assert_eq!(
            CeremonyOutcome::verified(CeremonyKind::Registration).message(),
            "Registration successful!"
        );
        assert_eq!(
            CeremonyOutcome::verified(CeremonyKind::Authentication).message(),
            "Login successful!"
        );
    }

    #[test]
    fn test_negative_verdict_messages() {
        let outcome = CeremonyOutcome::failed(
            CeremonyKind::Authentication,
            CeremonyError::NotVerified(Some("stale challenge".to_string())),
        );
        assert!(!outcome.is_verified());
        assert_eq!(outcome.message(), "Login failed.");
        assert_eq!(
            CeremonyOutcome::failed(CeremonyKind::Registration, CeremonyError::NotVerified(None))
                .message(),
            "Registration failed."
        );
    }

    #[test]
    fn test_errors_render_with_prefix() {
        let outcome = CeremonyOutcome::failed(
            CeremonyKind::Registration,
            CeremonyError::MalformedResponse {
                step: CeremonyStep::FetchOptions,
                detail: "missing field `challenge`".to_string(),
            },
        );
        assert_eq!(
            outcome.message(),
            "Error: unexpected server response while requesting options: missing field `challenge`"
        );
        assert!(outcome.error().is_some());
    }
}
