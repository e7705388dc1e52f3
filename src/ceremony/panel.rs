//! Per-ceremony UI state: the identity field and the one visible outcome

use crate::webauthn::CeremonyKind;

use super::cancel::CancelSignal;
use super::client::CeremonyClient;
use super::outcome::CeremonyOutcome;

/// State behind one ceremony form (register or login)
///
/// Holds at most one outcome; every submission replaces it. The email field is never
/// touched by a submission, so a failed attempt can be retried as is.
#[derive(Debug, Clone)]
pub struct CeremonyPanel {
    kind: CeremonyKind,
    email: String,
    outcome: Option<CeremonyOutcome>,
}

impl CeremonyPanel {
    #[must_use]
    pub fn new(kind: CeremonyKind) -> Self {
        Self {
            kind,
            email: String::new(),
            outcome: None,
        }
    }

    #[must_use]
    pub fn kind(&self) -> CeremonyKind {
        self.kind
    }

    pub fn set_email(&mut self, email: impl Into<String>) {
        self.email = email.into();
    }

    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }

    /// Message currently shown, if any attempt was made
    #[must_use]
    pub fn message(&self) -> Option<String> {
        self.outcome.as_ref().map(CeremonyOutcome::message)
    }

    #[must_use]
    pub fn outcome(&self) -> Option<&CeremonyOutcome> {
        self.outcome.as_ref()
    }

    /// Run this panel's ceremony with the current email
    pub async fn submit(&mut self, client: &CeremonyClient) -> &CeremonyOutcome {
        self.submit_with(client, &CancelSignal::never()).await
    }

    /// Run this panel's ceremony, observing `cancel`
    pub async fn submit_with(
        &mut self,
        client: &CeremonyClient,
        cancel: &CancelSignal,
    ) -> &CeremonyOutcome {
        let outcome = match self.kind {
            CeremonyKind::Registration => client.run_registration_with(&self.email, cancel).await,
            CeremonyKind::Authentication => {
                client.run_authentication_with(&self.email, cancel).await
            }
        };
        self.outcome.insert(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures::TestFixtures;
    use crate::testing::mock::{MockGateway, MockPlatform, PlatformBehavior};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_each_submission_replaces_the_message() {
        let platform = Arc::new(MockPlatform::new(PlatformBehavior::Succeed));
        let failing = CeremonyClient::new(
            Arc::new(MockGateway::cooperative("abc123").failing_options(503)),
            platform.clone(),
            TestFixtures::fast_timeouts(),
        );
        let working = CeremonyClient::new(
            Arc::new(MockGateway::cooperative("abc123")),
            platform,
            TestFixtures::fast_timeouts(),
        );

        let mut panel = CeremonyPanel::new(CeremonyKind::Registration);
        assert_eq!(panel.message(), None);
        panel.set_email("alice@example.com");

        panel.submit(&failing).await;
        let first = panel.message().unwrap();
        assert!(first.starts_with("Error: could not get options from the server"));
        assert_eq!(panel.email(), "alice@example.com");

        panel.submit(&working).await;
        assert_eq!(panel.message().as_deref(), Some("Registration successful!"));
        assert_eq!(panel.email(), "alice@example.com");
    }

    #[tokio::test]
    async fn test_login_panel_runs_authentication() {
        let gateway = Arc::new(MockGateway::cooperative("abc123"));
        let client = CeremonyClient::new(
            gateway.clone(),
            Arc::new(MockPlatform::new(PlatformBehavior::Succeed)),
            TestFixtures::fast_timeouts(),
        );

        let mut panel = CeremonyPanel::new(CeremonyKind::Authentication);
        panel.set_email("bob@example.com");
        let outcome = panel.submit(&client).await;

        assert_eq!(outcome.kind(), CeremonyKind::Authentication);
        assert_eq!(gateway.submitted_authentications().len(), 1);
        assert!(gateway.submitted_registrations().is_empty());
    }
}
