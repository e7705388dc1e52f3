//! Testing utilities shared by unit and integration tests
//!
//! Available to the crate's own tests and, with the `testing` feature, to the
//! integration tests under `tests/`.
//!
//! ## Organization
//!
//! - [`fixtures`] - Pre-built settings, timeouts and ceremony options
//! - [`mock`] - Scripted `VerificationGateway` and `PlatformAuthenticator` doubles
//! - [`authenticator`] - Software platform authenticator producing real signatures
//! - [`server`] - Reference gateway served over loopback HTTP
//!
//! ## Usage
//!
//! ```rust,ignore
//! use passkey_ceremony::testing::{SoftwareAuthenticator, TestFixtures};
//!
//! let authenticator = SoftwareAuthenticator::for_settings(&TestFixtures::webauthn_settings());
//! ```

pub mod authenticator;
pub mod fixtures;
pub mod mock;
pub mod server;

// Re-export commonly used items for convenience
pub use authenticator::{AuthenticatorBehavior, SoftwareAuthenticator};
pub use fixtures::TestFixtures;
pub use mock::{MockGateway, MockPlatform, PlatformBehavior};
pub use server::TestGatewayServer;

/// Common test constants
pub mod constants {
    /// Default test email address
    pub const TEST_EMAIL: &str = "alice@example.com";

    /// Second identity for isolation tests
    pub const OTHER_EMAIL: &str = "bob@example.com";

    /// Challenge used by scripted gateways
    pub const TEST_CHALLENGE: &str = "abc123";

    /// Credential id returned by the scripted platform
    pub const TEST_CREDENTIAL_ID: &str = "cred1";

    /// Origin the test relying party is served from
    pub const TEST_ORIGIN: &str = "http://localhost:5173";
}
