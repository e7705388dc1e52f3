#![warn(clippy::pedantic)]
#![warn(clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

/// Version of the passkey-ceremony crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod ceremony;
pub mod relying_party;
pub mod settings;
pub mod utils;
pub mod webauthn;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

/// Re-export commonly used items
pub use ceremony::{
    CancelSignal, CeremonyClient, CeremonyError, CeremonyOutcome, CeremonyPanel,
    CeremonyTimeouts, HttpGateway, PlatformAuthenticator, PlatformError, VerificationGateway,
};
pub use relying_party::RelyingPartyService;
pub use settings::CeremonySettings;
pub use webauthn::{CeremonyKind, VerificationVerdict, WebAuthnError};
