//! Passwordless credential ceremony orchestration
//!
//! This module drives the two client-side ceremonies: it fetches options from the
//! verification gateway, hands them to the platform authenticator and submits the
//! signed result back for a verdict. Every suspending step is bounded by a deadline
//! and observes a cancellation signal.

mod cancel;
mod client;
mod errors;
mod gateway;
mod outcome;
mod panel;
mod platform;

pub use cancel::{cancel_pair, CancelHandle, CancelSignal};
pub use client::{CeremonyClient, CeremonyTimeouts};
pub use errors::{CeremonyError, CeremonyStep};
pub use gateway::{GatewayError, HttpGateway, VerificationGateway};
pub use outcome::CeremonyOutcome;
pub use panel::CeremonyPanel;
pub use platform::{PlatformAuthenticator, PlatformError};
