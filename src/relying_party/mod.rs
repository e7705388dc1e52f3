//! Reference verification gateway
//!
//! An in-memory relying party serving the four ceremony endpoints. The binary
//! runs it over HTTP; tests also use it in-process through `VerificationGateway`.

mod errors;
mod handlers;
mod service;
mod store;

pub use errors::RelyingPartyError;
pub use handlers::{
    auth_options, auth_verify, configure_services, cors, health, register_options,
    register_verify, HealthResponse,
};
pub use service::RelyingPartyService;
pub use store::{CredentialStore, PendingChallenge, StoredCredential, UserRecord};
