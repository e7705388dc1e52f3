// Centralized logging for ceremonies and the reference gateway
use log::{debug, info, warn};

use crate::ceremony::CeremonyOutcome;
use crate::settings::CeremonySettings;
use crate::webauthn::CeremonyKind;

pub struct LoggingHelper;

impl LoggingHelper {
    /// Log the start of a client ceremony
    pub fn log_ceremony_started(kind: CeremonyKind, identity: &str) {
        info!("🔄 Starting {kind} ceremony for {identity}");
    }

    /// Log that the platform authenticator produced a credential response
    pub fn log_platform_completed(kind: CeremonyKind, credential_id: &str) {
        debug!("Platform {kind} ceremony completed with credential {credential_id}");
    }

    /// Log the terminal outcome of a client ceremony
    pub fn log_ceremony_outcome(outcome: &CeremonyOutcome, identity: &str) {
        let kind = outcome.kind();
        match outcome.error() {
            None => info!("✅ {kind} verified for {identity}"),
            Some(error) => warn!("❌ {kind} for {identity} failed: {error}"),
        }
    }

    /// Log a challenge issued by the reference gateway
    pub fn log_challenge_issued(kind: CeremonyKind, email: &str) {
        info!("🔑 Issued {kind} challenge for {email}");
    }

    /// Log a negative verdict with the reason it was rejected
    pub fn log_verification_rejected(kind: CeremonyKind, email: &str, reason: &str) {
        warn!("Rejected {kind} response for {email}: {reason}");
    }

    /// Log a new credential stored for a user
    pub fn log_credential_registered(email: &str, credential_id: &str) {
        info!("✅ Registered credential {credential_id} for {email}");
    }

    /// Log a successful assertion with the new counter value
    pub fn log_authentication_verified(email: &str, credential_id: &str, sign_count: u32) {
        info!("✅ Authenticated {email} with credential {credential_id} (sign count {sign_count})");
    }

    /// Log the gateway configuration at startup
    pub fn log_gateway_startup(settings: &CeremonySettings) {
        info!("🚀 Passkey gateway starting on {}", settings.get_bind_address());
        info!(
            "🔧 Relying party: id={}, name={}, origin={}",
            settings.webauthn.rp_id, settings.webauthn.rp_name, settings.webauthn.rp_origin
        );
        info!("🌐 CORS origins: {:?}", settings.get_cors_origins());
        debug!(
            "Challenge timeout: {}s, user verification: {}",
            settings.webauthn.timeout_seconds, settings.webauthn.user_verification
        );
    }
}
