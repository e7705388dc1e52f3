#![warn(clippy::pedantic)]
#![warn(clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

use actix_web::{middleware::Logger, web, App, HttpServer};
use passkey_ceremony::{
    relying_party::{configure_services, cors, RelyingPartyService},
    settings::CeremonySettings,
    utils::logging::LoggingHelper,
};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load configuration from Settings.toml and environment variables
    // This also loads .env file and initializes the logger
    let settings = CeremonySettings::load()
        .map_err(|e| std::io::Error::other(format!("Failed to load settings: {e:#}")))?;

    start_server(settings).await
}

/// Start the reference verification gateway
///
/// # Errors
///
/// Returns an error if:
/// - Server binding fails
/// - Server fails to start
async fn start_server(settings: CeremonySettings) -> std::io::Result<()> {
    let bind_address = settings.get_bind_address();
    print_startup_info(&bind_address, &settings);
    LoggingHelper::log_gateway_startup(&settings);

    let service = web::Data::new(RelyingPartyService::new(settings.webauthn.clone()));
    let cors_origins = settings.get_cors_origins();

    HttpServer::new(move || {
        App::new()
            .app_data(service.clone())
            .wrap(cors(cors_origins.clone()))
            .wrap(Logger::default())
            .configure(configure_services)
    })
    .bind(&bind_address)?
    .run()
    .await
}

fn print_startup_info(bind_address: &str, settings: &CeremonySettings) {
    println!("Starting passkey verification gateway on http://{bind_address}");
    println!(
        "Relying party: {} ({}) for origin {}",
        settings.webauthn.rp_name, settings.webauthn.rp_id, settings.webauthn.rp_origin
    );
    println!();
    println!("Registration endpoints:");
    println!("  POST /api/register/options - Issue registration options and challenge");
    println!("  POST /api/register/verify  - Verify attestation and store credential");
    println!();
    println!("Authentication endpoints:");
    println!("  POST /api/auth/options     - Issue authentication options and challenge");
    println!("  POST /api/auth/verify      - Verify assertion");
    println!();
    println!("System endpoints:");
    println!("  GET  /ping                 - Health check");
}
