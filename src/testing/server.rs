//! Reference gateway served over loopback HTTP for end-to-end tests
//!
//! Must be started from inside an actix system (`#[actix_web::test]`).

use actix_web::dev::ServerHandle;
use actix_web::{middleware::Logger, web, App, HttpServer};

use crate::relying_party::{configure_services, RelyingPartyService};
use crate::webauthn::WebAuthnSettings;

pub struct TestGatewayServer {
    base_url: String,
    service: RelyingPartyService,
    handle: ServerHandle,
}

impl TestGatewayServer {
    /// Bind an ephemeral loopback port and start serving
    ///
    /// # Errors
    ///
    /// Returns an error if the listener cannot be bound
    pub async fn start(settings: WebAuthnSettings) -> std::io::Result<Self> {
        let service = RelyingPartyService::new(settings);
        let data = web::Data::new(service.clone());

        let server = HttpServer::new(move || {
            App::new()
                .app_data(data.clone())
                .wrap(Logger::default())
                .configure(configure_services)
        })
        .workers(1)
        .bind(("127.0.0.1", 0))?;

        let addr = server
            .addrs()
            .first()
            .copied()
            .ok_or_else(|| std::io::Error::other("server has no bound address"))?;
        let server = server.run();
        let handle = server.handle();
        actix_web::rt::spawn(server);

        Ok(Self {
            base_url: format!("http://{addr}"),
            service,
            handle,
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The service behind the server, sharing its store
    #[must_use]
    pub fn service(&self) -> &RelyingPartyService {
        &self.service
    }

    /// Stop accepting connections and wait for workers to finish
    pub async fn stop(self) {
        self.handle.stop(true).await;
    }
}
