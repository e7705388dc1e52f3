//! Reference gateway HTTP handlers
//!
//! Four JSON endpoints under `/api` plus a health check. Handlers only translate
//! between HTTP and `RelyingPartyService`.

use actix_cors::Cors;
use actix_web::{error::InternalError, web, HttpResponse};
use serde::Serialize;

use crate::utils::responses::ResponseBuilder;
use crate::webauthn::{
    AuthenticationCredential, OptionsRequest, RegistrationCredential, VerifyRequest,
};
use crate::VERSION;

use super::errors::RelyingPartyError;
use super::service::RelyingPartyService;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// Health check endpoint
///
/// # Errors
/// Never fails; the `Result` keeps the handler signature uniform
pub async fn health() -> Result<HttpResponse, RelyingPartyError> {
    Ok(ResponseBuilder::ok_json(&HealthResponse {
        status: "ok",
        version: VERSION,
    }))
}

/// `POST /api/register/options`
///
/// # Errors
/// Returns a `RelyingPartyError` rendered as a JSON error response
pub async fn register_options(
    service: web::Data<RelyingPartyService>,
    body: web::Json<OptionsRequest>,
) -> Result<HttpResponse, RelyingPartyError> {
    let options = service.registration_options(&body.email).await?;
    Ok(ResponseBuilder::ok_json(&options))
}

/// `POST /api/register/verify`
///
/// # Errors
/// Returns a `RelyingPartyError` rendered as a JSON error response
pub async fn register_verify(
    service: web::Data<RelyingPartyService>,
    body: web::Json<VerifyRequest<RegistrationCredential>>,
) -> Result<HttpResponse, RelyingPartyError> {
    let verdict = service.verify_registration(&body).await?;
    Ok(ResponseBuilder::ok_json(&verdict))
}

/// `POST /api/auth/options`
///
/// # Errors
/// Returns a `RelyingPartyError` rendered as a JSON error response
pub async fn auth_options(
    service: web::Data<RelyingPartyService>,
    body: web::Json<OptionsRequest>,
) -> Result<HttpResponse, RelyingPartyError> {
    let options = service.authentication_options(&body.email).await?;
    Ok(ResponseBuilder::ok_json(&options))
}

/// `POST /api/auth/verify`
///
/// # Errors
/// Returns a `RelyingPartyError` rendered as a JSON error response
pub async fn auth_verify(
    service: web::Data<RelyingPartyService>,
    body: web::Json<VerifyRequest<AuthenticationCredential>>,
) -> Result<HttpResponse, RelyingPartyError> {
    let verdict = service.verify_authentication(&body).await?;
    Ok(ResponseBuilder::ok_json(&verdict))
}

/// Register the gateway routes; the service must be provided as `web::Data`
pub fn configure_services(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        .route("/api/register/options", web::post().to(register_options))
        .route("/api/register/verify", web::post().to(register_verify))
        .route("/api/auth/options", web::post().to(auth_options))
        .route("/api/auth/verify", web::post().to(auth_verify))
        .route("/ping", web::get().to(health));
}

/// Malformed request bodies answer 400 in the common error shape
fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        let response = ResponseBuilder::decoding_failed(&err.to_string());
        InternalError::from_response(err, response).into()
    })
}

/// CORS policy restricted to the configured origins
#[must_use]
pub fn cors(allowed_origins: Vec<String>) -> Cors {
    Cors::default()
        .allowed_origin_fn(move |origin, _| {
            allowed_origins
                .iter()
                .any(|allowed| allowed == origin.to_str().unwrap_or(""))
        })
        .allowed_methods(vec!["GET", "POST", "OPTIONS"])
        .allowed_headers(vec!["Content-Type", "Accept"])
        .supports_credentials()
        .max_age(3600)
}
