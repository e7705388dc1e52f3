//! Reference gateway error types

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use thiserror::Error;

use crate::utils::responses::ResponseBuilder;
use crate::webauthn::WebAuthnError;

/// Failures that end a gateway request without a verdict
///
/// A response that merely fails verification is not an error: it yields
/// `{"verified": false}`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RelyingPartyError {
    #[error("User not found")]
    UnknownUser(String),

    #[error("No credentials registered")]
    NoCredentials(String),

    #[error("{0}")]
    InvalidRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl RelyingPartyError {
    /// Machine-readable code carried in the `error` field
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            RelyingPartyError::UnknownUser(_) => "unknown_user",
            RelyingPartyError::NoCredentials(_) => "no_credentials",
            RelyingPartyError::InvalidRequest(_) => "invalid_request",
            RelyingPartyError::Internal(_) => "server_error",
        }
    }
}

impl From<WebAuthnError> for RelyingPartyError {
    fn from(error: WebAuthnError) -> Self {
        RelyingPartyError::Internal(error.to_string())
    }
}

impl ResponseError for RelyingPartyError {
    fn status_code(&self) -> StatusCode {
        match self {
            RelyingPartyError::UnknownUser(_) | RelyingPartyError::NoCredentials(_) => {
                StatusCode::NOT_FOUND
            }
            RelyingPartyError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            RelyingPartyError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let builder = match self {
            RelyingPartyError::UnknownUser(_) | RelyingPartyError::NoCredentials(_) => {
                ResponseBuilder::not_found()
            }
            RelyingPartyError::InvalidRequest(_) => ResponseBuilder::bad_request(),
            // Internal details stay in the log
            RelyingPartyError::Internal(detail) => {
                log::error!("Gateway internal error: {detail}");
                return ResponseBuilder::internal_server_error().build();
            }
        };
        builder
            .with_error_code(self.error_code())
            .with_message(&self.to_string())
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            RelyingPartyError::UnknownUser("a@b.c".to_string()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            RelyingPartyError::NoCredentials("a@b.c".to_string()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            RelyingPartyError::InvalidRequest("email is required".to_string()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            RelyingPartyError::from(WebAuthnError::InternalError("rng".to_string()))
                .status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_error_response_status_matches() {
        let error = RelyingPartyError::NoCredentials("a@b.c".to_string());
        assert_eq!(error.error_response().status(), StatusCode::NOT_FOUND);
        assert_eq!(error.error_code(), "no_credentials");
    }
}
