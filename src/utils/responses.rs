//! HTTP response helpers for the reference gateway
//!
//! Error bodies share one shape, `{"error": <code>, "message": <text>}`, which the
//! ceremony client reads back as the rejection reason.

use actix_web::{http::header, HttpResponse};
use serde_json::{json, Value};

/// Unified response builder
pub struct ResponseBuilder;

impl ResponseBuilder {
    /// Create a `BadRequest` (400) error response with optional customization
    #[must_use]
    pub fn bad_request() -> ErrorResponseBuilder {
        ErrorResponseBuilder::new(ErrorType::BadRequest)
    }

    /// Create a `NotFound` (404) error response with optional customization
    #[must_use]
    pub fn not_found() -> ErrorResponseBuilder {
        ErrorResponseBuilder::new(ErrorType::NotFound)
    }

    /// Create an `InternalServerError` (500) error response with optional customization
    #[must_use]
    pub fn internal_server_error() -> ErrorResponseBuilder {
        ErrorResponseBuilder::new(ErrorType::InternalServerError)
    }

    /// 200 with a JSON body
    #[must_use]
    pub fn ok_json<T: serde::Serialize>(data: &T) -> HttpResponse {
        HttpResponse::Ok().json(data)
    }

    /// Malformed JSON request body
    #[must_use]
    pub fn decoding_failed(detail: &str) -> HttpResponse {
        Self::bad_request()
            .with_error_code("invalid_request")
            .with_message(&format!("Failed to decode request body: {detail}"))
            .build()
    }
}

/// Builder for error responses with fluent interface
pub struct ErrorResponseBuilder {
    error_type: ErrorType,
    error_code: Option<String>,
    message: Option<String>,
}

/// Supported HTTP error response types
#[derive(Clone, Copy)]
enum ErrorType {
    BadRequest,
    NotFound,
    InternalServerError,
}

impl ErrorResponseBuilder {
    fn new(error_type: ErrorType) -> Self {
        Self {
            error_type,
            error_code: None,
            message: None,
        }
    }

    /// Set a custom error code (e.g., "`unknown_user`")
    #[must_use]
    pub fn with_error_code(mut self, code: &str) -> Self {
        self.error_code = Some(code.to_string());
        self
    }

    /// Set a custom error message
    #[must_use]
    pub fn with_message(mut self, message: &str) -> Self {
        self.message = Some(message.to_string());
        self
    }

    /// Build the final `HttpResponse`
    #[must_use]
    pub fn build(self) -> HttpResponse {
        let error_code = self
            .error_code
            .unwrap_or_else(|| self.error_type.default_error_code().to_string());
        let message = self
            .message
            .unwrap_or_else(|| self.error_type.default_message().to_string());
        let body: Value = json!({
            "error": error_code,
            "message": message,
        });

        let mut response = match self.error_type {
            ErrorType::BadRequest => HttpResponse::BadRequest(),
            ErrorType::NotFound => HttpResponse::NotFound(),
            ErrorType::InternalServerError => HttpResponse::InternalServerError(),
        };
        response
            .insert_header((header::CONTENT_TYPE, "application/json"))
            .json(body)
    }
}

impl ErrorType {
    fn default_error_code(self) -> &'static str {
        match self {
            ErrorType::BadRequest => "invalid_request",
            ErrorType::NotFound => "not_found",
            ErrorType::InternalServerError => "server_error",
        }
    }

    fn default_message(self) -> &'static str {
        match self {
            ErrorType::BadRequest => "The request is malformed or invalid",
            ErrorType::NotFound => "The requested resource was not found",
            ErrorType::InternalServerError => "An internal server error occurred",
        }
    }
}
