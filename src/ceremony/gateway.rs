//! Verification gateway client
//!
//! The gateway issues ceremony options and verifies the signed responses. The
//! `VerificationGateway` trait is the seam the ceremony client depends on;
//! `HttpGateway` talks JSON over HTTP to the four gateway endpoints.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use url::Url;

use crate::webauthn::{
    AuthenticationCredential, AuthenticationOptions, CeremonyKind, OptionsRequest,
    RegistrationCredential, RegistrationOptions, VerificationVerdict, VerifyRequest,
};

/// Failures talking to the gateway
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// The configured base URL cannot be used
    #[error("invalid gateway URL: {0}")]
    InvalidBaseUrl(String),
    /// Connection, TLS or transfer failure
    #[error("gateway unreachable: {0}")]
    Unreachable(String),
    /// The gateway answered with a non-success status
    #[error("gateway returned HTTP {status}")]
    Status { status: u16, body: String },
    /// The body did not have the expected shape
    #[error("malformed gateway response: {0}")]
    Malformed(String),
}

impl GatewayError {
    /// Whether the gateway was reached and explicitly refused the request
    #[must_use]
    pub fn is_rejection(&self) -> bool {
        matches!(self, GatewayError::Status { status, .. } if (400..500).contains(status))
    }
}

/// Verification gateway operations consumed by the ceremony client
#[async_trait]
pub trait VerificationGateway: Send + Sync {
    /// Fetch registration options (fresh challenge) for an identity
    ///
    /// # Errors
    ///
    /// Returns an error if the gateway is unreachable, refuses, or answers malformed JSON
    async fn registration_options(&self, email: &str) -> Result<RegistrationOptions, GatewayError>;

    /// Submit an attestation for verification
    ///
    /// # Errors
    ///
    /// Returns an error if the gateway is unreachable, refuses, or answers malformed JSON
    async fn verify_registration(
        &self,
        request: &VerifyRequest<RegistrationCredential>,
    ) -> Result<VerificationVerdict, GatewayError>;

    /// Fetch authentication options (fresh challenge) for an identity
    ///
    /// # Errors
    ///
    /// Returns an error if the gateway is unreachable, refuses, or answers malformed JSON
    async fn authentication_options(
        &self,
        email: &str,
    ) -> Result<AuthenticationOptions, GatewayError>;

    /// Submit an assertion for verification
    ///
    /// # Errors
    ///
    /// Returns an error if the gateway is unreachable, refuses, or answers malformed JSON
    async fn verify_authentication(
        &self,
        request: &VerifyRequest<AuthenticationCredential>,
    ) -> Result<VerificationVerdict, GatewayError>;
}

/// JSON-over-HTTP gateway client
#[derive(Debug, Clone)]
pub struct HttpGateway {
    http_client: reqwest::Client,
    base_url: Url,
}

impl HttpGateway {
    /// Create a gateway client for the given base URL
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::InvalidBaseUrl` if the URL does not parse or is not HTTP(S)
    pub fn new(base_url: &str) -> Result<Self, GatewayError> {
        Self::with_client(base_url, reqwest::Client::new())
    }

    /// Create a gateway client reusing an existing `reqwest` client
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::InvalidBaseUrl` if the URL does not parse or is not HTTP(S)
    pub fn with_client(base_url: &str, http_client: reqwest::Client) -> Result<Self, GatewayError> {
        // A trailing slash keeps any path prefix when joining endpoint paths
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{base_url}/")
        };
        let base_url =
            Url::parse(&normalized).map_err(|e| GatewayError::InvalidBaseUrl(e.to_string()))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(GatewayError::InvalidBaseUrl(format!(
                "unsupported scheme {}",
                base_url.scheme()
            )));
        }
        Ok(Self {
            http_client,
            base_url,
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Endpoint URL for a ceremony action ("options" or "verify")
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::InvalidBaseUrl` if the path cannot be joined
    pub fn endpoint(&self, kind: CeremonyKind, action: &str) -> Result<Url, GatewayError> {
        self.base_url
            .join(&format!("api/{}/{action}", kind.endpoint_segment()))
            .map_err(|e| GatewayError::InvalidBaseUrl(e.to_string()))
    }

    async fn post_json<B, T>(&self, url: Url, body: &B) -> Result<T, GatewayError>
    where
        B: Serialize + Sync + ?Sized,
        T: DeserializeOwned,
    {
        log::debug!("POST {url}");
        let response = self
            .http_client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| GatewayError::Unreachable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| GatewayError::Unreachable(e.to_string()))?;
        serde_json::from_slice(&bytes).map_err(|e| GatewayError::Malformed(e.to_string()))
    }
}

#[async_trait]
impl VerificationGateway for HttpGateway {
    async fn registration_options(&self, email: &str) -> Result<RegistrationOptions, GatewayError> {
        let url = self.endpoint(CeremonyKind::Registration, "options")?;
        let body = OptionsRequest {
            email: email.to_string(),
        };
        self.post_json(url, &body).await
    }

    async fn verify_registration(
        &self,
        request: &VerifyRequest<RegistrationCredential>,
    ) -> Result<VerificationVerdict, GatewayError> {
        let url = self.endpoint(CeremonyKind::Registration, "verify")?;
        self.post_json(url, request).await
    }

    async fn authentication_options(
        &self,
        email: &str,
    ) -> Result<AuthenticationOptions, GatewayError> {
        let url = self.endpoint(CeremonyKind::Authentication, "options")?;
        let body = OptionsRequest {
            email: email.to_string(),
        };
        self.post_json(url, &body).await
    }

    async fn verify_authentication(
        &self,
        request: &VerifyRequest<AuthenticationCredential>,
    ) -> Result<VerificationVerdict, GatewayError> {
        let url = self.endpoint(CeremonyKind::Authentication, "verify")?;
        self.post_json(url, request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoints_follow_gateway_layout() {
        let gateway = HttpGateway::new("http://localhost:8000").unwrap();
        assert_eq!(
            gateway
                .endpoint(CeremonyKind::Registration, "options")
                .unwrap()
                .as_str(),
            "http://localhost:8000/api/register/options"
        );
        assert_eq!(
            gateway
                .endpoint(CeremonyKind::Authentication, "verify")
                .unwrap()
                .as_str(),
            "http://localhost:8000/api/auth/verify"
        );
    }

    #[test]
    fn test_base_path_prefix_is_kept() {
        let gateway = HttpGateway::new("https://example.com/passkeys").unwrap();
        assert_eq!(
            gateway
                .endpoint(CeremonyKind::Registration, "verify")
                .unwrap()
                .as_str(),
            "https://example.com/passkeys/api/register/verify"
        );
    }

    #[test]
    fn test_invalid_base_urls_are_rejected() {
        assert!(matches!(
            HttpGateway::new("not a url"),
            Err(GatewayError::InvalidBaseUrl(_))
        ));
        assert!(matches!(
            HttpGateway::new("ftp://example.com"),
            Err(GatewayError::InvalidBaseUrl(_))
        ));
    }

    #[test]
    fn test_only_client_errors_count_as_rejections() {
        let rejected = GatewayError::Status {
            status: 404,
            body: String::new(),
        };
        let failed = GatewayError::Status {
            status: 503,
            body: String::new(),
        };
        assert!(rejected.is_rejection());
        assert!(!failed.is_rejection());
        assert!(!GatewayError::Unreachable("refused".to_string()).is_rejection());
    }

    #[tokio::test]
    async fn test_unreachable_gateway_is_reported() {
        // Port 9 (discard) is not served on loopback in test environments
        let gateway = HttpGateway::new("http://127.0.0.1:9").unwrap();
        let result = gateway.registration_options("alice@example.com").await;
        assert!(matches!(result, Err(GatewayError::Unreachable(_))));
    }
}
