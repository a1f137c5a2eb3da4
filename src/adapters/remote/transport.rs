//! HTTP transport to the signing service.
//!
//! The [`Transport`] trait is the seam between the protocol code and the
//! network: one call is one HTTP exchange, with no retries. The production
//! implementation is [`HttpTransport`] (reqwest); tests substitute a
//! recording mock.

use crate::domain::types::{AccessToken, EndpointUrl};
use crate::infra::error::{RestPkiError, RestPkiResult};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use std::time::Duration;

/// HTTP verb used by the signing service API
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

impl HttpMethod {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
        }
    }
}

/// One request, relative to the configured endpoint
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: HttpMethod,
    /// Path such as `Api/PadesSignatures`, without leading slash
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
}

impl ApiRequest {
    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Get,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    #[must_use]
    pub fn post(path: impl Into<String>, body: Option<serde_json::Value>) -> Self {
        Self {
            method: HttpMethod::Post,
            path: path.into(),
            query: Vec::new(),
            body,
        }
    }

    #[must_use]
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }
}

/// Raw answer: status code and body text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// One HTTP exchange with the signing service.
///
/// Implementations attach credentials and content negotiation headers and
/// report connectivity failures as [`RestPkiError::TransportError`]. Non-2xx
/// statuses are NOT errors at this level; they are returned as responses.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: ApiRequest) -> RestPkiResult<ApiResponse>;
}

/// Configuration for connecting to the signing service.
#[derive(Debug, Clone)]
pub struct RemoteServiceConfig {
    /// Base URL of the service (e.g., `https://pki.rest/`).
    pub endpoint: EndpointUrl,
    /// Bearer token for authentication.
    pub access_token: AccessToken,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Whether to verify TLS certificates (should be true in production).
    pub verify_tls: bool,
    /// Value of the `User-Agent` header.
    pub user_agent: String,
}

impl RemoteServiceConfig {
    /// Create a new configuration.
    ///
    /// # Errors
    /// Returns a configuration error for an invalid URL or a placeholder
    /// access token.
    pub fn new(endpoint: impl AsRef<str>, access_token: impl AsRef<str>) -> RestPkiResult<Self> {
        Ok(Self {
            endpoint: EndpointUrl::new(endpoint)?,
            access_token: AccessToken::new(access_token)?,
            timeout_secs: crate::domain::constants::DEFAULT_TIMEOUT_SECS,
            verify_tls: true,
            user_agent: format!("restpki-client/{}", env!("CARGO_PKG_VERSION")),
        })
    }

    /// Set the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Disable TLS verification (for testing only!).
    #[must_use]
    pub fn with_insecure_tls(mut self) -> Self {
        self.verify_tls = false;
        self
    }

    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

/// reqwest-backed transport
pub struct HttpTransport {
    endpoint: EndpointUrl,
    client: reqwest::Client,
}

impl HttpTransport {
    /// Create a new HTTP transport.
    ///
    /// The bearer and JSON headers are computed once here and sent with
    /// every request.
    ///
    /// # Errors
    /// Returns error if HTTP client creation fails.
    pub fn new(config: &RemoteServiceConfig) -> RestPkiResult<Self> {
        if config.timeout_secs == 0 {
            return Err(RestPkiError::ConfigurationError(
                "Request timeout must be greater than 0".to_string(),
            ));
        }

        let mut authorization = HeaderValue::from_str(&config.access_token.bearer_header())
            .map_err(|_| {
                RestPkiError::ConfigurationError(
                    "The API access token contains characters not allowed in a header".to_string(),
                )
            })?;
        authorization.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, authorization);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .danger_accept_invalid_certs(!config.verify_tls)
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .build()
            .map_err(|e| {
                RestPkiError::ConfigurationError(format!("Failed to create HTTP client: {e}"))
            })?;

        Ok(Self {
            endpoint: config.endpoint.clone(),
            client,
        })
    }

    #[must_use]
    pub fn endpoint(&self) -> &EndpointUrl {
        &self.endpoint
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: ApiRequest) -> RestPkiResult<ApiResponse> {
        let url = self.endpoint.join(&request.path);
        let mut builder = match request.method {
            HttpMethod::Get => self.client.get(&url),
            HttpMethod::Post => self.client.post(&url),
        };
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            let bytes = serde_json::to_vec(body)?;
            log::debug!(
                "{} {} ({} bytes)",
                request.method.as_str(),
                request.path,
                bytes.len()
            );
            builder = builder.body(bytes);
        } else {
            log::debug!("{} {}", request.method.as_str(), request.path);
        }

        let response = builder.send().await.map_err(|e| {
            RestPkiError::TransportError(format!(
                "{} {} unreachable: {e}",
                request.method.as_str(),
                request.path
            ))
        })?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| {
            RestPkiError::TransportError(format!("Failed to read response body: {e}"))
        })?;
        log::debug!("{} {} -> HTTP {status}", request.method.as_str(), request.path);

        Ok(ApiResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = RemoteServiceConfig::new("https://pki.rest", "secret-token")
            .unwrap()
            .with_timeout(60)
            .with_insecure_tls();

        assert_eq!(config.endpoint.as_str(), "https://pki.rest/");
        assert_eq!(config.access_token.expose(), "secret-token");
        assert_eq!(config.timeout_secs, 60);
        assert!(!config.verify_tls);
    }

    #[test]
    fn test_placeholder_token_fails_fast() {
        let err = RemoteServiceConfig::new("https://pki.rest/", "PLACE YOUR API ACCESS TOKEN HERE")
            .unwrap_err();
        assert!(matches!(err, RestPkiError::ConfigurationError(_)));
    }

    #[test]
    fn test_zero_timeout_is_rejected() {
        let config = RemoteServiceConfig::new("https://pki.rest/", "t")
            .unwrap()
            .with_timeout(0);
        assert!(matches!(
            HttpTransport::new(&config),
            Err(RestPkiError::ConfigurationError(_))
        ));
    }

    #[test]
    fn test_request_builders() {
        let request = ApiRequest::get("Api/PadesVisualPositioningPresets/Footnote")
            .with_query("pageNumber", "-1")
            .with_query("rows", "2");
        assert_eq!(request.method, HttpMethod::Get);
        assert_eq!(request.query.len(), 2);
        assert!(ApiResponse {
            status: 204,
            body: String::new()
        }
        .is_success());
        assert!(!ApiResponse {
            status: 302,
            body: String::new()
        }
        .is_success());
    }
}
