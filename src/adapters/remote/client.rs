//! Signing service client.
//!
//! Resolves API paths against the configured endpoint, sends them through a
//! [`Transport`], and turns the answer into either a decoded body or a
//! [`RestPkiError`] describing what the service reported.

use super::protocol::{ErrorModel, VALIDATION_ERROR_CODE};
use super::transport::{ApiRequest, ApiResponse, HttpTransport, RemoteServiceConfig, Transport};
use crate::domain::types::EndpointUrl;
use crate::domain::validation::ValidationResults;
use crate::infra::config::ClientConfiguration;
use crate::infra::error::{RestPkiError, RestPkiResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// HTTP status the service uses for structured, code-bearing errors
const UNPROCESSABLE_ENTITY: u16 = 422;

/// Client for the signing service.
///
/// Cloning is cheap; all clones share one transport (and its connection
/// pool). Starters, finishers and the preset helper borrow or clone it.
#[derive(Clone)]
pub struct RestPkiClient {
    endpoint: EndpointUrl,
    transport: Arc<dyn Transport>,
}

impl fmt::Debug for RestPkiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RestPkiClient")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl RestPkiClient {
    /// Create a client talking HTTPS through reqwest.
    ///
    /// # Errors
    /// Returns a configuration error if the HTTP client cannot be built.
    pub fn new(config: RemoteServiceConfig) -> RestPkiResult<Self> {
        let transport = HttpTransport::new(&config)?;
        log::info!("Using signing service at {}", config.endpoint);
        Ok(Self {
            endpoint: config.endpoint,
            transport: Arc::new(transport),
        })
    }

    /// Create a client from a loaded configuration file.
    ///
    /// # Errors
    /// Returns a configuration error for a missing or placeholder access
    /// token, an invalid endpoint or a zero timeout.
    pub fn from_configuration(configuration: &ClientConfiguration) -> RestPkiResult<Self> {
        Self::new(configuration.service_config()?)
    }

    /// Create a client over an arbitrary transport (mocks, instrumentation).
    #[must_use]
    pub fn with_transport(endpoint: EndpointUrl, transport: Arc<dyn Transport>) -> Self {
        Self {
            endpoint,
            transport,
        }
    }

    #[must_use]
    pub fn endpoint(&self) -> &EndpointUrl {
        &self.endpoint
    }

    /// POST a JSON body and decode the answer.
    ///
    /// # Errors
    /// Returns a transport error when the service is unreachable, and a
    /// remote error when it answers with a non-2xx status.
    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> RestPkiResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = serde_json::to_value(body)?;
        self.execute(ApiRequest::post(path, Some(body))).await
    }

    /// POST without a body and decode the answer.
    ///
    /// # Errors
    /// See [`RestPkiClient::post_json`].
    pub async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> RestPkiResult<T> {
        self.execute(ApiRequest::post(path, None)).await
    }

    /// GET with query parameters and decode the answer.
    ///
    /// # Errors
    /// See [`RestPkiClient::post_json`].
    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> RestPkiResult<T> {
        let request = query
            .iter()
            .fold(ApiRequest::get(path), |request, (key, value)| {
                request.with_query(*key, value.clone())
            });
        self.execute(request).await
    }

    async fn execute<T: DeserializeOwned>(&self, request: ApiRequest) -> RestPkiResult<T> {
        let verb = request.method.as_str();
        let path = request.path.clone();
        let response = self.transport.send(request).await?;
        Self::handle_response(verb, &path, response)
    }

    /// Check the status and parse the JSON body.
    fn handle_response<T: DeserializeOwned>(
        verb: &'static str,
        path: &str,
        response: ApiResponse,
    ) -> RestPkiResult<T> {
        if response.is_success() {
            let body = response.body.trim();
            let parsed = if body.is_empty() {
                serde_json::from_value(serde_json::Value::Null)
            } else {
                serde_json::from_str(body)
            };
            return parsed.map_err(|e| {
                RestPkiError::DecodeError(format!("Failed to parse response of {verb} {path}: {e}"))
            });
        }

        if response.status == UNPROCESSABLE_ENTITY {
            if let Ok(model) = serde_json::from_str::<ErrorModel>(&response.body) {
                if let Some(code) = model.code {
                    log::warn!("{verb} {path} rejected by the service with code {code}");
                    return Err(Self::map_error_code(
                        verb,
                        path,
                        code,
                        model.detail,
                        model.validation_results,
                    ));
                }
            }
        }

        log::warn!("{verb} {path} failed with HTTP {}", response.status);
        Err(RestPkiError::RemoteServiceError {
            verb,
            path: path.to_string(),
            status: response.status,
            body: response.body,
        })
    }

    fn map_error_code(
        verb: &'static str,
        path: &str,
        code: String,
        detail: Option<String>,
        validation_results: Option<ValidationResults>,
    ) -> RestPkiError {
        if code == VALIDATION_ERROR_CODE {
            RestPkiError::RemoteValidationError {
                verb,
                path: path.to_string(),
                results: Box::new(validation_results.unwrap_or_default()),
            }
        } else {
            RestPkiError::ServiceError {
                verb,
                path: path.to_string(),
                code,
                detail,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn response(status: u16, body: &str) -> ApiResponse {
        ApiResponse {
            status,
            body: body.to_string(),
        }
    }

    #[test]
    fn test_success_with_empty_body_decodes_as_null() {
        let value: Value =
            RestPkiClient::handle_response("POST", "Api/X", response(200, "")).unwrap();
        assert_eq!(value, Value::Null);
        let value: Option<Value> =
            RestPkiClient::handle_response("POST", "Api/X", response(204, "  ")).unwrap();
        assert!(value.is_none());
    }

    #[test]
    fn test_422_validation_error_carries_results() {
        let body = json!({
            "code": "ValidationError",
            "validationResults": {
                "errors": [{ "type": "CertificateRevoked", "message": "The certificate is revoked" }],
                "warnings": [],
                "passedChecks": []
            }
        })
        .to_string();
        let err = RestPkiClient::handle_response::<Value>("POST", "Api/PadesSignatures", response(422, &body))
            .unwrap_err();
        match err {
            RestPkiError::RemoteValidationError { results, path, .. } => {
                assert_eq!(path, "Api/PadesSignatures");
                assert!(!results.is_valid());
                assert_eq!(results.errors[0].message, "The certificate is revoked");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_422_other_code_is_service_error() {
        let body = json!({ "code": "SignaturePolicyNotFound", "detail": "no such policy" }).to_string();
        let err = RestPkiClient::handle_response::<Value>("POST", "Api/CadesSignatures", response(422, &body))
            .unwrap_err();
        assert!(matches!(
            &err,
            RestPkiError::ServiceError { code, detail: Some(d), .. }
                if code == "SignaturePolicyNotFound" && d == "no such policy"
        ));
        assert_eq!(err.status(), Some(422));
        assert!(!err.is_local());
    }

    #[test]
    fn test_other_statuses_keep_raw_body() {
        let err = RestPkiClient::handle_response::<Value>("GET", "Api/X", response(500, "boom"))
            .unwrap_err();
        assert!(matches!(
            err,
            RestPkiError::RemoteServiceError { status: 500, ref body, verb: "GET", .. } if body == "boom"
        ));

        // 422 without a code falls back to the raw error
        let err = RestPkiClient::handle_response::<Value>("GET", "Api/X", response(422, "{}"))
            .unwrap_err();
        assert!(matches!(err, RestPkiError::RemoteServiceError { status: 422, .. }));
    }

    #[test]
    fn test_malformed_success_body_is_decode_error() {
        let err = RestPkiClient::handle_response::<Value>("GET", "Api/X", response(200, "<html>"))
            .unwrap_err();
        assert!(matches!(err, RestPkiError::DecodeError(_)));
    }
}
