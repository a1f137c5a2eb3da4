//! Certificate authentication.
//!
//! The service issues a nonce-bearing token, the browser component signs it
//! with the user's key, and completing the token yields the validation
//! results of the user's certificate.

use crate::adapters::remote::protocol::{
    AuthenticationFinishResponse, AuthenticationStartRequest, SignatureStartResponse,
};
use crate::adapters::remote::RestPkiClient;
use crate::domain::constants::{finalize_path, AUTHENTICATIONS_PATH};
use crate::domain::session::{SessionState, SignatureKind};
use crate::domain::types::SessionToken;
use crate::domain::validation::ValidationResults;
use crate::infra::error::{RestPkiError, RestPkiResult};

#[derive(Debug)]
pub struct Authenticator {
    client: RestPkiClient,
    state: SessionState,
    certificate: Option<serde_json::Value>,
}

impl Authenticator {
    #[must_use]
    pub fn new(client: RestPkiClient) -> Self {
        Self {
            client,
            state: SessionState::NotStarted,
            certificate: None,
        }
    }

    /// Ask the service for an authentication token.
    ///
    /// # Errors
    /// Returns a validation error for an empty security context, or the
    /// remote failure.
    pub async fn start_with_webpki(
        &self,
        security_context_id: impl Into<String>,
    ) -> RestPkiResult<Option<SessionToken>> {
        let security_context_id = security_context_id.into();
        if security_context_id.trim().is_empty() {
            return Err(RestPkiError::ValidationError(
                "The security context was not set".to_string(),
            ));
        }
        let request = AuthenticationStartRequest {
            security_context_id,
        };
        let response: SignatureStartResponse = self
            .client
            .post_json(&SignatureKind::Authentication.start_path(), &request)
            .await?;
        log::info!("Authentication started");
        Ok(response.token)
    }

    /// Complete an authentication and return the certificate validation.
    ///
    /// The returned results may be invalid; callers decide whether to let
    /// the user in.
    ///
    /// # Errors
    /// Fails locally when called twice on the same object, and with a
    /// decode error when the service sends no validation results.
    pub async fn complete_with_webpki(
        &mut self,
        token: &SessionToken,
    ) -> RestPkiResult<ValidationResults> {
        self.state.ensure_not_finished("complete_with_webpki")?;
        let path = finalize_path(AUTHENTICATIONS_PATH, token.as_str());
        let response: AuthenticationFinishResponse = self.client.post_empty(&path).await?;

        // no results must never read as a clean validation
        let results = response.validation_results.ok_or_else(|| {
            RestPkiError::DecodeError("finish response is missing validationResults".to_string())
        })?;
        self.certificate = response.certificate;
        self.state = SessionState::Finished;

        if results.is_valid() {
            log::info!("Authentication completed: {}", results.summary(0));
        } else {
            log::warn!("Authentication completed with errors: {}", results.summary(0));
        }
        Ok(results)
    }

    /// Certificate the user authenticated with, if the service returned one
    pub fn certificate(&self) -> RestPkiResult<Option<&serde_json::Value>> {
        self.state
            .ensure_finished("certificate", "complete_with_webpki")?;
        Ok(self.certificate.as_ref())
    }
}
