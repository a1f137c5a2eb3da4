//! Building blocks shared by every starter and finisher.
//!
//! A starter collects the request fields, validates them locally and issues
//! the start call; a finisher takes the returned token and issues the
//! finalize call. Both are single-use objects whose progress is tracked by a
//! [`SessionState`].

use crate::adapters::remote::protocol::{
    decode_b64, encode_b64, FinishRequest, FinishResponse, SignatureStartResponse,
};
use crate::adapters::remote::RestPkiClient;
use crate::domain::constants::finalize_path;
use crate::domain::session::{SessionState, SignatureKind};
use crate::domain::types::SessionToken;
use crate::infra::error::{RestPkiError, RestPkiResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::Path;

/// Read a document to sign fully into memory.
///
/// # Errors
/// Returns an IO error naming the path when the file cannot be read.
pub fn read_document(path: impl AsRef<Path>) -> RestPkiResult<Vec<u8>> {
    let path = path.as_ref();
    fs::read(path).map_err(|e| RestPkiError::IoError(format!("Failed to read {}: {e}", path.display())))
}

/// Write a signed artifact; the file handle is closed before returning.
///
/// # Errors
/// Returns an IO error naming the path when the file cannot be written.
pub fn write_artifact(path: impl AsRef<Path>, content: &[u8]) -> RestPkiResult<()> {
    let path = path.as_ref();
    fs::write(path, content)
        .map_err(|e| RestPkiError::IoError(format!("Failed to write {}: {e}", path.display())))?;
    log::info!("Wrote {} bytes to {}", content.len(), path.display());
    Ok(())
}

/// Common name of the signer, from the certificate model the service returns
#[must_use]
pub fn certificate_subject(certificate: &serde_json::Value) -> Option<&str> {
    certificate
        .get("subjectName")
        .and_then(|subject| subject.get("commonName"))
        .and_then(serde_json::Value::as_str)
}

/// Data to be signed with a key held by the caller (server-key flow)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureStartResult {
    pub token: Option<SessionToken>,
    /// Bytes to sign, for keys that hash internally
    pub to_sign_data: Vec<u8>,
    /// Precomputed digest of `to_sign_data`
    pub to_sign_hash: Vec<u8>,
    /// OID of the digest algorithm used for `to_sign_hash`
    pub digest_algorithm_oid: String,
}

impl SignatureStartResult {
    fn from_response(response: &SignatureStartResponse) -> RestPkiResult<Self> {
        let missing = |field: &str| {
            RestPkiError::DecodeError(format!("start response is missing {field}"))
        };
        Ok(Self {
            token: response.token.clone(),
            to_sign_data: decode_b64(
                "toSignData",
                response.to_sign_data.as_deref().ok_or_else(|| missing("toSignData"))?,
            )?,
            to_sign_hash: decode_b64(
                "toSignHash",
                response.to_sign_hash.as_deref().ok_or_else(|| missing("toSignHash"))?,
            )?,
            digest_algorithm_oid: response
                .digest_algorithm_oid
                .clone()
                .ok_or_else(|| missing("digestAlgorithmOid"))?,
        })
    }
}

/// Fields and state every starter carries
#[derive(Debug)]
pub(crate) struct StarterCommon {
    client: RestPkiClient,
    pub signature_policy_id: Option<String>,
    pub security_context_id: Option<String>,
    pub callback_argument: Option<String>,
    pub signer_certificate: Option<Vec<u8>>,
    state: SessionState,
    certificate_info: Option<serde_json::Value>,
}

impl StarterCommon {
    pub fn new(client: RestPkiClient) -> Self {
        Self {
            client,
            signature_policy_id: None,
            security_context_id: None,
            callback_argument: None,
            signer_certificate: None,
            state: SessionState::NotStarted,
            certificate_info: None,
        }
    }

    pub fn ensure_not_started(&self) -> RestPkiResult<()> {
        self.state.ensure_not_started("start")
    }

    pub fn require_policy(&self) -> RestPkiResult<String> {
        self.signature_policy_id
            .clone()
            .filter(|policy| !policy.is_empty())
            .ok_or_else(|| RestPkiError::ValidationError("The signature policy was not set".to_string()))
    }

    pub fn require_signer_certificate(&self) -> RestPkiResult<()> {
        match &self.signer_certificate {
            Some(certificate) if !certificate.is_empty() => Ok(()),
            _ => Err(RestPkiError::ValidationError(
                "The certificate was not set".to_string(),
            )),
        }
    }

    pub fn certificate_b64(&self) -> Option<String> {
        self.signer_certificate.as_deref().map(encode_b64)
    }

    /// Issue the start call and, if `with_key` is set, decode the data to
    /// sign. State only advances once everything decoded.
    pub async fn start<B: Serialize + Sync>(
        &mut self,
        kind: SignatureKind,
        body: &B,
        with_key: bool,
    ) -> RestPkiResult<(Option<SessionToken>, Option<SignatureStartResult>)> {
        let path = kind.start_path();
        log::debug!("Starting {kind} signature session");
        let response: SignatureStartResponse = self.client.post_json(&path, body).await?;

        let result = if with_key {
            Some(SignatureStartResult::from_response(&response)?)
        } else {
            None
        };

        if let Some(certificate) = response.certificate {
            self.certificate_info = Some(certificate);
        }
        self.state = SessionState::Started;
        log::info!(
            "{kind} signature session started{}",
            if response.token.is_some() { "" } else { " without a token" }
        );
        Ok((response.token, result))
    }

    pub fn certificate_info(&self) -> RestPkiResult<Option<&serde_json::Value>> {
        match self.state {
            SessionState::NotStarted => Err(RestPkiError::InvalidStateError(
                "The method certificate_info() can only be called after calling one of the start methods"
                    .to_string(),
            )),
            _ => Ok(self.certificate_info.as_ref()),
        }
    }
}

/// Token, state and results every finisher carries
#[derive(Debug)]
pub(crate) struct FinisherCore {
    client: RestPkiClient,
    kind: SignatureKind,
    token: Option<SessionToken>,
    signature: Option<Vec<u8>>,
    state: SessionState,
    certificate: Option<serde_json::Value>,
    callback_argument: Option<String>,
}

impl FinisherCore {
    pub fn new(client: RestPkiClient, kind: SignatureKind) -> Self {
        Self {
            client,
            kind,
            token: None,
            signature: None,
            state: SessionState::NotStarted,
            certificate: None,
            callback_argument: None,
        }
    }

    pub fn set_token(&mut self, token: SessionToken) {
        self.token = Some(token);
    }

    pub fn set_signature(&mut self, signature: Vec<u8>) {
        self.signature = Some(signature);
    }

    /// Issue the finalize call and return the decoded artifact.
    pub async fn finalize<R>(&mut self) -> RestPkiResult<Vec<u8>>
    where
        R: FinishResponse + DeserializeOwned,
    {
        self.state.ensure_not_finished("finish")?;
        let token = self
            .token
            .as_ref()
            .ok_or_else(|| RestPkiError::ValidationError("The token was not set".to_string()))?;
        let path = finalize_path(self.kind.finish_base(), token.as_str());

        let response: R = match &self.signature {
            None => self.client.post_empty(&path).await?,
            Some(signature) => {
                let body = FinishRequest {
                    signature: encode_b64(signature),
                };
                self.client.post_json(&path, &body).await?
            }
        };

        let (artifact, certificate, callback_argument) = response.into_parts();
        let artifact = artifact.ok_or_else(|| {
            RestPkiError::DecodeError(format!("finish response is missing {}", R::ARTIFACT_FIELD))
        })?;
        let content = decode_b64(R::ARTIFACT_FIELD, &artifact)?;

        self.certificate = certificate;
        self.callback_argument = callback_argument;
        self.state = SessionState::Finished;
        log::info!(
            "{} signature session finished ({} bytes)",
            self.kind,
            content.len()
        );
        Ok(content)
    }

    pub fn ensure_finished(&self, accessor: &str) -> RestPkiResult<()> {
        self.state.ensure_finished(accessor, "finish")
    }

    pub fn certificate(&self) -> RestPkiResult<Option<&serde_json::Value>> {
        self.ensure_finished("certificate")?;
        Ok(self.certificate.as_ref())
    }

    pub fn callback_argument(&self) -> RestPkiResult<Option<&str>> {
        self.ensure_finished("callback_argument")?;
        Ok(self.callback_argument.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_certificate_subject() {
        let certificate = json!({ "subjectName": { "commonName": "Alice" }, "serialNumber": "01" });
        assert_eq!(certificate_subject(&certificate), Some("Alice"));
        assert_eq!(certificate_subject(&json!({})), None);
    }

    #[test]
    fn test_start_result_requires_all_fields() {
        let response = SignatureStartResponse {
            token: Some(SessionToken::new("t1").unwrap()),
            to_sign_data: Some(encode_b64(b"data")),
            to_sign_hash: Some(encode_b64(&[1, 2, 3])),
            digest_algorithm_oid: Some("2.16.840.1.101.3.4.2.1".to_string()),
            certificate: None,
        };
        let result = SignatureStartResult::from_response(&response).unwrap();
        assert_eq!(result.to_sign_data, b"data");
        assert_eq!(result.to_sign_hash, vec![1, 2, 3]);

        let incomplete = SignatureStartResponse {
            to_sign_hash: None,
            ..response
        };
        assert!(matches!(
            SignatureStartResult::from_response(&incomplete),
            Err(RestPkiError::DecodeError(_))
        ));
    }

    #[test]
    fn test_document_io() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.pdf");
        write_artifact(&path, b"%PDF-1.7").unwrap();
        assert_eq!(read_document(&path).unwrap(), b"%PDF-1.7");

        let err = read_document(dir.path().join("missing.pdf")).unwrap_err();
        assert!(matches!(err, RestPkiError::IoError(msg) if msg.contains("missing.pdf")));
    }
}
