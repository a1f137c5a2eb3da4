//! CAdES (CMS) signature sessions, including co-signing an existing CMS.

use super::signature::{
    read_document, write_artifact, FinisherCore, SignatureStartResult, StarterCommon,
};
use crate::adapters::remote::protocol::{encode_b64, CadesFinishResponse, CadesStartRequest};
use crate::adapters::remote::RestPkiClient;
use crate::domain::session::SignatureKind;
use crate::domain::types::SessionToken;
use crate::infra::error::{RestPkiError, RestPkiResult};
use std::path::Path;

/// Starts a CAdES signature over raw content or as a co-signature
#[derive(Debug)]
pub struct CadesSignatureStarter {
    common: StarterCommon,
    content_to_sign: Option<Vec<u8>>,
    cms_to_co_sign: Option<Vec<u8>>,
    encapsulate_content: bool,
}

impl CadesSignatureStarter {
    #[must_use]
    pub fn new(client: RestPkiClient) -> Self {
        Self {
            common: StarterCommon::new(client),
            content_to_sign: None,
            cms_to_co_sign: None,
            encapsulate_content: true,
        }
    }

    pub fn set_file_to_sign(&mut self, path: impl AsRef<Path>) -> RestPkiResult<&mut Self> {
        self.content_to_sign = Some(read_document(path)?);
        Ok(self)
    }

    pub fn set_content_to_sign(&mut self, content: impl Into<Vec<u8>>) -> &mut Self {
        self.content_to_sign = Some(content.into());
        self
    }

    /// Existing CMS whose signers are kept and joined by the new signature
    pub fn set_cms_file_to_co_sign(&mut self, path: impl AsRef<Path>) -> RestPkiResult<&mut Self> {
        self.cms_to_co_sign = Some(read_document(path)?);
        Ok(self)
    }

    pub fn set_cms_to_co_sign(&mut self, cms: impl Into<Vec<u8>>) -> &mut Self {
        self.cms_to_co_sign = Some(cms.into());
        self
    }

    /// Attached (`true`) or detached (`false`) signature
    pub fn set_encapsulate_content(&mut self, encapsulate: bool) -> &mut Self {
        self.encapsulate_content = encapsulate;
        self
    }

    pub fn set_signature_policy(&mut self, policy_id: impl Into<String>) -> &mut Self {
        self.common.signature_policy_id = Some(policy_id.into());
        self
    }

    pub fn set_security_context(&mut self, context_id: impl Into<String>) -> &mut Self {
        self.common.security_context_id = Some(context_id.into());
        self
    }

    pub fn set_callback_argument(&mut self, argument: impl Into<String>) -> &mut Self {
        self.common.callback_argument = Some(argument.into());
        self
    }

    pub fn set_signer_certificate(&mut self, certificate: impl Into<Vec<u8>>) -> &mut Self {
        self.common.signer_certificate = Some(certificate.into());
        self
    }

    fn build_request(&self) -> RestPkiResult<CadesStartRequest> {
        let content = self.content_to_sign.as_deref().filter(|c| !c.is_empty());
        let cms = self.cms_to_co_sign.as_deref().filter(|c| !c.is_empty());
        match (content, cms) {
            (None, None) => {
                return Err(RestPkiError::ValidationError(
                    "The content to sign was not set and no CMS to be co-signed was given"
                        .to_string(),
                ))
            }
            (Some(_), Some(_)) => {
                return Err(RestPkiError::ValidationError(
                    "Either the content to sign or the CMS to co-sign may be set, not both"
                        .to_string(),
                ))
            }
            _ => {}
        }
        let signature_policy_id = self.common.require_policy()?;

        Ok(CadesStartRequest {
            content_to_sign: content.map(encode_b64),
            cms_to_co_sign: cms.map(encode_b64),
            signature_policy_id,
            security_context_id: self.common.security_context_id.clone(),
            encapsulate_content: self.encapsulate_content,
            callback_argument: self.common.callback_argument.clone(),
            certificate: self.common.certificate_b64(),
        })
    }

    /// Start a session to be completed by the browser signing component.
    ///
    /// # Errors
    /// Local validation errors are raised before any request is sent.
    pub async fn start_with_webpki(&mut self) -> RestPkiResult<Option<SessionToken>> {
        self.common.ensure_not_started()?;
        let request = self.build_request()?;
        let (token, _) = self.common.start(SignatureKind::Cades, &request, false).await?;
        Ok(token)
    }

    /// Start a session whose data to sign is returned to the caller.
    ///
    /// # Errors
    /// As [`Self::start_with_webpki`]; additionally requires the signer
    /// certificate.
    pub async fn start(&mut self) -> RestPkiResult<SignatureStartResult> {
        self.common.ensure_not_started()?;
        self.common.require_signer_certificate()?;
        let request = self.build_request()?;
        let (_, result) = self.common.start(SignatureKind::Cades, &request, true).await?;
        result.ok_or_else(|| RestPkiError::DecodeError("start response carried no data to sign".to_string()))
    }

    pub fn certificate_info(&self) -> RestPkiResult<Option<&serde_json::Value>> {
        self.common.certificate_info()
    }
}

/// Finishes a CAdES signature and holds the resulting CMS
#[derive(Debug)]
pub struct CadesSignatureFinisher {
    core: FinisherCore,
    cms: Option<Vec<u8>>,
}

impl CadesSignatureFinisher {
    #[must_use]
    pub fn new(client: RestPkiClient) -> Self {
        Self {
            core: FinisherCore::new(client, SignatureKind::Cades),
            cms: None,
        }
    }

    pub fn set_token(&mut self, token: SessionToken) -> &mut Self {
        self.core.set_token(token);
        self
    }

    pub fn set_signature(&mut self, signature: impl Into<Vec<u8>>) -> &mut Self {
        self.core.set_signature(signature.into());
        self
    }

    /// Finalize the session and return the CMS.
    ///
    /// # Errors
    /// Fails locally if no token was set or the session was already
    /// finished; otherwise reports what the service answered.
    pub async fn finish(&mut self) -> RestPkiResult<&[u8]> {
        let content = self.core.finalize::<CadesFinishResponse>().await?;
        Ok(self.cms.insert(content).as_slice())
    }

    pub fn cms(&self) -> RestPkiResult<&[u8]> {
        self.core.ensure_finished("cms")?;
        Ok(self.cms.as_deref().unwrap_or_default())
    }

    pub fn certificate(&self) -> RestPkiResult<Option<&serde_json::Value>> {
        self.core.certificate()
    }

    pub fn callback_argument(&self) -> RestPkiResult<Option<&str>> {
        self.core.callback_argument()
    }

    pub fn write_cms_to_path(&self, path: impl AsRef<Path>) -> RestPkiResult<()> {
        self.core.ensure_finished("write_cms_to_path")?;
        write_artifact(path, self.cms.as_deref().unwrap_or_default())
    }
}
