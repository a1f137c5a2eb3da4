//! Opening existing PDF and CMS signatures.
//!
//! An explorer uploads a signed file and receives its signers. With
//! validation enabled the service also validates every signer against the
//! given policy and security context and attaches the results.

use super::signature::read_document;
use crate::adapters::remote::protocol::{encode_b64, DataHash, FileModel, OpenSignatureRequest};
use crate::adapters::remote::RestPkiClient;
use crate::domain::constants::{
    CADES_OPEN_PATH, CADES_REQUIRED_HASHES_PATH, CMS_SIGNATURE_MIME_TYPE, PADES_OPEN_PATH,
    PDF_MIME_TYPE,
};
use crate::domain::digest::DigestAlgorithm;
use crate::domain::opened::OpenedSignature;
use crate::infra::error::{RestPkiError, RestPkiResult};
use std::path::Path;

/// Options shared by both explorers
#[derive(Debug)]
struct ExplorerCommon {
    client: RestPkiClient,
    signature_file: Option<Vec<u8>>,
    validate: bool,
    default_signature_policy_id: Option<String>,
    acceptable_explicit_policies: Option<Vec<String>>,
    security_context_id: Option<String>,
}

impl ExplorerCommon {
    fn new(client: RestPkiClient) -> Self {
        Self {
            client,
            signature_file: None,
            validate: false,
            default_signature_policy_id: None,
            acceptable_explicit_policies: None,
            security_context_id: None,
        }
    }

    fn require_signature_file(&self) -> RestPkiResult<&[u8]> {
        self.signature_file
            .as_deref()
            .filter(|content| !content.is_empty())
            .ok_or_else(|| {
                RestPkiError::ValidationError("The signature file to open was not set".to_string())
            })
    }

    fn request(
        &self,
        content: &[u8],
        mime_type: &str,
        data_hashes: Option<Vec<DataHash>>,
    ) -> OpenSignatureRequest {
        OpenSignatureRequest {
            file: FileModel {
                content: encode_b64(content),
                mime_type: mime_type.to_string(),
            },
            validate: self.validate,
            default_signature_policy_id: self.default_signature_policy_id.clone(),
            security_context_id: self.security_context_id.clone(),
            acceptable_explicit_policies: self.acceptable_explicit_policies.clone(),
            data_hashes,
        }
    }

    async fn open(&self, path: &str, request: &OpenSignatureRequest) -> RestPkiResult<OpenedSignature> {
        log::debug!("Opening signature file ({} validation)", if self.validate { "with" } else { "without" });
        let opened: OpenedSignature = self.client.post_json(path, request).await?;

        if self.validate {
            // a signer without results must never pass for a validated one
            if let Some(index) = opened
                .signers
                .iter()
                .position(|signer| signer.validation_results.is_none())
            {
                return Err(RestPkiError::DecodeError(format!(
                    "open response is missing validationResults for signer {index}"
                )));
            }
        }

        log::info!("Opened signature with {} signer(s)", opened.signers.len());
        for (index, signer) in opened.signers.iter().enumerate() {
            if let Some(results) = &signer.validation_results {
                if results.is_valid() {
                    log::info!("Signer {index}: {}", results.summary(0));
                } else {
                    log::warn!("Signer {index}: {}", results.summary(0));
                }
            }
        }
        Ok(opened)
    }
}

fn policy_list<I, S>(policies: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    policies.into_iter().map(|p| p.as_ref().to_string()).collect()
}

/// Opens a signed PDF and lists its signers
#[derive(Debug)]
pub struct PadesSignatureExplorer {
    common: ExplorerCommon,
}

impl PadesSignatureExplorer {
    #[must_use]
    pub fn new(client: RestPkiClient) -> Self {
        Self {
            common: ExplorerCommon::new(client),
        }
    }

    pub fn set_signature_file(&mut self, path: impl AsRef<Path>) -> RestPkiResult<&mut Self> {
        self.common.signature_file = Some(read_document(path)?);
        Ok(self)
    }

    pub fn set_signature_content(&mut self, content: impl Into<Vec<u8>>) -> &mut Self {
        self.common.signature_file = Some(content.into());
        self
    }

    /// Ask the service to validate every signer, not only list them
    pub fn set_validate(&mut self, validate: bool) -> &mut Self {
        self.common.validate = validate;
        self
    }

    /// Policy applied to signers that do not commit to an explicit one
    pub fn set_default_signature_policy(&mut self, policy_id: impl Into<String>) -> &mut Self {
        self.common.default_signature_policy_id = Some(policy_id.into());
        self
    }

    /// Explicit policies a signer may commit to, e.g.
    /// [`StandardSignaturePolicyCatalog::PKI_BRAZIL_PADES`](crate::StandardSignaturePolicyCatalog::PKI_BRAZIL_PADES)
    pub fn set_acceptable_explicit_policies<I, S>(&mut self, policies: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.common.acceptable_explicit_policies = Some(policy_list(policies));
        self
    }

    pub fn set_security_context(&mut self, context_id: impl Into<String>) -> &mut Self {
        self.common.security_context_id = Some(context_id.into());
        self
    }

    /// Upload the PDF and return its signers.
    ///
    /// # Errors
    /// Fails locally if no file was set. With validation enabled, a signer
    /// reported without validation results is a decode error.
    pub async fn open(&self) -> RestPkiResult<OpenedSignature> {
        let pdf = self.common.require_signature_file()?;
        let request = self.common.request(pdf, PDF_MIME_TYPE, None);
        self.common.open(PADES_OPEN_PATH, &request).await
    }
}

/// Opens a CMS signature, attached or detached, and lists its signers
#[derive(Debug)]
pub struct CadesSignatureExplorer {
    common: ExplorerCommon,
    data_file: Option<Vec<u8>>,
}

impl CadesSignatureExplorer {
    #[must_use]
    pub fn new(client: RestPkiClient) -> Self {
        Self {
            common: ExplorerCommon::new(client),
            data_file: None,
        }
    }

    pub fn set_signature_file(&mut self, path: impl AsRef<Path>) -> RestPkiResult<&mut Self> {
        self.common.signature_file = Some(read_document(path)?);
        Ok(self)
    }

    pub fn set_signature_content(&mut self, content: impl Into<Vec<u8>>) -> &mut Self {
        self.common.signature_file = Some(content.into());
        self
    }

    /// Signed data of a detached CMS. Only its digests are sent.
    pub fn set_data_file(&mut self, path: impl AsRef<Path>) -> RestPkiResult<&mut Self> {
        self.data_file = Some(read_document(path)?);
        Ok(self)
    }

    pub fn set_data_content(&mut self, content: impl Into<Vec<u8>>) -> &mut Self {
        self.data_file = Some(content.into());
        self
    }

    pub fn set_validate(&mut self, validate: bool) -> &mut Self {
        self.common.validate = validate;
        self
    }

    pub fn set_default_signature_policy(&mut self, policy_id: impl Into<String>) -> &mut Self {
        self.common.default_signature_policy_id = Some(policy_id.into());
        self
    }

    pub fn set_acceptable_explicit_policies<I, S>(&mut self, policies: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.common.acceptable_explicit_policies = Some(policy_list(policies));
        self
    }

    pub fn set_security_context(&mut self, context_id: impl Into<String>) -> &mut Self {
        self.common.security_context_id = Some(context_id.into());
        self
    }

    /// Upload the CMS and return its signers.
    ///
    /// When a data file is set, the service is first asked which digests it
    /// needs; those are computed locally and sent in place of the data.
    ///
    /// # Errors
    /// As [`PadesSignatureExplorer::open`]. A digest algorithm that cannot
    /// be computed locally is a validation error.
    pub async fn open(&self) -> RestPkiResult<OpenedSignature> {
        let cms = self.common.require_signature_file()?;
        let data_hashes = match self.data_file.as_deref() {
            Some(data) => self.data_hashes(cms, data).await?,
            None => None,
        };
        let request = self.common.request(cms, CMS_SIGNATURE_MIME_TYPE, data_hashes);
        self.common.open(CADES_OPEN_PATH, &request).await
    }

    async fn data_hashes(&self, cms: &[u8], data: &[u8]) -> RestPkiResult<Option<Vec<DataHash>>> {
        let body = FileModel {
            content: encode_b64(cms),
            mime_type: CMS_SIGNATURE_MIME_TYPE.to_string(),
        };
        let required: Option<Vec<DigestAlgorithm>> =
            self.common.client.post_json(CADES_REQUIRED_HASHES_PATH, &body).await?;
        let required = required.unwrap_or_default();
        if required.is_empty() {
            return Ok(None);
        }

        log::debug!(
            "Computing data hashes: {}",
            required.iter().map(DigestAlgorithm::name).collect::<Vec<_>>().join(", ")
        );
        let hashes = required
            .into_iter()
            .map(|algorithm| -> RestPkiResult<DataHash> {
                Ok(DataHash {
                    algorithm,
                    value: encode_b64(&algorithm.digest(data)?),
                })
            })
            .collect::<RestPkiResult<Vec<_>>>()?;
        Ok(Some(hashes))
    }
}
