//! PAdES (PDF) signature sessions.

use super::signature::{
    read_document, write_artifact, FinisherCore, SignatureStartResult, StarterCommon,
};
use crate::adapters::remote::protocol::{encode_b64, PadesFinishResponse, PadesStartRequest};
use crate::adapters::remote::RestPkiClient;
use crate::domain::session::SignatureKind;
use crate::domain::types::SessionToken;
use crate::domain::visual::{MeasurementUnits, VisualRepresentation};
use crate::infra::error::{RestPkiError, RestPkiResult};
use std::path::Path;

/// Starts a PAdES signature of one PDF
#[derive(Debug)]
pub struct PadesSignatureStarter {
    common: StarterCommon,
    pdf_to_sign: Option<Vec<u8>>,
    visual_representation: Option<VisualRepresentation>,
    measurement_units: Option<MeasurementUnits>,
    bypass_marks_if_signed: bool,
}

impl PadesSignatureStarter {
    #[must_use]
    pub fn new(client: RestPkiClient) -> Self {
        Self {
            common: StarterCommon::new(client),
            pdf_to_sign: None,
            visual_representation: None,
            measurement_units: None,
            bypass_marks_if_signed: true,
        }
    }

    /// Read the PDF from disk now; the file is not kept open
    pub fn set_pdf_to_sign_path(&mut self, path: impl AsRef<Path>) -> RestPkiResult<&mut Self> {
        self.pdf_to_sign = Some(read_document(path)?);
        Ok(self)
    }

    pub fn set_pdf_to_sign_content(&mut self, content: impl Into<Vec<u8>>) -> &mut Self {
        self.pdf_to_sign = Some(content.into());
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

    /// Opaque value echoed back by the finish call
    pub fn set_callback_argument(&mut self, argument: impl Into<String>) -> &mut Self {
        self.common.callback_argument = Some(argument.into());
        self
    }

    pub fn set_visual_representation(&mut self, representation: VisualRepresentation) -> &mut Self {
        self.visual_representation = Some(representation);
        self
    }

    pub fn set_measurement_units(&mut self, units: MeasurementUnits) -> &mut Self {
        self.measurement_units = Some(units);
        self
    }

    /// Whether a PDF that is already signed is left without the configured marks
    pub fn set_bypass_marks_if_signed(&mut self, bypass: bool) -> &mut Self {
        self.bypass_marks_if_signed = bypass;
        self
    }

    /// DER certificate of a key held by the caller; required by [`Self::start`]
    pub fn set_signer_certificate(&mut self, certificate: impl Into<Vec<u8>>) -> &mut Self {
        self.common.signer_certificate = Some(certificate.into());
        self
    }

    fn build_request(&self) -> RestPkiResult<PadesStartRequest> {
        let pdf = self
            .pdf_to_sign
            .as_deref()
            .filter(|pdf| !pdf.is_empty())
            .ok_or_else(|| RestPkiError::ValidationError("The PDF to sign was not set".to_string()))?;
        let signature_policy_id = self.common.require_policy()?;
        if let Some(representation) = &self.visual_representation {
            representation.validate()?;
        }

        Ok(PadesStartRequest {
            pdf_to_sign: encode_b64(pdf),
            signature_policy_id,
            security_context_id: self.common.security_context_id.clone(),
            visual_representation: self.visual_representation.clone(),
            callback_argument: self.common.callback_argument.clone(),
            certificate: self.common.certificate_b64(),
            measurement_units: self.measurement_units,
            bypass_marks_if_signed: self.bypass_marks_if_signed,
        })
    }

    /// Start a session to be completed by the browser signing component.
    ///
    /// # Errors
    /// Local validation errors (no PDF, no policy, bad visual layout) are
    /// raised before any request is sent.
    pub async fn start_with_webpki(&mut self) -> RestPkiResult<Option<SessionToken>> {
        self.common.ensure_not_started()?;
        let request = self.build_request()?;
        let (token, _) = self.common.start(SignatureKind::Pades, &request, false).await?;
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
        let (_, result) = self.common.start(SignatureKind::Pades, &request, true).await?;
        result.ok_or_else(|| RestPkiError::DecodeError("start response carried no data to sign".to_string()))
    }

    /// Certificate model the service returned from the start call, if any
    pub fn certificate_info(&self) -> RestPkiResult<Option<&serde_json::Value>> {
        self.common.certificate_info()
    }
}

/// Finishes a PAdES signature and holds the signed PDF
#[derive(Debug)]
pub struct PadesSignatureFinisher {
    core: FinisherCore,
    signed_pdf: Option<Vec<u8>>,
}

impl PadesSignatureFinisher {
    #[must_use]
    pub fn new(client: RestPkiClient) -> Self {
        Self {
            core: FinisherCore::new(client, SignatureKind::Pades),
            signed_pdf: None,
        }
    }

    pub fn set_token(&mut self, token: SessionToken) -> &mut Self {
        self.core.set_token(token);
        self
    }

    /// Signature computed by the caller over the data returned by `start`
    pub fn set_signature(&mut self, signature: impl Into<Vec<u8>>) -> &mut Self {
        self.core.set_signature(signature.into());
        self
    }

    /// Finalize the session and return the signed PDF.
    ///
    /// # Errors
    /// Fails locally if no token was set or the session was already
    /// finished; otherwise reports what the service answered.
    pub async fn finish(&mut self) -> RestPkiResult<&[u8]> {
        let content = self.core.finalize::<PadesFinishResponse>().await?;
        Ok(self.signed_pdf.insert(content).as_slice())
    }

    pub fn signed_pdf(&self) -> RestPkiResult<&[u8]> {
        self.core.ensure_finished("signed_pdf")?;
        Ok(self.signed_pdf.as_deref().unwrap_or_default())
    }

    pub fn certificate(&self) -> RestPkiResult<Option<&serde_json::Value>> {
        self.core.certificate()
    }

    pub fn callback_argument(&self) -> RestPkiResult<Option<&str>> {
        self.core.callback_argument()
    }

    pub fn write_signed_pdf_to_path(&self, path: impl AsRef<Path>) -> RestPkiResult<()> {
        self.core.ensure_finished("write_signed_pdf_to_path")?;
        write_artifact(path, self.signed_pdf.as_deref().unwrap_or_default())
    }
}
