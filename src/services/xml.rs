//! XAdES (XML) signature sessions.
//!
//! One starter covers the four flavours; the [`XmlSignatureKind`] chosen at
//! construction decides the endpoint and which fields are required:
//!
//! | kind               | required                          |
//! |--------------------|-----------------------------------|
//! | `Full`             | XML                               |
//! | `Element`          | XML, id of the element to sign    |
//! | `DetachedResource` | resource content and reference URI|
//! | `OnlineResource`   | `http(s)` resource URL            |

use super::signature::{
    read_document, write_artifact, FinisherCore, SignatureStartResult, StarterCommon,
};
use crate::adapters::remote::protocol::{
    encode_b64, DetachedResourceXmlStartRequest, FullXmlStartRequest, OnlineResourceXmlStartRequest,
    XmlElementStartRequest, XmlFinishResponse, XmlStartCommon, XmlStartRequest,
};
use crate::adapters::remote::RestPkiClient;
use crate::domain::session::{SignatureKind, XmlSignatureKind};
use crate::domain::types::SessionToken;
use crate::domain::xml::{SignatureElementLocation, XmlIdResolutionTable};
use crate::infra::error::{RestPkiError, RestPkiResult};
use std::path::Path;

/// Starts an XML signature of one of the four kinds
#[derive(Debug)]
pub struct XmlSignatureStarter {
    kind: XmlSignatureKind,
    common: StarterCommon,
    xml: Option<Vec<u8>>,
    signature_element_location: Option<SignatureElementLocation>,
    signature_element_id: Option<String>,
    element_to_sign_id: Option<String>,
    id_resolution_table: Option<XmlIdResolutionTable>,
    resource_content: Option<Vec<u8>>,
    resource_uri: Option<String>,
}

impl XmlSignatureStarter {
    #[must_use]
    pub fn new(client: RestPkiClient, kind: XmlSignatureKind) -> Self {
        Self {
            kind,
            common: StarterCommon::new(client),
            xml: None,
            signature_element_location: None,
            signature_element_id: None,
            element_to_sign_id: None,
            id_resolution_table: None,
            resource_content: None,
            resource_uri: None,
        }
    }

    /// Enveloped signature over the whole document
    #[must_use]
    pub fn full(client: RestPkiClient) -> Self {
        Self::new(client, XmlSignatureKind::Full)
    }

    /// Signature over one element, e.g. an NF-e `infNFe`
    #[must_use]
    pub fn element(client: RestPkiClient) -> Self {
        Self::new(client, XmlSignatureKind::Element)
    }

    #[must_use]
    pub fn kind(&self) -> XmlSignatureKind {
        self.kind
    }

    pub fn set_xml_to_sign_path(&mut self, path: impl AsRef<Path>) -> RestPkiResult<&mut Self> {
        self.xml = Some(read_document(path)?);
        Ok(self)
    }

    pub fn set_xml_to_sign_content(&mut self, content: impl Into<Vec<u8>>) -> &mut Self {
        self.xml = Some(content.into());
        self
    }

    /// Where the `Signature` element is inserted
    pub fn set_signature_element_location(&mut self, location: SignatureElementLocation) -> &mut Self {
        self.signature_element_location = Some(location);
        self
    }

    /// `Id` attribute given to the `Signature` element
    pub fn set_signature_element_id(&mut self, id: impl Into<String>) -> &mut Self {
        self.signature_element_id = Some(id.into());
        self
    }

    /// Id of the element to sign (element signatures only)
    pub fn set_element_to_sign_id(&mut self, id: impl Into<String>) -> &mut Self {
        self.element_to_sign_id = Some(id.into());
        self
    }

    /// How element ids are resolved (element signatures only)
    pub fn set_id_resolution_table(&mut self, table: XmlIdResolutionTable) -> &mut Self {
        self.id_resolution_table = Some(table);
        self
    }

    /// Resource bytes and the URI the signature references them by
    pub fn set_detached_resource(
        &mut self,
        content: impl Into<Vec<u8>>,
        reference_uri: impl Into<String>,
    ) -> &mut Self {
        self.resource_content = Some(content.into());
        self.resource_uri = Some(reference_uri.into());
        self
    }

    /// URL the service downloads the resource from
    pub fn set_online_resource(&mut self, url: impl Into<String>) -> &mut Self {
        self.resource_uri = Some(url.into());
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

    fn validation_error(message: &str) -> RestPkiError {
        RestPkiError::ValidationError(message.to_string())
    }

    fn build_request(&self) -> RestPkiResult<XmlStartRequest> {
        let xml = self.xml.as_deref().filter(|xml| !xml.is_empty());
        if matches!(self.kind, XmlSignatureKind::Full | XmlSignatureKind::Element) && xml.is_none() {
            return Err(Self::validation_error("The XML was not set"));
        }
        if self.kind != XmlSignatureKind::Element
            && (self.element_to_sign_id.is_some() || self.id_resolution_table.is_some())
        {
            return Err(Self::validation_error(
                "The element to sign and id resolution table only apply to element signatures",
            ));
        }
        let signature_policy_id = self.common.require_policy()?;

        let common = XmlStartCommon {
            xml: xml.map(encode_b64),
            signature_element_location: self.signature_element_location.clone(),
            signature_element_id: self.signature_element_id.clone(),
            signature_policy_id,
            security_context_id: self.common.security_context_id.clone(),
            callback_argument: self.common.callback_argument.clone(),
            certificate: self.common.certificate_b64(),
        };

        let request = match self.kind {
            XmlSignatureKind::Full => XmlStartRequest::Full(FullXmlStartRequest { common }),
            XmlSignatureKind::Element => {
                let element_to_sign_id = self
                    .element_to_sign_id
                    .clone()
                    .filter(|id| !id.is_empty())
                    .ok_or_else(|| Self::validation_error("The XML element Id to sign was not set"))?;
                XmlStartRequest::Element(XmlElementStartRequest {
                    common,
                    element_to_sign_id,
                    id_resolution_table: self.id_resolution_table.clone(),
                })
            }
            XmlSignatureKind::DetachedResource => {
                let content = self
                    .resource_content
                    .as_deref()
                    .filter(|c| !c.is_empty())
                    .ok_or_else(|| Self::validation_error("The resource to sign was not set"))?;
                let resource_uri = self.require_resource_uri()?;
                XmlStartRequest::DetachedResource(DetachedResourceXmlStartRequest {
                    common,
                    resource_content: encode_b64(content),
                    resource_uri,
                })
            }
            XmlSignatureKind::OnlineResource => {
                let resource_uri = self.require_resource_uri()?;
                if !(resource_uri.starts_with("https://") || resource_uri.starts_with("http://")) {
                    return Err(RestPkiError::ValidationError(format!(
                        "The online resource must be an http(s) URL: {resource_uri}"
                    )));
                }
                XmlStartRequest::OnlineResource(OnlineResourceXmlStartRequest {
                    common,
                    resource_uri,
                })
            }
        };
        Ok(request)
    }

    fn require_resource_uri(&self) -> RestPkiResult<String> {
        self.resource_uri
            .clone()
            .filter(|uri| !uri.is_empty())
            .ok_or_else(|| Self::validation_error("The resource URI was not set"))
    }

    /// Start a session to be completed by the browser signing component.
    ///
    /// # Errors
    /// Local validation errors are raised before any request is sent.
    pub async fn start_with_webpki(&mut self) -> RestPkiResult<Option<SessionToken>> {
        self.common.ensure_not_started()?;
        let request = self.build_request()?;
        let (token, _) = self
            .common
            .start(SignatureKind::Xades(self.kind), &request, false)
            .await?;
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
        let (_, result) = self
            .common
            .start(SignatureKind::Xades(self.kind), &request, true)
            .await?;
        result.ok_or_else(|| RestPkiError::DecodeError("start response carried no data to sign".to_string()))
    }

    pub fn certificate_info(&self) -> RestPkiResult<Option<&serde_json::Value>> {
        self.common.certificate_info()
    }
}

/// Finishes any XML signature and holds the signed document
#[derive(Debug)]
pub struct XmlSignatureFinisher {
    core: FinisherCore,
    signed_xml: Option<Vec<u8>>,
}

impl XmlSignatureFinisher {
    #[must_use]
    pub fn new(client: RestPkiClient) -> Self {
        // All XML kinds finalize under the same path.
        Self {
            core: FinisherCore::new(client, SignatureKind::Xades(XmlSignatureKind::Full)),
            signed_xml: None,
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

    /// Finalize the session and return the signed XML.
    ///
    /// # Errors
    /// Fails locally if no token was set or the session was already
    /// finished; otherwise reports what the service answered.
    pub async fn finish(&mut self) -> RestPkiResult<&[u8]> {
        let content = self.core.finalize::<XmlFinishResponse>().await?;
        Ok(self.signed_xml.insert(content).as_slice())
    }

    pub fn signed_xml(&self) -> RestPkiResult<&[u8]> {
        self.core.ensure_finished("signed_xml")?;
        Ok(self.signed_xml.as_deref().unwrap_or_default())
    }

    pub fn certificate(&self) -> RestPkiResult<Option<&serde_json::Value>> {
        self.core.certificate()
    }

    pub fn callback_argument(&self) -> RestPkiResult<Option<&str>> {
        self.core.callback_argument()
    }

    pub fn write_signed_xml_to_path(&self, path: impl AsRef<Path>) -> RestPkiResult<()> {
        self.core.ensure_finished("write_signed_xml_to_path")?;
        write_artifact(path, self.signed_xml.as_deref().unwrap_or_default())
    }
}
