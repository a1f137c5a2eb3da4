//! Wire format of the signing service API.
//!
//! One explicit struct per request and response body. Field names are
//! camelCase on the wire; binary payloads travel as standard base64.

use crate::domain::digest::DigestAlgorithm;
use crate::domain::session::XmlSignatureKind;
use crate::domain::types::SessionToken;
use crate::domain::validation::ValidationResults;
use crate::domain::visual::{MeasurementUnits, VisualRepresentation};
use crate::domain::xml::{SignatureElementLocation, XmlIdResolutionTable};
use crate::infra::error::{RestPkiError, RestPkiResult};
use base64::Engine;
use serde::{Deserialize, Deserializer, Serialize};

/// Encode binary content for a request body.
#[must_use]
pub fn encode_b64(bytes: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

/// Decode a base64 field of a response, naming the field on failure.
///
/// # Errors
/// Returns a decode error if the value is not valid base64.
pub fn decode_b64(field: &str, value: &str) -> RestPkiResult<Vec<u8>> {
    base64::engine::general_purpose::STANDARD
        .decode(value)
        .map_err(|e| RestPkiError::DecodeError(format!("field {field} is not valid base64: {e}")))
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticationStartRequest {
    pub security_context_id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PadesStartRequest {
    /// Base64 PDF
    pub pdf_to_sign: String,
    pub signature_policy_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub security_context_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visual_representation: Option<VisualRepresentation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_argument: Option<String>,
    /// Base64 DER signer certificate (server-key flow)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certificate: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub measurement_units: Option<MeasurementUnits>,
    pub bypass_marks_if_signed: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CadesStartRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_to_sign: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cms_to_co_sign: Option<String>,
    pub signature_policy_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub security_context_id: Option<String>,
    pub encapsulate_content: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_argument: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certificate: Option<String>,
}

/// Fields shared by the four XML start calls
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct XmlStartCommon {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub xml: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature_element_location: Option<SignatureElementLocation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature_element_id: Option<String>,
    pub signature_policy_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub security_context_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_argument: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certificate: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FullXmlStartRequest {
    #[serde(flatten)]
    pub common: XmlStartCommon,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct XmlElementStartRequest {
    #[serde(flatten)]
    pub common: XmlStartCommon,
    pub element_to_sign_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_resolution_table: Option<XmlIdResolutionTable>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetachedResourceXmlStartRequest {
    #[serde(flatten)]
    pub common: XmlStartCommon,
    /// Base64 resource bytes
    pub resource_content: String,
    /// Reference URI written into the signature
    pub resource_uri: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OnlineResourceXmlStartRequest {
    #[serde(flatten)]
    pub common: XmlStartCommon,
    /// URL the service downloads the resource from
    pub resource_uri: String,
}

/// Body of an XML start call; the variant decides the endpoint
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum XmlStartRequest {
    Full(FullXmlStartRequest),
    Element(XmlElementStartRequest),
    DetachedResource(DetachedResourceXmlStartRequest),
    OnlineResource(OnlineResourceXmlStartRequest),
}

impl XmlStartRequest {
    #[must_use]
    pub fn kind(&self) -> XmlSignatureKind {
        match self {
            XmlStartRequest::Full(_) => XmlSignatureKind::Full,
            XmlStartRequest::Element(_) => XmlSignatureKind::Element,
            XmlStartRequest::DetachedResource(_) => XmlSignatureKind::DetachedResource,
            XmlStartRequest::OnlineResource(_) => XmlSignatureKind::OnlineResource,
        }
    }
}

/// Answer to every start call. Only `token` is used by the web-component
/// flow; the rest is filled when a signer certificate was sent.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureStartResponse {
    #[serde(default, deserialize_with = "empty_token_as_none")]
    pub token: Option<SessionToken>,
    #[serde(default)]
    pub to_sign_data: Option<String>,
    #[serde(default)]
    pub to_sign_hash: Option<String>,
    #[serde(default)]
    pub digest_algorithm_oid: Option<String>,
    #[serde(default)]
    pub certificate: Option<serde_json::Value>,
}

/// `null`, `""` and a missing field all mean no token was issued
fn empty_token_as_none<'de, D>(deserializer: D) -> Result<Option<SessionToken>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    raw.filter(|token| !token.is_empty())
        .map(SessionToken::new)
        .transpose()
        .map_err(serde::de::Error::custom)
}

/// Body of a finalize call in the server-key flow
#[derive(Debug, Clone, Serialize)]
pub struct FinishRequest {
    /// Base64 signature computed by the caller
    pub signature: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticationFinishResponse {
    #[serde(default)]
    pub certificate: Option<serde_json::Value>,
    #[serde(default)]
    pub validation_results: Option<ValidationResults>,
}

/// Common view of the three finalize answers
pub trait FinishResponse {
    /// Wire name of the artifact field, for error messages
    const ARTIFACT_FIELD: &'static str;

    /// Splits into base64 artifact, certificate and callback argument
    fn into_parts(self) -> (Option<String>, Option<serde_json::Value>, Option<String>);
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PadesFinishResponse {
    #[serde(default)]
    pub signed_pdf: Option<String>,
    #[serde(default)]
    pub certificate: Option<serde_json::Value>,
    #[serde(default)]
    pub callback_argument: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CadesFinishResponse {
    #[serde(default)]
    pub cms: Option<String>,
    #[serde(default)]
    pub certificate: Option<serde_json::Value>,
    #[serde(default)]
    pub callback_argument: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct XmlFinishResponse {
    #[serde(default)]
    pub signed_xml: Option<String>,
    #[serde(default)]
    pub certificate: Option<serde_json::Value>,
    #[serde(default)]
    pub callback_argument: Option<String>,
}

impl FinishResponse for PadesFinishResponse {
    const ARTIFACT_FIELD: &'static str = "signedPdf";

    fn into_parts(self) -> (Option<String>, Option<serde_json::Value>, Option<String>) {
        (self.signed_pdf, self.certificate, self.callback_argument)
    }
}

impl FinishResponse for CadesFinishResponse {
    const ARTIFACT_FIELD: &'static str = "cms";

    fn into_parts(self) -> (Option<String>, Option<serde_json::Value>, Option<String>) {
        (self.cms, self.certificate, self.callback_argument)
    }
}

impl FinishResponse for XmlFinishResponse {
    const ARTIFACT_FIELD: &'static str = "signedXml";

    fn into_parts(self) -> (Option<String>, Option<serde_json::Value>, Option<String>) {
        (self.signed_xml, self.certificate, self.callback_argument)
    }
}

/// Uploaded file; also the whole body of the required-hashes call
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileModel {
    /// Base64 file bytes
    pub content: String,
    pub mime_type: String,
}

/// Digest of the detached data of a CMS
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DataHash {
    pub algorithm: DigestAlgorithm,
    /// Base64 digest
    pub value: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenSignatureRequest {
    pub file: FileModel,
    pub validate: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_signature_policy_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub security_context_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acceptable_explicit_policies: Option<Vec<String>>,
    /// CMS only, when the signed data is not encapsulated
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_hashes: Option<Vec<DataHash>>,
}

/// Error body returned with HTTP 422
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorModel {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
    #[serde(default)]
    pub validation_results: Option<ValidationResults>,
}

/// `code` value marking a validation failure
pub const VALIDATION_ERROR_CODE: &str = "ValidationError";
