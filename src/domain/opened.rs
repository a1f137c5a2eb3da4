//! Contents of a signed file as reported by the open calls.
//!
//! Opening inspects an existing PDF or CMS signature: every signer is listed
//! with its message digest, certificate and, when validation was requested,
//! the validation results the service computed for it.

use super::digest::DigestAlgorithm;
use super::validation::ValidationResults;
use base64::Engine;
use serde::{Deserialize, Deserializer};

/// Digest of the signed data as recorded in a signer info
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DigestAlgorithmAndValue {
    pub algorithm: DigestAlgorithm,
    #[serde(deserialize_with = "base64_bytes")]
    pub value: Vec<u8>,
}

impl DigestAlgorithmAndValue {
    /// Uppercase hex rendering of the digest value
    #[must_use]
    pub fn hex_value(&self) -> String {
        self.value.iter().map(|b| format!("{b:02X}")).collect()
    }
}

fn base64_bytes<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
where
    D: Deserializer<'de>,
{
    let encoded = String::deserialize(deserializer)?;
    base64::engine::general_purpose::STANDARD
        .decode(encoded)
        .map_err(serde::de::Error::custom)
}

/// Explicit signature policy a signer committed to
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignaturePolicyIdentifier {
    pub oid: String,
    #[serde(default)]
    pub uri: Option<String>,
}

/// One signer of an opened signature
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignerInfo {
    pub message_digest: DigestAlgorithmAndValue,
    #[serde(default)]
    pub signature_policy: Option<SignaturePolicyIdentifier>,
    /// Certificate model, same shape as the one returned by the finishers
    #[serde(default)]
    pub certificate: Option<serde_json::Value>,
    /// Signing time claimed by the signer, as sent by the service
    #[serde(default)]
    pub signing_time: Option<String>,
    #[serde(default)]
    pub certified_date_reference: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub timestamps: Vec<serde_json::Value>,
    /// Present when the file was opened with validation
    #[serde(default)]
    pub validation_results: Option<ValidationResults>,
    // PDF signers only
    #[serde(default)]
    pub is_document_timestamp: bool,
    #[serde(default)]
    pub signature_field_name: Option<String>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<serde_json::Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<serde_json::Value>>::deserialize(deserializer)?.unwrap_or_default())
}

/// A PDF or CMS signature and its signers, in file order
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenedSignature {
    /// CMS only
    #[serde(default)]
    pub encapsulated_content_type: Option<String>,
    /// CMS only
    #[serde(default)]
    pub has_encapsulated_content: Option<bool>,
    pub signers: Vec<SignerInfo>,
}

impl OpenedSignature {
    /// True when every signer carries validation results without errors.
    /// A file opened without validation is never reported as valid.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.signers.is_empty()
            && self.signers.iter().all(|signer| {
                signer
                    .validation_results
                    .as_ref()
                    .is_some_and(ValidationResults::is_valid)
            })
    }
}
