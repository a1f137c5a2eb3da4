//! Digest algorithms named by the signing service.

use crate::infra::error::{RestPkiError, RestPkiResult};
use serde::{Deserialize, Serialize};
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha384, Sha512};
use std::fmt;
use std::str::FromStr;

/// Digest algorithm as it travels on the wire (`"SHA256"`, ...)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "&'static str")]
pub enum DigestAlgorithm {
    Md5,
    Sha1,
    Sha256,
    Sha384,
    Sha512,
}

impl DigestAlgorithm {
    /// Identifier used in request and response bodies
    #[must_use]
    pub fn api_name(&self) -> &'static str {
        match self {
            DigestAlgorithm::Md5 => "MD5",
            DigestAlgorithm::Sha1 => "SHA1",
            DigestAlgorithm::Sha256 => "SHA256",
            DigestAlgorithm::Sha384 => "SHA384",
            DigestAlgorithm::Sha512 => "SHA512",
        }
    }

    /// Display name, e.g. `SHA-256`
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            DigestAlgorithm::Md5 => "MD5",
            DigestAlgorithm::Sha1 => "SHA-1",
            DigestAlgorithm::Sha256 => "SHA-256",
            DigestAlgorithm::Sha384 => "SHA-384",
            DigestAlgorithm::Sha512 => "SHA-512",
        }
    }

    /// Hash `data` with this algorithm.
    ///
    /// # Errors
    /// MD5 is named by the service for old signatures but is not computed
    /// locally; asking for it is a validation error.
    pub fn digest(&self, data: &[u8]) -> RestPkiResult<Vec<u8>> {
        let hash = match self {
            DigestAlgorithm::Md5 => {
                return Err(RestPkiError::ValidationError(format!(
                    "Unsupported digest algorithm: {}",
                    self.api_name()
                )))
            }
            DigestAlgorithm::Sha1 => Sha1::digest(data).to_vec(),
            DigestAlgorithm::Sha256 => Sha256::digest(data).to_vec(),
            DigestAlgorithm::Sha384 => Sha384::digest(data).to_vec(),
            DigestAlgorithm::Sha512 => Sha512::digest(data).to_vec(),
        };
        Ok(hash)
    }
}

impl FromStr for DigestAlgorithm {
    type Err = RestPkiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "MD5" => Ok(DigestAlgorithm::Md5),
            "SHA1" => Ok(DigestAlgorithm::Sha1),
            "SHA256" => Ok(DigestAlgorithm::Sha256),
            "SHA384" => Ok(DigestAlgorithm::Sha384),
            "SHA512" => Ok(DigestAlgorithm::Sha512),
            other => Err(RestPkiError::DecodeError(format!(
                "Unsupported digest algorithm: {other}"
            ))),
        }
    }
}

impl TryFrom<String> for DigestAlgorithm {
    type Error = RestPkiError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DigestAlgorithm> for &'static str {
    fn from(algorithm: DigestAlgorithm) -> Self {
        algorithm.api_name()
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_api_names() {
        for algorithm in [
            DigestAlgorithm::Md5,
            DigestAlgorithm::Sha1,
            DigestAlgorithm::Sha256,
            DigestAlgorithm::Sha384,
            DigestAlgorithm::Sha512,
        ] {
            assert_eq!(algorithm.api_name().parse::<DigestAlgorithm>().unwrap(), algorithm);
        }
        assert_eq!(serde_json::to_value(DigestAlgorithm::Sha256).unwrap(), json!("SHA256"));
        assert_eq!(DigestAlgorithm::Sha1.to_string(), "SHA-1");
    }

    #[test]
    fn test_unknown_algorithm_is_rejected() {
        let err = serde_json::from_value::<DigestAlgorithm>(json!("SHA3-256")).unwrap_err();
        assert!(err.to_string().contains("Unsupported digest algorithm: SHA3-256"));
        assert!(matches!("sha256".parse::<DigestAlgorithm>(), Err(RestPkiError::DecodeError(_))));
    }

    #[test]
    fn test_digest_sizes() {
        let data = b"abc";
        assert_eq!(DigestAlgorithm::Sha1.digest(data).unwrap().len(), 20);
        assert_eq!(DigestAlgorithm::Sha384.digest(data).unwrap().len(), 48);
        assert_eq!(DigestAlgorithm::Sha512.digest(data).unwrap().len(), 64);

        let sha256 = DigestAlgorithm::Sha256.digest(data).unwrap();
        assert_eq!(sha256[..4], [0xba, 0x78, 0x16, 0xbf]);
    }

    #[test]
    fn test_md5_is_not_computed() {
        assert!(matches!(
            DigestAlgorithm::Md5.digest(b"abc"),
            Err(RestPkiError::ValidationError(msg)) if msg == "Unsupported digest algorithm: MD5"
        ));
    }
}
