//! Type-safe wrappers using new-type pattern
//!
//! Credentials, endpoints and session tokens are validated once on
//! construction so the rest of the crate can pass them around freely.

use crate::infra::error::{RestPkiError, RestPkiResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Marker the sample configurations ship with instead of a real token.
const ACCESS_TOKEN_PLACEHOLDER_MARKER: &str = " API ";

/// Bearer credential for the signing service
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    /// Create a new `AccessToken`, rejecting empty or placeholder values
    pub fn new(token: impl AsRef<str>) -> RestPkiResult<Self> {
        let token = token.as_ref().trim();
        if token.is_empty() {
            return Err(RestPkiError::ConfigurationError(
                "The API access token was not set".to_string(),
            ));
        }
        if token.contains(ACCESS_TOKEN_PLACEHOLDER_MARKER) {
            return Err(RestPkiError::ConfigurationError(
                "The API access token was not set! Generate an access token on the signing service website and place it in the configuration".to_string(),
            ));
        }
        Ok(AccessToken(token.to_string()))
    }

    /// Get the raw token for the `Authorization` header
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Value of the `Authorization` header
    pub fn bearer_header(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

// Never print the credential, not even in debug output
impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken([REDACTED])")
    }
}

impl fmt::Display for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[TOKEN REDACTED]")
    }
}

/// Base URL of the signing service, always ending in `/`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointUrl(String);

impl EndpointUrl {
    /// Create a new `EndpointUrl` after validation
    pub fn new(url: impl AsRef<str>) -> RestPkiResult<Self> {
        let url = url.as_ref().trim();
        Self::validate_url(url)?;
        if url.ends_with('/') {
            Ok(EndpointUrl(url.to_string()))
        } else {
            Ok(EndpointUrl(format!("{url}/")))
        }
    }

    /// Get the URL as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Join a relative API path (e.g. `Api/PadesSignatures`) onto the base
    pub fn join(&self, path: &str) -> String {
        format!("{}{}", self.0, path.trim_start_matches('/'))
    }

    fn validate_url(url: &str) -> RestPkiResult<()> {
        let Some(rest) = url
            .strip_prefix("https://")
            .or_else(|| url.strip_prefix("http://"))
        else {
            return Err(RestPkiError::ConfigurationError(format!(
                "Endpoint URL must start with http:// or https://, got: {url}"
            )));
        };

        let host = rest.split('/').next().unwrap_or_default();
        if host.is_empty() {
            return Err(RestPkiError::ConfigurationError(format!(
                "Endpoint URL has no host: {url}"
            )));
        }
        if url.contains('?') || url.contains('#') {
            return Err(RestPkiError::ConfigurationError(format!(
                "Endpoint URL must not carry a query or fragment: {url}"
            )));
        }
        Ok(())
    }
}

impl FromStr for EndpointUrl {
    type Err = RestPkiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl fmt::Display for EndpointUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque single-use token issued by a start call and consumed by a finish call
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SessionToken(String);

impl SessionToken {
    /// Create a new `SessionToken`; it is interpolated into URL paths, so only
    /// unreserved URL characters are accepted
    pub fn new(token: impl AsRef<str>) -> RestPkiResult<Self> {
        let token = token.as_ref();
        if token.is_empty() {
            return Err(RestPkiError::ValidationError(
                "The token was not set".to_string(),
            ));
        }
        if let Some(bad) = token
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '~')))
        {
            return Err(RestPkiError::ValidationError(format!(
                "Token contains a character not allowed in a URL path segment: {bad:?}"
            )));
        }
        Ok(SessionToken(token.to_string()))
    }

    /// Get the token as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for SessionToken {
    type Error = RestPkiError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<SessionToken> for String {
    fn from(token: SessionToken) -> Self {
        token.0
    }
}

impl FromStr for SessionToken {
    type Err = RestPkiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
