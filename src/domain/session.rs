//! Local lifecycle of a signature session.
//!
//! The remote service is the authority on token single-use; these flags only
//! make misuse of a starter or finisher object fail fast, without a network
//! round trip.

use crate::domain::constants::{
    AUTHENTICATIONS_PATH, CADES_SIGNATURES_PATH, PADES_SIGNATURES_PATH, XML_SIGNATURES_PATH,
};
use crate::infra::error::{RestPkiError, RestPkiResult};
use std::fmt;

/// Which envelope a session produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignatureKind {
    Authentication,
    Pades,
    Cades,
    Xades(XmlSignatureKind),
}

/// The four XML signature flavours, each with its own start endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum XmlSignatureKind {
    /// Enveloped signature over the whole document
    Full,
    /// Signature over one element identified by id
    Element,
    /// Detached signature over a resource sent along with the request
    DetachedResource,
    /// Detached signature over a resource the service downloads
    OnlineResource,
}

impl XmlSignatureKind {
    #[must_use]
    pub fn endpoint_segment(self) -> &'static str {
        match self {
            XmlSignatureKind::Full => "FullXmlSignature",
            XmlSignatureKind::Element => "XmlElementSignature",
            XmlSignatureKind::DetachedResource => "DetachedResourceXmlSignature",
            XmlSignatureKind::OnlineResource => "OnlineResourceXmlSignature",
        }
    }
}

impl SignatureKind {
    /// Path of the start call
    #[must_use]
    pub fn start_path(self) -> String {
        match self {
            SignatureKind::Authentication => AUTHENTICATIONS_PATH.to_string(),
            SignatureKind::Pades => PADES_SIGNATURES_PATH.to_string(),
            SignatureKind::Cades => CADES_SIGNATURES_PATH.to_string(),
            SignatureKind::Xades(kind) => {
                format!("{XML_SIGNATURES_PATH}/{}", kind.endpoint_segment())
            }
        }
    }

    /// Base under which `{token}/Finalize` lives. All XML flavours share one.
    #[must_use]
    pub fn finish_base(self) -> &'static str {
        match self {
            SignatureKind::Authentication => AUTHENTICATIONS_PATH,
            SignatureKind::Pades => PADES_SIGNATURES_PATH,
            SignatureKind::Cades => CADES_SIGNATURES_PATH,
            SignatureKind::Xades(_) => XML_SIGNATURES_PATH,
        }
    }
}

impl fmt::Display for SignatureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignatureKind::Authentication => write!(f, "authentication"),
            SignatureKind::Pades => write!(f, "PAdES"),
            SignatureKind::Cades => write!(f, "CAdES"),
            SignatureKind::Xades(kind) => write!(f, "XAdES ({})", kind.endpoint_segment()),
        }
    }
}

/// `NotStarted -> Started -> Finished`; no transition back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    NotStarted,
    Started,
    Finished,
}

impl SessionState {
    /// Fail unless the start call has not happened yet
    pub fn ensure_not_started(self, operation: &str) -> RestPkiResult<()> {
        match self {
            SessionState::NotStarted => Ok(()),
            _ => Err(RestPkiError::InvalidStateError(format!(
                "{operation} can only be called once per session object"
            ))),
        }
    }

    /// Fail unless the session has been finished
    pub fn ensure_finished(self, accessor: &str, finisher: &str) -> RestPkiResult<()> {
        match self {
            SessionState::Finished => Ok(()),
            _ => Err(RestPkiError::InvalidStateError(format!(
                "The method {accessor}() can only be called after calling the {finisher}() method"
            ))),
        }
    }

    /// Fail if the session was already finished
    pub fn ensure_not_finished(self, operation: &str) -> RestPkiResult<()> {
        match self {
            SessionState::Finished => Err(RestPkiError::InvalidStateError(format!(
                "{operation}() was already called; a session token cannot be finalized twice"
            ))),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_per_kind() {
        assert_eq!(SignatureKind::Pades.start_path(), "Api/PadesSignatures");
        assert_eq!(SignatureKind::Cades.start_path(), "Api/CadesSignatures");
        assert_eq!(
            SignatureKind::Xades(XmlSignatureKind::OnlineResource).start_path(),
            "Api/XmlSignatures/OnlineResourceXmlSignature"
        );
        assert_eq!(
            SignatureKind::Xades(XmlSignatureKind::Element).finish_base(),
            "Api/XmlSignatures"
        );
        assert_eq!(
            SignatureKind::Authentication.start_path(),
            "Api/Authentications"
        );
    }

    #[test]
    fn test_state_guards() {
        let state = SessionState::default();
        assert!(state.ensure_not_started("start").is_ok());
        assert!(matches!(
            state.ensure_finished("certificate", "finish"),
            Err(RestPkiError::InvalidStateError(_))
        ));
        assert!(SessionState::Finished
            .ensure_finished("certificate", "finish")
            .is_ok());
        assert!(SessionState::Finished.ensure_not_finished("finish").is_err());
        assert!(SessionState::Started.ensure_not_started("start").is_err());
    }
}
