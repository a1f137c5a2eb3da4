//! Client for remote PDF, CMS and XML signature sessions.
//!
//! Signing happens in two phases around an opaque token:
//!
//! 1. A starter (e.g. [`PadesSignatureStarter`]) uploads the document and
//!    options and receives a token.
//! 2. A client-side component, or a key held by the caller, signs the data
//!    identified by the token.
//! 3. A finisher (e.g. [`PadesSignatureFinisher`]) finalizes the token and
//!    exposes the signed artifact and the signer certificate.
//!
//! Existing signatures are inspected and validated with
//! [`PadesSignatureExplorer`] and [`CadesSignatureExplorer`].
//!
//! ```no_run
//! use restpki_client::{
//!     PadesSignatureStarter, RemoteServiceConfig, RestPkiClient, StandardSecurityContexts,
//!     StandardSignaturePolicies,
//! };
//!
//! # async fn run() -> restpki_client::RestPkiResult<()> {
//! let client = RestPkiClient::new(RemoteServiceConfig::new("https://pki.rest/", "my-token")?)?;
//! let mut starter = PadesSignatureStarter::new(client);
//! starter
//!     .set_pdf_to_sign_path("contract.pdf")?
//!     .set_signature_policy(StandardSignaturePolicies::PADES_BASIC)
//!     .set_security_context(StandardSecurityContexts::PKI_BRAZIL);
//! let token = starter.start_with_webpki().await?;
//! # let _ = token;
//! # Ok(())
//! # }
//! ```

pub mod adapters;
pub mod domain;
pub mod infra;
pub mod services;

pub use adapters::remote::{
    ApiRequest, ApiResponse, HttpMethod, HttpTransport, RemoteServiceConfig, RestPkiClient,
    Transport,
};
pub use domain::constants::{
    StandardSecurityContexts, StandardSignaturePolicies, StandardSignaturePolicyCatalog,
};
pub use domain::digest::DigestAlgorithm;
pub use domain::opened::{
    DigestAlgorithmAndValue, OpenedSignature, SignaturePolicyIdentifier, SignerInfo,
};
pub use domain::session::{SessionState, SignatureKind, XmlSignatureKind};
pub use domain::types::{AccessToken, EndpointUrl, SessionToken};
pub use domain::validation::{ValidationItem, ValidationResults};
pub use domain::visual::{
    AutoPositioning, Container, HorizontalAlign, ManualPositioning, MeasurementUnits, PageTarget,
    RectangleSize, VerticalAlign, VisualImage, VisualPositioning, VisualRepresentation,
    VisualText,
};
pub use domain::xml::{
    SignatureElementLocation, XmlIdResolutionTable, XmlInsertionOption, XmlName,
};
pub use infra::config::{ClientConfiguration, ConfigManager, ExportFormat};
pub use infra::error::{RestPkiError, RestPkiResult};
pub use services::{
    certificate_subject, Authenticator, CadesSignatureExplorer, CadesSignatureFinisher,
    CadesSignatureStarter, PadesSignatureExplorer, PadesSignatureFinisher, PadesSignatureStarter,
    PadesVisualPositioningPresets, SignatureStartResult, XmlSignatureFinisher,
    XmlSignatureStarter,
};
