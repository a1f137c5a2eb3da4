//! Identifiers and API paths shared across the crate.
//! Keep this intentionally small; only broadly reused literals should live here.

// === API Paths (relative to the configured endpoint) ===

pub const AUTHENTICATIONS_PATH: &str = "Api/Authentications";
pub const PADES_SIGNATURES_PATH: &str = "Api/PadesSignatures";
pub const CADES_SIGNATURES_PATH: &str = "Api/CadesSignatures";
pub const XML_SIGNATURES_PATH: &str = "Api/XmlSignatures";
pub const VISUAL_POSITIONING_PRESETS_PATH: &str = "Api/PadesVisualPositioningPresets";
pub const PADES_OPEN_PATH: &str = "Api/PadesSignatures/Open";
pub const CADES_OPEN_PATH: &str = "Api/CadesSignatures/Open";
pub const CADES_REQUIRED_HASHES_PATH: &str = "Api/CadesSignatures/RequiredHashes";

// === MIME types of uploaded signature files ===

pub const PDF_MIME_TYPE: &str = "application/pdf";
pub const CMS_SIGNATURE_MIME_TYPE: &str = "application/pkcs7-signature";

/// Path of the finalize call for a session started under `base`
#[must_use]
pub fn finalize_path(base: &str, token: &str) -> String {
    format!("{base}/{token}/Finalize")
}

// === Default endpoint ===

/// Public signing service used when no endpoint is configured
pub const DEFAULT_ENDPOINT_URL: &str = "https://pki.rest/";

/// Default request timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Security contexts configured on the public service.
///
/// A security context decides which root authorities are trusted when the
/// signer certificate chain is validated.
pub struct StandardSecurityContexts;

impl StandardSecurityContexts {
    /// ICP-Brasil roots
    pub const PKI_BRAZIL: &'static str = "201856ce-273c-4058-a872-8937bd547d36";
    /// Italian trusted list
    pub const PKI_ITALY: &'static str = "c438b17e-4862-446b-86ad-6f85734f0bfe";
    /// Roots trusted by Windows Server
    pub const WINDOWS_SERVER: &'static str = "3881384c-a54d-45c5-bbe9-976b674f5ec7";
    /// Test PKI for development only
    pub const LACUNA_TEST: &'static str = "803517ad-3bbc-4169-b085-60053a8f6dbf";
}

/// Signature policies configured on the public service
pub struct StandardSignaturePolicies;

impl StandardSignaturePolicies {
    pub const PADES_BASIC: &'static str = "78d20b33-014d-440e-ad07-929f05d00cdf";
    pub const PADES_ICPBR_ADR_BASICA: &'static str = "531d5012-4c0d-4b6f-89e8-ebdcc605d7c2";
    pub const PADES_ICPBR_ADR_TEMPO: &'static str = "10f0d9a5-a0a9-42e9-9523-e181ce05a25b";

    pub const CADES_BES: &'static str = "a4522485-c9e5-46c3-950b-0d6e951e17d1";
    pub const CADES_ICPBR_ADR_BASICA: &'static str = "3ddd8001-1672-4eb5-a4a2-6e32b17ddc46";
    pub const CADES_ICPBR_ADR_TEMPO: &'static str = "a5332ad1-d105-447c-a4bb-b5d02177e439";
    pub const CADES_ICPBR_ADR_VALIDACAO: &'static str = "92378630-dddf-45eb-8296-8fee0b73d5bb";
    pub const CADES_ICPBR_ADR_COMPLETA: &'static str = "30d881e7-924a-4a14-b5cc-d5a1717d92f6";

    pub const XML_XADES_BES: &'static str = "1beba282-d1b6-4458-8e46-bd8ad6800b54";
    pub const XML_DSIG_BASIC: &'static str = "2bb5d8c9-49ba-4c62-8104-8141f6459d08";
    pub const XML_ICPBR_NFE_PADRAO_NACIONAL: &'static str = "a3c24251-d43a-4ba4-b25d-ee8e2ab24f06";
    pub const XML_ICPBR_ADR_BASICA: &'static str = "1cf5db62-58b6-40ba-88a3-d41bada9b621";
    pub const XML_ICPBR_ADR_TEMPO: &'static str = "5aa2e0af-5269-43b0-8d45-f4ef52921f04";
}

/// Sets of explicit policies accepted when opening a signature
pub struct StandardSignaturePolicyCatalog;

impl StandardSignaturePolicyCatalog {
    pub const PKI_BRAZIL_CADES: &'static [&'static str] = &[
        StandardSignaturePolicies::CADES_ICPBR_ADR_BASICA,
        StandardSignaturePolicies::CADES_ICPBR_ADR_TEMPO,
        StandardSignaturePolicies::CADES_ICPBR_ADR_COMPLETA,
    ];
    pub const PKI_BRAZIL_CADES_WITH_SIGNER_CERTIFICATE_PROTECTION: &'static [&'static str] = &[
        StandardSignaturePolicies::CADES_ICPBR_ADR_TEMPO,
        StandardSignaturePolicies::CADES_ICPBR_ADR_COMPLETA,
    ];
    pub const PKI_BRAZIL_CADES_WITH_CA_CERTIFICATE_PROTECTION: &'static [&'static str] =
        &[StandardSignaturePolicies::CADES_ICPBR_ADR_COMPLETA];
    pub const PKI_BRAZIL_PADES: &'static [&'static str] = &[
        StandardSignaturePolicies::PADES_ICPBR_ADR_BASICA,
        StandardSignaturePolicies::PADES_ICPBR_ADR_TEMPO,
    ];
    pub const PKI_BRAZIL_PADES_WITH_SIGNER_CERTIFICATE_PROTECTION: &'static [&'static str] =
        &[StandardSignaturePolicies::PADES_ICPBR_ADR_TEMPO];
}
