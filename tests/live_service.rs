//! Tests against a real signing service.
//!
//! Enabled with `--features network-tests` and skipped unless
//! `RESTPKI_ACCESS_TOKEN` is set, directly or through a `.env` file.
//! `RESTPKI_ENDPOINT` defaults to `https://pki.rest/`.
#![cfg(feature = "network-tests")]

mod common;

use common::test_env::LiveServiceEnv;
use restpki_client::{
    CadesSignatureStarter, PadesSignatureFinisher, PadesSignatureStarter,
    PadesVisualPositioningPresets, RemoteServiceConfig, RestPkiClient, RestPkiError,
    SessionToken, StandardSecurityContexts, StandardSignaturePolicies, VisualRepresentation,
};

fn live_client() -> Option<RestPkiClient> {
    let Some(env) = LiveServiceEnv::load() else {
        eprintln!("Skipping live test: RESTPKI_ACCESS_TOKEN not set");
        return None;
    };
    let config = RemoteServiceConfig::new(&env.endpoint, &env.access_token).ok()?;
    RestPkiClient::new(config).ok()
}

fn sample_pdf() -> Vec<u8> {
    b"%PDF-1.4\n1 0 obj<</Type/Catalog/Pages 2 0 R>>endobj\n\
2 0 obj<</Type/Pages/Kids[3 0 R]/Count 1>>endobj\n\
3 0 obj<</Type/Page/Parent 2 0 R/MediaBox[0 0 612 792]>>endobj\n\
trailer<</Root 1 0 R>>\n%%EOF\n"
        .to_vec()
}

#[tokio::test]
async fn live_footnote_preset() {
    let Some(client) = live_client() else { return };
    let presets = PadesVisualPositioningPresets::new(client);
    let position = presets.get_footnote_positioning(None, None).await.unwrap();
    assert!(position.auto.is_some());
}

#[tokio::test]
async fn live_pades_start_returns_token() {
    let Some(client) = live_client() else { return };
    let presets = PadesVisualPositioningPresets::new(client.clone());
    let position = presets.get_footnote_positioning(None, None).await.unwrap();

    let mut starter = PadesSignatureStarter::new(client);
    starter
        .set_pdf_to_sign_content(sample_pdf())
        .set_signature_policy(StandardSignaturePolicies::PADES_BASIC)
        .set_security_context(StandardSecurityContexts::LACUNA_TEST)
        .set_visual_representation(VisualRepresentation::new(position));
    let token = starter.start_with_webpki().await.unwrap();
    assert!(token.is_some());
}

#[tokio::test]
async fn live_cades_start_returns_token() {
    let Some(client) = live_client() else { return };
    let mut starter = CadesSignatureStarter::new(client);
    starter
        .set_content_to_sign(b"hello from the live test".to_vec())
        .set_signature_policy(StandardSignaturePolicies::CADES_BES)
        .set_security_context(StandardSecurityContexts::LACUNA_TEST);
    assert!(starter.start_with_webpki().await.unwrap().is_some());
}

#[tokio::test]
async fn live_unknown_token_is_rejected() {
    let Some(client) = live_client() else { return };
    let mut finisher = PadesSignatureFinisher::new(client);
    finisher.set_token(SessionToken::new("00000000000000000000000000000000").unwrap());
    let err = finisher.finish().await.unwrap_err();
    assert!(!err.is_local(), "expected a remote error, got {err:?}");
    assert!(!matches!(err, RestPkiError::TransportError(_)));
}
