//! HTTP transport against a local stand-in for the signing service.

use restpki_client::{
    PadesSignatureFinisher, PadesSignatureStarter, PadesVisualPositioningPresets,
    RemoteServiceConfig, RestPkiClient, RestPkiError, SessionToken, StandardSignaturePolicies,
};
use restpki_client::services::presets::InMemoryPresetCache;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use warp::http::{HeaderMap, StatusCode};
use warp::Filter;

const ACCESS_TOKEN: &str = "test-access-token";

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

/// Start the stand-in service and return its base URL
fn spawn_service() -> String {
    let start = warp::post()
        .and(warp::path!("Api" / "PadesSignatures"))
        .and(warp::header::headers_cloned())
        .and(warp::body::json())
        .map(|headers: HeaderMap, body: Value| {
            let expected_auth = format!("Bearer {ACCESS_TOKEN}");
            let well_formed = header(&headers, "authorization") == Some(expected_auth.as_str())
                && header(&headers, "accept") == Some("application/json")
                && header(&headers, "content-type") == Some("application/json");
            if !well_formed {
                return warp::reply::with_status(
                    warp::reply::json(&json!({ "message": "unauthorized" })),
                    StatusCode::UNAUTHORIZED,
                );
            }
            let token = if body["pdfToSign"].is_string() { "local-token" } else { "missing-pdf" };
            warp::reply::with_status(warp::reply::json(&json!({ "token": token })), StatusCode::OK)
        });

    let finalize = warp::post()
        .and(warp::path!("Api" / "PadesSignatures" / String / "Finalize"))
        .map(|token: String| {
            let (status, body) = match token.as_str() {
                "expired" => (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    json!({
                        "code": "ValidationError",
                        "message": "Certificate validation failed",
                        "validationResults": {
                            "errors": [{ "type": "CertificateExpired", "message": "expired" }]
                        }
                    }),
                ),
                "reused" => (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    json!({ "code": "SignatureSessionAlreadyCompleted", "detail": "token already used" }),
                ),
                "boom" => (StatusCode::INTERNAL_SERVER_ERROR, json!({ "message": "internal" })),
                _ => (StatusCode::OK, json!({ "signedPdf": "U0lHTkVE" })),
            };
            warp::reply::with_status(warp::reply::json(&body), status)
        });

    let footnote = warp::get()
        .and(warp::path!("Api" / "PadesVisualPositioningPresets" / "Footnote"))
        .and(warp::query::<HashMap<String, String>>())
        .map(|query: HashMap<String, String>| {
            let page: i32 = query
                .get("pageNumber")
                .and_then(|p| p.parse().ok())
                .unwrap_or(-1);
            warp::reply::json(&json!({
                "pageNumber": page,
                "auto": {
                    "container": { "left": 1.5, "right": 1.5, "bottom": 1.5, "height": 3.0 },
                    "signatureRectangleSize": { "width": 7.0, "height": 3.0 },
                    "rowSpacing": 0.0
                }
            }))
        });

    let slow = warp::path!("Api" / "Slow").and_then(|| async {
        tokio::time::sleep(Duration::from_secs(3)).await;
        Ok::<_, warp::Rejection>(warp::reply::json(&json!({})))
    });

    let routes = start.or(finalize).or(footnote).or(slow);
    let (addr, server) = warp::serve(routes).bind_ephemeral(([127, 0, 0, 1], 0));
    tokio::spawn(server);
    format!("http://{addr}/")
}

fn client_for(endpoint: &str, token: &str) -> RestPkiClient {
    RestPkiClient::new(RemoteServiceConfig::new(endpoint, token).unwrap()).unwrap()
}

#[tokio::test]
async fn start_sends_bearer_and_json_headers() {
    let endpoint = spawn_service();
    let mut starter = PadesSignatureStarter::new(client_for(&endpoint, ACCESS_TOKEN));
    starter
        .set_pdf_to_sign_content(b"%PDF-1.7".to_vec())
        .set_signature_policy(StandardSignaturePolicies::PADES_BASIC);

    let token = starter.start_with_webpki().await.unwrap().unwrap();
    assert_eq!(token.as_str(), "local-token");
}

#[tokio::test]
async fn wrong_token_is_a_remote_error() {
    let endpoint = spawn_service();
    let mut starter = PadesSignatureStarter::new(client_for(&endpoint, "wrong"));
    starter
        .set_pdf_to_sign_content(b"%PDF-1.7".to_vec())
        .set_signature_policy(StandardSignaturePolicies::PADES_BASIC);

    let err = starter.start_with_webpki().await.unwrap_err();
    assert_eq!(err.status(), Some(401));
    assert!(!err.is_local());
    // a failed start can be retried
    assert!(starter.certificate_info().is_err());
}

#[tokio::test]
async fn finish_decodes_artifact() {
    let endpoint = spawn_service();
    let mut finisher = PadesSignatureFinisher::new(client_for(&endpoint, ACCESS_TOKEN));
    finisher.set_token(SessionToken::new("good").unwrap());
    assert_eq!(finisher.finish().await.unwrap(), b"SIGNED");
    assert!(finisher.certificate().unwrap().is_none());
}

#[tokio::test]
async fn unprocessable_entity_is_mapped_by_code() {
    let endpoint = spawn_service();
    let client = client_for(&endpoint, ACCESS_TOKEN);

    let mut finisher = PadesSignatureFinisher::new(client.clone());
    finisher.set_token(SessionToken::new("expired").unwrap());
    match finisher.finish().await.unwrap_err() {
        RestPkiError::RemoteValidationError { path, results, .. } => {
            assert_eq!(path, "Api/PadesSignatures/expired/Finalize");
            assert!(!results.is_valid());
        }
        other => panic!("unexpected error: {other:?}"),
    }

    let mut finisher = PadesSignatureFinisher::new(client.clone());
    finisher.set_token(SessionToken::new("reused").unwrap());
    match finisher.finish().await.unwrap_err() {
        RestPkiError::ServiceError { code, detail, .. } => {
            assert_eq!(code, "SignatureSessionAlreadyCompleted");
            assert_eq!(detail.as_deref(), Some("token already used"));
        }
        other => panic!("unexpected error: {other:?}"),
    }

    let mut finisher = PadesSignatureFinisher::new(client);
    finisher.set_token(SessionToken::new("boom").unwrap());
    match finisher.finish().await.unwrap_err() {
        RestPkiError::RemoteServiceError { status, body, .. } => {
            assert_eq!(status, 500);
            assert!(body.contains("internal"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn preset_query_reaches_the_service() {
    let endpoint = spawn_service();
    let presets = PadesVisualPositioningPresets::with_cache(
        client_for(&endpoint, ACCESS_TOKEN),
        Arc::new(InMemoryPresetCache::new()),
    );
    let preset = presets.get_footnote(Some(3), Some(2)).await.unwrap();
    assert_eq!(preset["pageNumber"], json!(3));
}

#[tokio::test]
async fn slow_service_times_out() {
    let endpoint = spawn_service();
    let config = RemoteServiceConfig::new(&endpoint, ACCESS_TOKEN)
        .unwrap()
        .with_timeout(1);
    let client = RestPkiClient::new(config).unwrap();

    let err = client.get::<Value>("Api/Slow", &[]).await.unwrap_err();
    assert!(matches!(err, RestPkiError::TransportError(_)));
}

#[tokio::test]
async fn unreachable_service_is_a_transport_error() {
    let addr = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap();
    let client = client_for(&format!("http://{addr}/"), ACCESS_TOKEN);

    let err = client.post_empty::<Value>("Api/PadesSignatures/x/Finalize").await.unwrap_err();
    assert!(matches!(err, RestPkiError::TransportError(_)));
    assert_eq!(err.status(), None);
}

#[test]
fn zero_timeout_is_rejected() {
    let config = RemoteServiceConfig::new("https://pki.rest/", ACCESS_TOKEN)
        .unwrap()
        .with_timeout(0);
    assert!(matches!(
        RestPkiClient::new(config),
        Err(RestPkiError::ConfigurationError(_))
    ));
}
