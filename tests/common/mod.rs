//! Shared helpers for integration tests.
#![allow(dead_code)]

pub mod test_env;

use async_trait::async_trait;
use restpki_client::{
    ApiRequest, ApiResponse, EndpointUrl, RestPkiClient, RestPkiError, RestPkiResult, Transport,
};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const TEST_ENDPOINT: &str = "https://restpki.test/";

/// Transport that records every request and answers from a queue
#[derive(Default)]
pub struct MockTransport {
    responses: Mutex<VecDeque<RestPkiResult<ApiResponse>>>,
    requests: Mutex<Vec<ApiRequest>>,
    calls: AtomicUsize,
    delay: Option<Duration>,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Every answer is delayed, to let concurrent callers overlap
    pub fn with_delay(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay: Some(delay),
            ..Self::default()
        })
    }

    pub fn push_json(&self, status: u16, body: Value) {
        self.push_raw(status, &body.to_string());
    }

    pub fn push_raw(&self, status: u16, body: &str) {
        self.responses.lock().unwrap().push_back(Ok(ApiResponse {
            status,
            body: body.to_string(),
        }));
    }

    pub fn push_error(&self, error: RestPkiError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn client(self: &Arc<Self>) -> RestPkiClient {
        let transport: Arc<dyn Transport> = self.clone();
        RestPkiClient::with_transport(EndpointUrl::new(TEST_ENDPOINT).unwrap(), transport)
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: ApiRequest) -> RestPkiResult<ApiResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(RestPkiError::TransportError("no response queued".to_string())))
    }
}

pub fn b64(bytes: &[u8]) -> String {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD.encode(bytes)
}
