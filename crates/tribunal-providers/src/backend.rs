use std::{collections::VecDeque, sync::Arc};

use async_trait::async_trait;
use serde_json::Value;
use tribunal_core::TribunalError;
use tokio::sync::Mutex;

#[derive(Debug, Clone)]
pub struct ProviderRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Value,
}

#[derive(Debug, Clone)]
pub struct ProviderResponse {
    pub status: u16,
    pub body: Value,
}

/// Transport seam between adapters and the network. Adapters never touch
/// reqwest directly, so tests swap in `FakeBackend`.
#[async_trait]
pub trait ProviderBackend: Send + Sync {
    async fn send(&self, request: ProviderRequest) -> Result<ProviderResponse, TribunalError>;
}

/// Production backend using reqwest.
pub struct HttpBackend {
    client: reqwest::Client,
}

impl HttpBackend {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for HttpBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProviderBackend for HttpBackend {
    async fn send(&self, request: ProviderRequest) -> Result<ProviderResponse, TribunalError> {
        let mut builder = self.client.post(&request.url);
        for (key, value) in &request.headers {
            builder = builder.header(key, value);
        }
        builder = builder.json(&request.body);

        // status 0 marks a transport failure with no HTTP response at all
        let response = builder.send().await.map_err(|e| TribunalError::ProviderHttp {
            status: 0,
            message: format!("HTTP request failed: {e}"),
        })?;

        let status = response.status().as_u16();
        tracing::debug!(url = %request.url, status, "provider response received");
        let body: Value = response.json().await.map_err(|e| {
            TribunalError::MalformedResponse(format!("response body is not JSON: {e}"))
        })?;

        Ok(ProviderResponse { status, body })
    }
}

/// Test backend with queued responses; records every request it receives.
pub struct FakeBackend {
    responses: Arc<Mutex<VecDeque<Result<ProviderResponse, TribunalError>>>>,
    requests: Arc<Mutex<Vec<ProviderRequest>>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(VecDeque::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn push_response(&self, response: ProviderResponse) -> &Self {
        self.responses
            .try_lock()
            .expect("not concurrent during setup")
            .push_back(Ok(response));
        self
    }

    pub fn push_error(&self, error: TribunalError) -> &Self {
        self.responses
            .try_lock()
            .expect("not concurrent during setup")
            .push_back(Err(error));
        self
    }

    /// Requests captured so far, in send order.
    pub fn take_requests(&self) -> Vec<ProviderRequest> {
        std::mem::take(
            &mut *self
                .requests
                .try_lock()
                .expect("not concurrent during teardown"),
        )
    }
}

impl Default for FakeBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProviderBackend for FakeBackend {
    async fn send(&self, request: ProviderRequest) -> Result<ProviderResponse, TribunalError> {
        self.requests.lock().await.push(request);
        let mut responses = self.responses.lock().await;
        responses.pop_front().unwrap_or_else(|| {
            Err(TribunalError::EmptyResponse("FakeBackend exhausted".to_string()))
        })
    }
}
