//! HTTP transport seam for the remote swap client

use crate::error::{EngineError, EngineResult};

use async_trait::async_trait;
use reqwest::{
    header::{HeaderMap, HeaderValue, ACCEPT},
    Client,
};
use serde_json::Value;
use std::time::Duration;
use tracing::trace;

pub const API_KEY_HEADER: &str = "X-LS-APIKEY";
pub const REQUEST_ID_HEADER: &str = "X-Request-Id";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

/// One outbound request; the request id is fresh per attempt
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: HttpMethod,
    pub url: String,
    pub body: Option<Value>,
    pub request_id: String,
}

impl ApiRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Get,
            url: url.into(),
            body: None,
            request_id: String::new(),
        }
    }

    pub fn post(url: impl Into<String>, body: Value) -> Self {
        Self {
            method: HttpMethod::Post,
            url: url.into(),
            body: Some(body),
            request_id: String::new(),
        }
    }
}

/// Status and decoded body of a completed exchange.
///
/// Bodies that are not JSON are kept as a JSON string.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Executes requests against the remote network.
///
/// Only connection-level problems are errors here; any HTTP status is a
/// response.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn execute(&self, request: ApiRequest) -> EngineResult<ApiResponse>;
}

/// reqwest-backed transport carrying the API key on every request
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(api_key: &str, timeout: Duration) -> EngineResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            API_KEY_HEADER,
            HeaderValue::from_str(api_key)
                .map_err(|e| EngineError::Config(format!("Invalid API key format: {}", e)))?,
        );
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| EngineError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn execute(&self, request: ApiRequest) -> EngineResult<ApiResponse> {
        trace!("{:?} {} ({})", request.method, request.url, request.request_id);

        let mut builder = match request.method {
            HttpMethod::Get => self.client.get(&request.url),
            HttpMethod::Post => self.client.post(&request.url),
        };
        builder = builder.header(REQUEST_ID_HEADER, &request.request_id);
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| EngineError::Transport(format!("Request to {} failed: {}", request.url, e)))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| EngineError::Transport(format!("Failed to read response body: {}", e)))?;

        let body = serde_json::from_str(&text).unwrap_or(Value::String(text));

        Ok(ApiResponse::new(status, body))
    }
}
