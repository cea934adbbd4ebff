//! Layerswap-style swap network client with pacing and retries

use super::failure::{carries_error, classify_failure};
use super::rate_limit::RateLimiter;
use super::transport::{ApiRequest, HttpTransport, ReqwestTransport};
use super::types::{parse_routes, parse_swap, BridgeRequest, CreateSwapBody, Route, SwapRecord};
use super::SwapApi;
use crate::config::BridgeConfig;
use crate::error::{EngineError, EngineResult};
use crate::registry::AddressFormats;

use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use rust_decimal::Decimal;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};
use uuid::Uuid;

lazy_static! {
    static ref SWAP_ID: Regex = Regex::new(r"^[a-zA-Z0-9-]+$").expect("static pattern");
}

/// Client for the remote swap network.
///
/// Every outbound request goes through the per-instance rate limiter, and
/// failed requests are retried with a fixed delay before giving up.
pub struct LayerswapClient {
    transport: Arc<dyn HttpTransport>,
    base_url: String,
    rate_limiter: RateLimiter,
    max_attempts: u32,
    retry_delay: Duration,
    use_deposit_address: bool,
    address_formats: AddressFormats,
}

impl LayerswapClient {
    /// Create a client talking HTTP to the configured base URL
    pub fn new(config: &BridgeConfig) -> EngineResult<Self> {
        ensure_api_key(&config.api_key)?;
        let transport = ReqwestTransport::new(&config.api_key, config.request_timeout())?;
        Self::with_transport(config, Arc::new(transport))
    }

    /// Create a client over an arbitrary transport
    pub fn with_transport(
        config: &BridgeConfig,
        transport: Arc<dyn HttpTransport>,
    ) -> EngineResult<Self> {
        ensure_api_key(&config.api_key)?;

        info!(
            "Swap network client targeting {} (min interval {}ms, {} attempts)",
            config.base_url, config.min_request_interval_ms, config.max_attempts
        );

        Ok(Self {
            transport,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            rate_limiter: RateLimiter::new(config.min_request_interval()),
            max_attempts: config.max_attempts.max(1),
            retry_delay: config.retry_delay(),
            use_deposit_address: config.use_deposit_address,
            address_formats: AddressFormats::from_patterns(&config.address_formats)?,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Reject requests that can never succeed before touching the network
    fn check_swap_request(&self, request: &BridgeRequest) -> EngineResult<()> {
        let required = [
            ("source network", &request.source_network),
            ("destination network", &request.destination_network),
            ("source token", &request.source_token),
            ("destination token", &request.destination_token),
            ("destination address", &request.destination_address),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(EngineError::Validation(format!("Missing {}", field)));
            }
        }

        if request.amount <= Decimal::ZERO {
            return Err(EngineError::Validation(format!(
                "Amount must be positive, got {}",
                request.amount
            )));
        }

        if !self
            .address_formats
            .is_valid(&request.destination_network, &request.destination_address)
        {
            return Err(EngineError::Validation(format!(
                "Invalid destination address for {}: {}",
                request.destination_network, request.destination_address
            )));
        }

        Ok(())
    }

    /// Send a request through the limiter, retrying retryable failures.
    ///
    /// Non-2xx statuses, 2xx bodies reporting an error and payloads rejected
    /// by `parse` all count as failures.
    async fn execute<T>(
        &self,
        operation: &str,
        request: ApiRequest,
        parse: fn(Value) -> EngineResult<T>,
    ) -> EngineResult<T> {
        let mut last_error = None;

        for attempt in 1..=self.max_attempts {
            let waited = self.rate_limiter.acquire().await;
            if !waited.is_zero() {
                crate::metrics::record_rate_limit_wait(waited.as_secs_f64());
            }

            let mut request = request.clone();
            request.request_id = Uuid::new_v4().to_string();
            debug!(
                "{} attempt {}/{} ({})",
                operation, attempt, self.max_attempts, request.request_id
            );

            let result = match self.transport.execute(request).await {
                Ok(response) if response.is_success() && !carries_error(&response.body) => {
                    parse(response.body)
                }
                Ok(response) => Err(classify_failure(response.status, &response.body)),
                Err(e) => Err(e),
            };

            match result {
                Ok(value) => {
                    crate::metrics::record_remote_request(operation, true);
                    return Ok(value);
                }
                Err(e) if !e.is_retryable() => {
                    crate::metrics::record_remote_request(operation, false);
                    return Err(e);
                }
                Err(e) => {
                    warn!(
                        "{} failed (attempt {}/{}): {}",
                        operation, attempt, self.max_attempts, e
                    );
                    last_error = Some(e);
                }
            }

            if attempt < self.max_attempts {
                crate::metrics::record_remote_retry(operation);
                sleep(self.retry_delay).await;
            }
        }

        crate::metrics::record_remote_request(operation, false);
        Err(EngineError::RetriesExhausted {
            operation: operation.to_string(),
            attempts: self.max_attempts,
            source: Box::new(last_error.unwrap_or_else(|| {
                EngineError::Internal(format!("{} made no attempts", operation))
            })),
        })
    }
}

#[async_trait]
impl SwapApi for LayerswapClient {
    async fn get_available_routes(&self) -> EngineResult<Vec<Route>> {
        let routes = self
            .execute("get routes", ApiRequest::get(self.url("/networks")), parse_routes)
            .await?;
        debug!("Fetched {} routes", routes.len());
        Ok(routes)
    }

    async fn create_swap(&self, request: &BridgeRequest) -> EngineResult<SwapRecord> {
        self.check_swap_request(request)?;

        let body = CreateSwapBody::from_request(request, self.use_deposit_address)?;
        let body = serde_json::to_value(&body)
            .map_err(|e| EngineError::Internal(format!("Failed to encode swap request: {}", e)))?;

        let swap = self
            .execute("create swap", ApiRequest::post(self.url("/swaps"), body), parse_swap)
            .await?;

        info!(
            "Created swap {} ({} {} -> {})",
            swap.id, request.amount, request.source_network, request.destination_network
        );
        crate::metrics::record_swap_created(&request.source_network, &request.destination_network);

        Ok(swap)
    }

    async fn get_swap_status(&self, swap_id: &str) -> EngineResult<SwapRecord> {
        if !SWAP_ID.is_match(swap_id) {
            return Err(EngineError::Validation(format!("Invalid swap id: {:?}", swap_id)));
        }

        self.execute(
            "get swap status",
            ApiRequest::get(self.url(&format!("/swaps/{}", swap_id))),
            parse_swap,
        )
        .await
    }
}

fn ensure_api_key(api_key: &str) -> EngineResult<()> {
    if api_key.trim().is_empty() {
        return Err(EngineError::Config(
            "Swap network API key is required".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::transport::{ApiResponse, HttpMethod, MockHttpTransport};
    use crate::remote::types::SwapStatus;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tokio::time::Instant;

    fn config() -> BridgeConfig {
        let mut config = BridgeConfig::with_api_key("test-key");
        config.base_url = "https://bridge.test/api/v2/".to_string();
        config
    }

    fn client(transport: MockHttpTransport) -> LayerswapClient {
        LayerswapClient::with_transport(&config(), Arc::new(transport)).unwrap()
    }

    fn request() -> BridgeRequest {
        BridgeRequest {
            source_network: "starknet_mainnet".into(),
            destination_network: "base_mainnet".into(),
            source_token: "ETH".into(),
            destination_token: "ETH".into(),
            amount: Decimal::new(1, 1),
            source_address: Some(format!("0x{}", "a".repeat(64))),
            destination_address: format!("0x{}", "b".repeat(40)),
            refund_address: None,
        }
    }

    fn route_body() -> Value {
        json!({"routes": [{
            "source_network": "starknet_mainnet",
            "destination_network": "base_mainnet",
            "source_tokens": ["ETH"],
            "destination_tokens": ["ETH"]
        }]})
    }

    #[test]
    fn test_missing_api_key_fails_fast() {
        let config = BridgeConfig::with_api_key("  ");
        let result = LayerswapClient::with_transport(&config, Arc::new(MockHttpTransport::new()));
        assert!(matches!(result, Err(EngineError::Config(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_routes() {
        let mut transport = MockHttpTransport::new();
        transport
            .expect_execute()
            .withf(|r| r.method == HttpMethod::Get && r.url == "https://bridge.test/api/v2/networks")
            .times(1)
            .returning(|_| Ok(ApiResponse::new(200, route_body())));

        let routes = client(transport).get_available_routes().await.unwrap();
        assert_eq!(routes.len(), 1);
        assert!(routes[0].connects("starknet_mainnet", "base_mainnet"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failures_are_retried_with_fresh_request_ids() {
        let calls = Arc::new(AtomicUsize::new(0));
        let request_ids = Arc::new(Mutex::new(Vec::new()));

        let mut transport = MockHttpTransport::new();
        {
            let calls = calls.clone();
            let request_ids = request_ids.clone();
            transport.expect_execute().times(3).returning(move |r| {
                request_ids.lock().unwrap().push(r.request_id.clone());
                match calls.fetch_add(1, Ordering::SeqCst) {
                    0 => Err(EngineError::Transport("connection reset".into())),
                    1 => Ok(ApiResponse::new(200, json!({"unexpected": true}))),
                    _ => Ok(ApiResponse::new(200, route_body())),
                }
            });
        }

        let routes = client(transport).get_available_routes().await.unwrap();
        assert_eq!(routes.len(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 3);

        let ids = request_ids.lock().unwrap();
        assert!(ids.iter().all(|id| !id.is_empty()));
        assert_ne!(ids[0], ids[1]);
        assert_ne!(ids[1], ids[2]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_reports_attempts_and_cause() {
        let mut transport = MockHttpTransport::new();
        transport
            .expect_execute()
            .times(3)
            .returning(|_| Ok(ApiResponse::new(500, json!({"message": "boom"}))));

        let start = Instant::now();
        let err = client(transport).get_available_routes().await.unwrap_err();
        match &err {
            EngineError::RetriesExhausted { attempts, .. } => assert_eq!(*attempts, 3),
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(err.to_string().contains("boom"));

        // Two fixed delays separate the three attempts
        let elapsed = start.elapsed();
        assert!(elapsed >= config().retry_delay() * 2, "elapsed {:?}", elapsed);
        assert!(elapsed < config().retry_delay() * 3, "elapsed {:?}", elapsed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_body_with_success_status_is_classified() {
        let mut transport = MockHttpTransport::new();
        transport
            .expect_execute()
            .times(3)
            .returning(|_| Ok(ApiResponse::new(200, json!({"error": "ROUTE_NOT_FOUND_ERROR"}))));

        let err = client(transport).create_swap(&request()).await.unwrap_err();
        assert!(matches!(err.root(), EngineError::RouteNotFound(_)));
        let text = err.to_string();
        assert!(text.contains("route"));
        assert!(text.contains("intermediate"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_route_not_found_surfaces_guidance() {
        let mut transport = MockHttpTransport::new();
        transport.expect_execute().returning(|_| {
            Ok(ApiResponse::new(
                400,
                json!({"error": {"code": "ROUTE_NOT_FOUND_ERROR", "message": "No route"}}),
            ))
        });

        let err = client(transport).create_swap(&request()).await.unwrap_err();
        assert!(matches!(err.root(), EngineError::RouteNotFound(_)));
        assert!(err.to_string().contains("intermediate"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_swap_posts_body() {
        let mut transport = MockHttpTransport::new();
        transport
            .expect_execute()
            .withf(|r| {
                let body = r.body.as_ref().unwrap();
                r.method == HttpMethod::Post
                    && r.url.ends_with("/swaps")
                    && body["source_network"] == "starknet_mainnet"
                    && body["amount"] == json!(0.1)
                    && body["use_deposit_address"] == json!(true)
            })
            .times(1)
            .returning(|_| {
                Ok(ApiResponse::new(
                    200,
                    json!({"data": {"id": "swap-1", "status": "created"}}),
                ))
            });

        let swap = client(transport).create_swap(&request()).await.unwrap();
        assert_eq!(swap.id, "swap-1");
        assert_eq!(swap.status, SwapStatus::Pending);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_requests_never_reach_network() {
        let mut transport = MockHttpTransport::new();
        transport.expect_execute().times(0);
        let client = client(transport);

        let mut bad_address = request();
        bad_address.destination_address = "not-an-address".into();
        let err = client.create_swap(&bad_address).await.unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));

        let mut zero = request();
        zero.amount = Decimal::ZERO;
        assert!(client.create_swap(&zero).await.unwrap_err().is_validation());

        let mut no_token = request();
        no_token.source_token = String::new();
        assert!(client.create_swap(&no_token).await.unwrap_err().is_validation());

        let err = client.get_swap_status("../etc/passwd").await.unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_requests_are_paced() {
        let mut transport = MockHttpTransport::new();
        transport
            .expect_execute()
            .times(2)
            .returning(|_| Ok(ApiResponse::new(200, json!({"id": "swap-1", "status": "pending"}))));

        let client = client(transport);
        let start = Instant::now();
        client.get_swap_status("swap-1").await.unwrap();
        client.get_swap_status("swap-1").await.unwrap();

        assert!(start.elapsed() >= Duration::from_millis(1000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_client_errors_are_retried_then_reported() {
        let mut transport = MockHttpTransport::new();
        transport
            .expect_execute()
            .times(3)
            .returning(|_| Ok(ApiResponse::new(401, json!({}))));

        let err = client(transport).get_swap_status("swap-1").await.unwrap_err();
        assert!(matches!(err.root(), EngineError::RemoteApi { status: 401, .. }));
    }
}
