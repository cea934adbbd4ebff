//! Remote swap network
//!
//! Typed operations against the third-party swap network that performs the
//! actual cross-network transfer:
//! - Route catalog lookup
//! - Swap creation
//! - Swap status lookup

pub mod client;
pub mod failure;
pub mod rate_limit;
pub mod transport;
pub mod types;

pub use client::LayerswapClient;
pub use failure::classify_failure;
pub use rate_limit::RateLimiter;
pub use transport::{ApiRequest, ApiResponse, HttpMethod, HttpTransport, ReqwestTransport};
pub use types::{BridgeRequest, DepositAction, Route, SwapRecord, SwapStatus};

use crate::error::EngineResult;

use async_trait::async_trait;

/// Operations the orchestration core needs from the swap network
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SwapApi: Send + Sync {
    /// Fetch the currently tradable routes
    async fn get_available_routes(&self) -> EngineResult<Vec<Route>>;

    /// Create a swap for a request that passed local validation
    async fn create_swap(&self, request: &BridgeRequest) -> EngineResult<SwapRecord>;

    /// Look up a swap by id
    async fn get_swap_status(&self, swap_id: &str) -> EngineResult<SwapRecord>;
}
