//! Remote swap network data model and wire-format parsing

use crate::error::{EngineError, EngineResult};
use crate::intent::lenient_string;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

/// A validated request to bridge one token balance between networks
#[derive(Debug, Clone, PartialEq)]
pub struct BridgeRequest {
    pub source_network: String,
    pub destination_network: String,
    pub source_token: String,
    pub destination_token: String,
    pub amount: Decimal,
    pub source_address: Option<String>,
    pub destination_address: String,
    pub refund_address: Option<String>,
}

/// A tradable network pair with the tokens supported on each side
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Route {
    pub source_network: String,
    pub destination_network: String,
    pub source_tokens: Vec<String>,
    pub destination_tokens: Vec<String>,
}

impl Route {
    pub fn connects(&self, source_network: &str, destination_network: &str) -> bool {
        self.source_network == source_network && self.destination_network == destination_network
    }

    /// Symbols tradable on both sides, in source order
    pub fn common_tokens(&self) -> Vec<String> {
        let mut common: Vec<String> = Vec::new();
        for token in &self.source_tokens {
            if self.destination_tokens.contains(token) && !common.contains(token) {
                common.push(token.clone());
            }
        }
        common
    }
}

/// Lifecycle of a remote swap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SwapStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Refunded,
    Cancelled,
}

impl SwapStatus {
    /// Map the remote network's status vocabulary onto the lifecycle.
    ///
    /// Unknown values are treated as still pending so that polling continues.
    pub fn from_remote(status: &str) -> Self {
        match status.trim().to_lowercase().as_str() {
            "processing" | "ls_transfer_pending" | "user_transfer_delayed" => {
                SwapStatus::Processing
            }
            "completed" | "success" => SwapStatus::Completed,
            "failed" => SwapStatus::Failed,
            "refunded" => SwapStatus::Refunded,
            "cancelled" | "canceled" | "expired" => SwapStatus::Cancelled,
            _ => SwapStatus::Pending,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SwapStatus::Completed | SwapStatus::Failed | SwapStatus::Refunded | SwapStatus::Cancelled
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SwapStatus::Pending => "pending",
            SwapStatus::Processing => "processing",
            SwapStatus::Completed => "completed",
            SwapStatus::Failed => "failed",
            SwapStatus::Refunded => "refunded",
            SwapStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for SwapStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the caller must do on-chain to fund a swap
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepositAction {
    #[serde(rename = "type", default)]
    pub kind: String,
    /// JSON-encoded list of call descriptors
    #[serde(default, deserialize_with = "lenient_string")]
    pub call_data: Option<String>,
    #[serde(default)]
    pub deposit_address: Option<String>,
    #[serde(default)]
    pub explorer_url: Option<String>,
}

/// The remote network's record of one swap
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SwapRecord {
    pub id: String,
    pub status: SwapStatus,
    pub created_at: Option<String>,
    pub source_network: Option<String>,
    pub destination_network: Option<String>,
    pub source_token: Option<String>,
    pub destination_token: Option<String>,
    pub amount: Option<String>,
    pub source_address: Option<String>,
    pub destination_address: Option<String>,
    pub deposit_actions: Vec<DepositAction>,
    pub transaction_id: Option<String>,
}

impl SwapRecord {
    /// Minimal record, mostly useful for fixtures
    pub fn new(id: impl Into<String>, status: SwapStatus) -> Self {
        Self {
            id: id.into(),
            status,
            created_at: None,
            source_network: None,
            destination_network: None,
            source_token: None,
            destination_token: None,
            amount: None,
            source_address: None,
            destination_address: None,
            deposit_actions: Vec::new(),
            transaction_id: None,
        }
    }
}

/// Body of `POST /swaps`
#[derive(Debug, Clone, Serialize)]
pub(crate) struct CreateSwapBody<'a> {
    pub source_network: &'a str,
    pub destination_network: &'a str,
    pub source_token: &'a str,
    pub destination_token: &'a str,
    pub amount: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_address: Option<&'a str>,
    pub destination_address: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_deposit_address: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refund_address: Option<&'a str>,
}

impl<'a> CreateSwapBody<'a> {
    pub fn from_request(request: &'a BridgeRequest, use_deposit_address: bool) -> EngineResult<Self> {
        let amount = request.amount.to_f64().ok_or_else(|| {
            EngineError::Validation(format!("Amount {} is not representable", request.amount))
        })?;

        Ok(Self {
            source_network: &request.source_network,
            destination_network: &request.destination_network,
            source_token: &request.source_token,
            destination_token: &request.destination_token,
            amount,
            source_address: request.source_address.as_deref(),
            destination_address: &request.destination_address,
            use_deposit_address: use_deposit_address.then_some(true),
            refund_address: request.refund_address.as_deref(),
        })
    }
}

/// Payloads may arrive bare or wrapped in `{"data": ...}`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Envelope<T> {
    Wrapped { data: T },
    Bare(T),
}

impl<T> Envelope<T> {
    fn into_inner(self) -> T {
        match self {
            Envelope::Wrapped { data } => data,
            Envelope::Bare(inner) => inner,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawSwap {
    id: String,
    status: String,
    #[serde(default, alias = "created_date")]
    created_at: Option<String>,
    #[serde(default)]
    source_network: Option<String>,
    #[serde(default)]
    destination_network: Option<String>,
    #[serde(default)]
    source_token: Option<String>,
    #[serde(default)]
    destination_token: Option<String>,
    #[serde(default, alias = "source_amount", deserialize_with = "lenient_string")]
    amount: Option<String>,
    #[serde(default)]
    source_address: Option<String>,
    #[serde(default)]
    destination_address: Option<String>,
    #[serde(default)]
    deposit_actions: Vec<DepositAction>,
    #[serde(default)]
    transaction_id: Option<String>,
}

/// Parse a swap payload; it must carry a string `id` and `status`
pub(crate) fn parse_swap(body: Value) -> EngineResult<SwapRecord> {
    let raw = serde_json::from_value::<Envelope<RawSwap>>(body)
        .map_err(|e| EngineError::MalformedResponse {
            operation: "swap".to_string(),
            message: e.to_string(),
        })?
        .into_inner();

    Ok(SwapRecord {
        status: SwapStatus::from_remote(&raw.status),
        id: raw.id,
        created_at: raw.created_at,
        source_network: raw.source_network,
        destination_network: raw.destination_network,
        source_token: raw.source_token,
        destination_token: raw.destination_token,
        amount: raw.amount,
        source_address: raw.source_address,
        destination_address: raw.destination_address,
        deposit_actions: raw.deposit_actions,
        transaction_id: raw.transaction_id,
    })
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawToken {
    Symbol(String),
    Detailed { symbol: String },
}

impl RawToken {
    fn symbol(&self) -> String {
        match self {
            RawToken::Symbol(symbol) | RawToken::Detailed { symbol } => symbol.to_uppercase(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawNetwork {
    Name(String),
    Detailed {
        #[serde(default)]
        internal_name: Option<String>,
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        id: Option<String>,
        #[serde(default)]
        tokens: Vec<RawToken>,
    },
}

impl RawNetwork {
    fn name(&self) -> Option<String> {
        match self {
            RawNetwork::Name(name) => Some(name.to_lowercase()),
            RawNetwork::Detailed {
                internal_name,
                name,
                id,
                ..
            } => internal_name
                .as_ref()
                .or(name.as_ref())
                .or(id.as_ref())
                .map(|n| n.to_lowercase()),
        }
    }

    fn tokens(&self) -> Vec<String> {
        match self {
            RawNetwork::Name(_) => Vec::new(),
            RawNetwork::Detailed { tokens, .. } => tokens.iter().map(RawToken::symbol).collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawRoute {
    source_network: String,
    destination_network: String,
    source_tokens: Vec<RawToken>,
    destination_tokens: Vec<RawToken>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawRoutes {
    Listed {
        routes: Vec<RawRoute>,
    },
    Catalog {
        source_networks: Vec<RawNetwork>,
        destination_networks: Vec<RawNetwork>,
        #[serde(default)]
        tokens: HashMap<String, Vec<RawToken>>,
    },
    Networks(Vec<RawNetwork>),
}

/// Parse the route catalog into concrete routes.
///
/// Catalog and network-list shapes expand to one route per ordered pair of
/// distinct networks.
pub(crate) fn parse_routes(body: Value) -> EngineResult<Vec<Route>> {
    let raw = serde_json::from_value::<Envelope<RawRoutes>>(body)
        .map_err(|e| EngineError::MalformedResponse {
            operation: "routes".to_string(),
            message: e.to_string(),
        })?
        .into_inner();

    let routes = match raw {
        RawRoutes::Listed { routes } => routes
            .into_iter()
            .map(|r| Route {
                source_network: r.source_network.to_lowercase(),
                destination_network: r.destination_network.to_lowercase(),
                source_tokens: r.source_tokens.iter().map(RawToken::symbol).collect(),
                destination_tokens: r.destination_tokens.iter().map(RawToken::symbol).collect(),
            })
            .collect(),
        RawRoutes::Catalog {
            source_networks,
            destination_networks,
            tokens,
        } => {
            let tokens: HashMap<String, Vec<String>> = tokens
                .into_iter()
                .map(|(network, list)| {
                    (network.to_lowercase(), list.iter().map(RawToken::symbol).collect())
                })
                .collect();
            let tokens_for = |network: &RawNetwork, name: &str| {
                tokens
                    .get(name)
                    .cloned()
                    .unwrap_or_else(|| network.tokens())
            };

            let mut routes = Vec::new();
            for source in &source_networks {
                let Some(source_name) = source.name() else { continue };
                for destination in &destination_networks {
                    let Some(destination_name) = destination.name() else { continue };
                    if source_name == destination_name {
                        continue;
                    }
                    routes.push(Route {
                        source_tokens: tokens_for(source, &source_name),
                        destination_tokens: tokens_for(destination, &destination_name),
                        source_network: source_name.clone(),
                        destination_network: destination_name,
                    });
                }
            }
            routes
        }
        RawRoutes::Networks(networks) => {
            let named: Vec<(String, Vec<String>)> = networks
                .iter()
                .filter_map(|n| n.name().map(|name| (name, n.tokens())))
                .collect();

            let mut routes = Vec::new();
            for (source, source_tokens) in &named {
                for (destination, destination_tokens) in &named {
                    if source != destination {
                        routes.push(Route {
                            source_network: source.clone(),
                            destination_network: destination.clone(),
                            source_tokens: source_tokens.clone(),
                            destination_tokens: destination_tokens.clone(),
                        });
                    }
                }
            }
            routes
        }
    };

    Ok(routes)
}
