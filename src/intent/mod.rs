//! Transaction intents as produced by the external intent resolver
//!
//! The resolver turns free text into a structured action plus extracted
//! parameters. The core treats the result as read-only input and only
//! depends on the JSON contract defined here.

pub mod steps;

pub use steps::{ContractCall, ProcessedTransaction, StatusStep, StepStatus, TransactionStep};

use crate::error::{EngineError, EngineResult};

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// The closed set of actions the processor can dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Swap,
    Transfer,
    Deposit,
    Withdraw,
    Bridge,
}

impl ActionKind {
    pub const ALL: [ActionKind; 5] = [
        ActionKind::Swap,
        ActionKind::Transfer,
        ActionKind::Deposit,
        ActionKind::Withdraw,
        ActionKind::Bridge,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Swap => "swap",
            ActionKind::Transfer => "transfer",
            ActionKind::Deposit => "deposit",
            ActionKind::Withdraw => "withdraw",
            ActionKind::Bridge => "bridge",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionKind {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        ActionKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| EngineError::UnsupportedAction(s.to_string()))
    }
}

/// Structured intent: action, extracted parameters and action payload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionIntent {
    #[serde(default = "default_solver")]
    pub solver: String,
    pub action: String,
    #[serde(default, alias = "extracted_params")]
    pub extracted_params: ExtractedParams,
    #[serde(default)]
    pub data: IntentData,
}

fn default_solver() -> String {
    "brian".to_string()
}

impl TransactionIntent {
    pub fn new(action: ActionKind, extracted_params: ExtractedParams, data: IntentData) -> Self {
        Self {
            solver: default_solver(),
            action: action.as_str().to_string(),
            extracted_params,
            data,
        }
    }

    /// The dispatchable action, or `UnsupportedAction` for anything else
    pub fn action_kind(&self) -> EngineResult<ActionKind> {
        self.action.parse()
    }
}

/// Parameters the resolver extracted from the user's request.
///
/// Values may arrive as strings or numbers; empty strings count as absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedParams {
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub token1: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub token2: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub chain: Option<String>,
    #[serde(
        default,
        alias = "destChain",
        alias = "destinationChain",
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub dest_chain: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub amount: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(
        default,
        rename = "destinationAddress",
        alias = "destination_address",
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub destination_address: Option<String>,
}

/// Action-specific payload attached to an intent
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub steps: Vec<IntentStep>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bridge: Option<BridgeData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_token: Option<TokenInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_token: Option<TokenInfo>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub from_amount: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub to_amount: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiver: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
}

/// A precomputed step descriptor from the resolver
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentStep {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approve: Option<TransactionStep>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_data: Option<TransactionStep>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entrypoint: Option<String>,
    #[serde(default, deserialize_with = "lenient_optional_calldata", skip_serializing_if = "Option::is_none")]
    pub calldata: Option<Vec<String>>,
}

impl IntentStep {
    /// The step's own call, when all three call fields are present
    pub fn direct_call(&self) -> Option<TransactionStep> {
        match (&self.contract_address, &self.entrypoint, &self.calldata) {
            (Some(address), Some(entrypoint), Some(calldata)) => Some(TransactionStep::call(
                address.clone(),
                entrypoint.clone(),
                calldata.clone(),
            )),
            _ => None,
        }
    }
}

/// Bridge sub-record of an intent payload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_network: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination_network: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination_token: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub amount: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refund_address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenInfo {
    pub address: String,
    pub symbol: String,
    pub decimals: u8,
}

/// Parse the resolver's raw output into an intent.
///
/// Markdown code fences around the JSON are tolerated; anything that is not
/// a well-formed intent is a hard failure and is never retried.
pub fn parse_intent(raw: &str) -> EngineResult<TransactionIntent> {
    let trimmed = raw.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.trim_end().strip_suffix("```"))
        .unwrap_or(trimmed)
        .trim();

    serde_json::from_str(body).map_err(|e| EngineError::IntentParse(e.to_string()))
}

fn value_to_string(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

pub(crate) fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Value>::deserialize(deserializer)?.and_then(value_to_string))
}

pub(crate) fn lenient_calldata<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let values = Vec::<Value>::deserialize(deserializer)?;
    Ok(values
        .into_iter()
        .map(|v| match v {
            Value::String(s) => s,
            other => other.to_string(),
        })
        .collect())
}

fn lenient_optional_calldata<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let values = Option::<Vec<Value>>::deserialize(deserializer)?;
    Ok(values.map(|values| {
        values
            .into_iter()
            .map(|v| match v {
                Value::String(s) => s,
                other => other.to_string(),
            })
            .collect()
    }))
}
