//! Executable steps and the processed-transaction record handed to the log store

use super::{lenient_calldata, BridgeData, TokenInfo};

use serde::{Deserialize, Serialize};

/// The universal output unit of every action handler
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TransactionStep {
    /// An unsigned contract invocation
    Call(ContractCall),
    /// A descriptive or status entry with no call attached
    Status(StatusStep),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractCall {
    #[serde(alias = "contract_address")]
    pub contract_address: String,
    pub entrypoint: String,
    #[serde(default, deserialize_with = "lenient_calldata")]
    pub calldata: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusStep {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(alias = "message")]
    pub description: String,
    pub status: StepStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Pending,
    #[serde(alias = "completed")]
    Success,
    Failed,
    Warning,
}

impl TransactionStep {
    pub fn call(
        contract_address: impl Into<String>,
        entrypoint: impl Into<String>,
        calldata: Vec<String>,
    ) -> Self {
        TransactionStep::Call(ContractCall {
            contract_address: contract_address.into(),
            entrypoint: entrypoint.into(),
            calldata,
        })
    }

    pub fn status(
        kind: impl Into<String>,
        description: impl Into<String>,
        status: StepStatus,
    ) -> Self {
        TransactionStep::Status(StatusStep {
            kind: kind.into(),
            description: description.into(),
            status,
            url: None,
            error: None,
        })
    }

    /// Attach a URL to a status step; calls are returned unchanged
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        if let TransactionStep::Status(step) = &mut self {
            step.url = Some(url.into());
        }
        self
    }

    /// Attach an error to a status step; calls are returned unchanged
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        if let TransactionStep::Status(step) = &mut self {
            step.error = Some(error.into());
        }
        self
    }

    pub fn as_call(&self) -> Option<&ContractCall> {
        match self {
            TransactionStep::Call(call) => Some(call),
            TransactionStep::Status(_) => None,
        }
    }

    pub fn as_status(&self) -> Option<&StatusStep> {
        match self {
            TransactionStep::Status(step) => Some(step),
            TransactionStep::Call(_) => None,
        }
    }
}

/// Final result of one processed intent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedTransaction {
    pub success: bool,
    pub description: String,
    pub transactions: Vec<TransactionStep>,
    pub action: String,
    pub solver: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_token: Option<TokenInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_token: Option<TokenInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_amount: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_amount: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiver: Option<String>,
    /// Gas is not simulated; always "0"
    pub estimated_gas: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bridge: Option<BridgeData>,
}
