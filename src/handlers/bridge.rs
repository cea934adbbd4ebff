//! Bridge handler: validation, swap creation and deposit mapping

use super::ActionHandler;
use crate::bridge::{BridgeValidator, SwapMonitor, BRIDGE_STEP_TYPE};
use crate::config::{BridgeConfig, BridgeMode};
use crate::error::{EngineError, EngineResult};
use crate::intent::{ExtractedParams, IntentData, StepStatus, TransactionStep};
use crate::remote::{BridgeRequest, SwapApi, SwapRecord};

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub const INITIATE_STEP_TYPE: &str = "bridge_initiate";
pub const DEPOSIT_STEP_TYPE: &str = "bridge_deposit";
const DEFAULT_TOKEN: &str = "ETH";

/// Bridge parameters merged from the intent's params and bridge sub-record
#[derive(Debug, Clone, PartialEq)]
struct BridgeParams {
    source_network: String,
    destination_network: String,
    source_token: String,
    destination_token: String,
    amount: String,
    source_address: String,
    destination_address: String,
    refund_address: Option<String>,
}

/// Orchestrates a bridge end to end over the remote swap network
pub struct BridgeHandler {
    api: Arc<dyn SwapApi>,
    validator: Arc<BridgeValidator>,
    monitor: SwapMonitor,
    mode: BridgeMode,
    default_source_network: String,
    default_destination_network: String,
    cancel: CancellationToken,
}

impl BridgeHandler {
    pub fn new(
        api: Arc<dyn SwapApi>,
        validator: Arc<BridgeValidator>,
        monitor: SwapMonitor,
        config: &BridgeConfig,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            api,
            validator,
            monitor,
            mode: config.mode,
            default_source_network: config.default_source_network.clone(),
            default_destination_network: config.default_destination_network.clone(),
            cancel,
        }
    }

    fn cancelled(&self) -> EngineError {
        EngineError::Cancelled {
            operation: "bridge".to_string(),
        }
    }

    /// Explicit params win over the bridge sub-record; gaps fall back to defaults
    fn merge_params(&self, data: &IntentData, params: &ExtractedParams) -> EngineResult<BridgeParams> {
        let bridge = data.bridge.clone().unwrap_or_default();

        let source_network = params
            .chain
            .clone()
            .or(bridge.source_network)
            .unwrap_or_else(|| self.default_source_network.clone());
        let destination_network = params
            .dest_chain
            .clone()
            .or(bridge.destination_network)
            .unwrap_or_else(|| self.default_destination_network.clone());

        let source_token = params
            .token1
            .clone()
            .or(bridge.source_token)
            .unwrap_or_else(|| DEFAULT_TOKEN.to_string());
        let destination_token = params
            .token2
            .clone()
            .or(bridge.destination_token)
            .unwrap_or_else(|| source_token.clone());

        let amount = params
            .amount
            .clone()
            .or(bridge.amount)
            .ok_or_else(|| EngineError::Validation("Bridge amount is required".to_string()))?;

        let source_address = bridge
            .source_address
            .or_else(|| params.address.clone())
            .ok_or_else(|| EngineError::Validation("Source address is required".to_string()))?;
        let destination_address = params
            .destination_address
            .clone()
            .or(bridge.destination_address)
            .unwrap_or_else(|| source_address.clone());

        Ok(BridgeParams {
            source_network: self.validator.format_network(&source_network),
            destination_network: self.validator.format_network(&destination_network),
            source_token,
            destination_token,
            amount,
            source_address,
            destination_address,
            refund_address: bridge.refund_address,
        })
    }

    /// Map deposit actions into steps.
    ///
    /// The swap already exists remotely at this point, so call data that
    /// cannot be read becomes a failed or descriptive step instead of an error.
    fn deposit_steps(swap: &SwapRecord) -> Vec<TransactionStep> {
        let mut steps = Vec::new();

        for action in &swap.deposit_actions {
            if let Some(call_data) = &action.call_data {
                match serde_json::from_str::<Vec<Value>>(call_data) {
                    Ok(entries) => steps.extend(entries.into_iter().map(|entry| {
                        Self::deposit_entry(&action.kind, entry)
                    })),
                    Err(e) => {
                        warn!("Swap {} has unreadable call data: {}", swap.id, e);
                        steps.push(
                            TransactionStep::status(
                                DEPOSIT_STEP_TYPE,
                                format!("Deposit action {} for swap {} could not be read", action.kind, swap.id),
                                StepStatus::Failed,
                            )
                            .with_error(format!("Invalid call data: {}", e)),
                        );
                    }
                }
            } else if let Some(deposit_address) = &action.deposit_address {
                let step = TransactionStep::status(
                    DEPOSIT_STEP_TYPE,
                    format!("Send funds to deposit address {}", deposit_address),
                    StepStatus::Pending,
                );
                steps.push(match &action.explorer_url {
                    Some(url) => step.with_url(url.clone()),
                    None => step,
                });
            }
        }

        debug!("Swap {} mapped to {} deposit steps", swap.id, steps.len());
        steps
    }

    /// One call data entry: a full call or status step, otherwise a description of it
    fn deposit_entry(action_kind: &str, entry: Value) -> TransactionStep {
        if let Ok(step) = serde_json::from_value::<TransactionStep>(entry.clone()) {
            return step;
        }

        let label = entry
            .get("type")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| entry.to_string());
        TransactionStep::status(
            DEPOSIT_STEP_TYPE,
            format!("Deposit action {}: {}", action_kind, label),
            StepStatus::Pending,
        )
    }
}

#[async_trait]
impl ActionHandler for BridgeHandler {
    async fn process_steps(
        &self,
        data: &IntentData,
        params: &ExtractedParams,
    ) -> EngineResult<Vec<TransactionStep>> {
        if self.cancel.is_cancelled() {
            return Err(self.cancelled());
        }

        let merged = self.merge_params(data, params)?;

        // Local checks first so bad input never reaches the network
        let amount = self
            .validator
            .validate_amount(&merged.amount, &merged.source_token)?;
        self.validator.validate_addresses(
            &merged.source_network,
            &merged.source_address,
            &merged.destination_network,
            &merged.destination_address,
        )?;

        let (source_token, destination_token) = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(self.cancelled()),
            pair = self.validator.validate_token_pair(
                &merged.source_network,
                &merged.destination_network,
                &merged.source_token,
                &merged.destination_token,
            ) => pair?,
        };

        let request = BridgeRequest {
            source_network: merged.source_network.clone(),
            destination_network: merged.destination_network.clone(),
            source_token,
            destination_token,
            amount,
            source_address: Some(merged.source_address.clone()),
            destination_address: merged.destination_address.clone(),
            refund_address: merged.refund_address.clone(),
        };

        let created = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(self.cancelled()),
            swap = self.api.create_swap(&request) => swap,
        };
        let swap = match created {
            Ok(swap) => swap,
            Err(e) => {
                if matches!(e.root(), EngineError::RouteNotFound(_)) {
                    // Cached routes disagree with the swap network
                    self.validator.refresh_routes().await;
                }
                return Err(e);
            }
        };
        info!(
            "Bridge swap {} created: {} {} {} -> {}",
            swap.id, request.amount, request.source_token, request.source_network, request.destination_network
        );

        let mut steps = vec![TransactionStep::status(
            INITIATE_STEP_TYPE,
            format!(
                "Bridge {} {} from {} to {} initiated (swap {})",
                request.amount,
                request.source_token,
                request.source_network,
                request.destination_network,
                swap.id
            ),
            StepStatus::Pending,
        )
        .with_url(self.monitor.tracking_link(&swap.id))];

        if let Some(transaction_id) = &swap.transaction_id {
            steps.push(
                TransactionStep::status(
                    BRIDGE_STEP_TYPE,
                    format!("Bridge transaction created with ID {}", transaction_id),
                    StepStatus::Pending,
                )
                .with_url(self.monitor.tracking_link(&swap.id)),
            );
        }

        match self.mode {
            BridgeMode::DepositCalls => steps.extend(Self::deposit_steps(&swap)),
            BridgeMode::Track => steps.extend(self.monitor.monitor(&swap.id, &self.cancel).await?),
        }

        Ok(steps)
    }
}
