//! Swap and transfer handlers over precomputed resolver steps

use super::ActionHandler;
use crate::error::EngineResult;
use crate::intent::{ExtractedParams, IntentData, TransactionStep};

use async_trait::async_trait;
use tracing::debug;

/// Flattens approve, transaction data and direct calls, in step order
pub struct SwapHandler;

#[async_trait]
impl ActionHandler for SwapHandler {
    async fn process_steps(
        &self,
        data: &IntentData,
        _params: &ExtractedParams,
    ) -> EngineResult<Vec<TransactionStep>> {
        let mut transactions = Vec::new();

        for step in &data.steps {
            if let Some(approve) = &step.approve {
                transactions.push(approve.clone());
            }
            if let Some(transaction) = &step.transaction_data {
                transactions.push(transaction.clone());
            }
            if let Some(call) = step.direct_call() {
                transactions.push(call);
            }
        }

        debug!("Swap produced {} steps", transactions.len());
        Ok(transactions)
    }
}

/// Keeps only steps that carry a complete direct call
pub struct TransferHandler;

#[async_trait]
impl ActionHandler for TransferHandler {
    async fn process_steps(
        &self,
        data: &IntentData,
        _params: &ExtractedParams,
    ) -> EngineResult<Vec<TransactionStep>> {
        let transactions: Vec<_> = data.steps.iter().filter_map(|s| s.direct_call()).collect();

        debug!("Transfer produced {} steps", transactions.len());
        Ok(transactions)
    }
}
