//! Action handlers and the transaction processor
//!
//! Each handler turns one kind of intent into an ordered list of
//! transaction steps. The processor picks the handler by action kind and
//! wraps its output into a `ProcessedTransaction`.

pub mod bridge;
pub mod lending;
pub mod passthrough;
pub mod processor;

pub use bridge::BridgeHandler;
pub use lending::{DepositHandler, WithdrawHandler};
pub use passthrough::{SwapHandler, TransferHandler};
pub use processor::TransactionProcessor;

use crate::error::EngineResult;
use crate::intent::{ExtractedParams, IntentData, TransactionStep};

use async_trait::async_trait;

/// Uniform contract for every action kind
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ActionHandler: Send + Sync {
    /// Produce the full step list for an intent, or fail without partial output
    async fn process_steps(
        &self,
        data: &IntentData,
        params: &ExtractedParams,
    ) -> EngineResult<Vec<TransactionStep>>;
}
