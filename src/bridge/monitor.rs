//! Swap lifecycle polling

use crate::config::MonitorConfig;
use crate::error::{EngineError, EngineResult};
use crate::intent::{StepStatus, TransactionStep};
use crate::remote::{SwapApi, SwapRecord, SwapStatus};

use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub const BRIDGE_STEP_TYPE: &str = "bridge_transaction";

/// Polls a swap until it settles or the attempt budget runs out
pub struct SwapMonitor {
    api: Arc<dyn SwapApi>,
    max_attempts: u32,
    min_delay: Duration,
    max_delay: Duration,
    tracking_url: String,
}

impl SwapMonitor {
    pub fn new(api: Arc<dyn SwapApi>, config: &MonitorConfig, tracking_url: &str) -> Self {
        let min_delay = Duration::from_millis(config.min_delay_ms);
        Self {
            api,
            max_attempts: config.max_attempts.max(1),
            min_delay,
            max_delay: Duration::from_millis(config.max_delay_ms).max(min_delay),
            tracking_url: tracking_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn tracking_link(&self, swap_id: &str) -> String {
        format!("{}/{}", self.tracking_url, swap_id)
    }

    fn next_delay(&self) -> Duration {
        let min = self.min_delay.as_millis() as u64;
        let max = self.max_delay.as_millis() as u64;
        Duration::from_millis(rand::thread_rng().gen_range(min..=max))
    }

    /// Poll until a terminal status and return exactly one summary step.
    ///
    /// Running out of attempts yields a warning step rather than an error.
    /// Cancelling `cancel` abandons the loop at the next suspension point.
    pub async fn monitor(
        &self,
        swap_id: &str,
        cancel: &CancellationToken,
    ) -> EngineResult<Vec<TransactionStep>> {
        let cancelled = || EngineError::Cancelled {
            operation: format!("monitoring swap {}", swap_id),
        };

        for attempt in 1..=self.max_attempts {
            if cancel.is_cancelled() {
                return Err(cancelled());
            }

            let swap = tokio::select! {
                _ = cancel.cancelled() => return Err(cancelled()),
                swap = self.api.get_swap_status(swap_id) => swap?,
            };
            crate::metrics::record_monitor_poll();
            debug!(
                "Swap {} is {} (poll {}/{})",
                swap_id, swap.status, attempt, self.max_attempts
            );

            if swap.status.is_terminal() {
                crate::metrics::record_monitor_outcome(swap.status.as_str());
                return Ok(vec![self.terminal_step(&swap)]);
            }

            if attempt < self.max_attempts {
                let delay = self.next_delay();
                tokio::select! {
                    _ = cancel.cancelled() => return Err(cancelled()),
                    _ = sleep(delay) => {}
                }
            }
        }

        warn!(
            "Swap {} did not settle after {} polls",
            swap_id, self.max_attempts
        );
        crate::metrics::record_monitor_outcome("unsettled");

        Ok(vec![TransactionStep::status(
            BRIDGE_STEP_TYPE,
            format!(
                "Swap {} is still in progress. Please check the status manually",
                swap_id
            ),
            StepStatus::Warning,
        )
        .with_url(self.tracking_link(swap_id))])
    }

    fn terminal_step(&self, swap: &SwapRecord) -> TransactionStep {
        let url = self.tracking_link(&swap.id);
        match swap.status {
            SwapStatus::Completed => {
                info!("Swap {} completed", swap.id);
                TransactionStep::status(
                    BRIDGE_STEP_TYPE,
                    format!("Bridge swap {} completed", swap.id),
                    StepStatus::Success,
                )
                .with_url(url)
            }
            status => {
                warn!("Swap {} ended as {}", swap.id, status);
                TransactionStep::status(
                    BRIDGE_STEP_TYPE,
                    format!("Bridge swap {} {}", swap.id, status),
                    StepStatus::Failed,
                )
                .with_url(url)
                .with_error(format!("Swap {}", status))
            }
        }
    }
}
