//! Dispatch of intents to action handlers

use super::{ActionHandler, BridgeHandler, DepositHandler, SwapHandler, TransferHandler, WithdrawHandler};
use crate::bridge::{BridgeValidator, SwapMonitor};
use crate::config::Settings;
use crate::error::{EngineError, EngineResult};
use crate::intent::{ActionKind, ProcessedTransaction, TransactionIntent};
use crate::registry::LendingMarkets;
use crate::remote::SwapApi;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Maps action kinds to handlers and assembles processed transactions
#[derive(Default)]
pub struct TransactionProcessor {
    handlers: HashMap<ActionKind, Arc<dyn ActionHandler>>,
}

impl TransactionProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Processor with every action kind wired to its standard handler
    pub fn standard(
        settings: &Settings,
        api: Arc<dyn SwapApi>,
        validator: Arc<BridgeValidator>,
        cancel: CancellationToken,
    ) -> Self {
        let markets = Arc::new(LendingMarkets::nostra());
        let monitor = SwapMonitor::new(api.clone(), &settings.monitor, &settings.bridge.tracking_url);
        let bridge = BridgeHandler::new(api, validator, monitor, &settings.bridge, cancel);

        Self::new()
            .with_handler(ActionKind::Swap, Arc::new(SwapHandler))
            .with_handler(ActionKind::Transfer, Arc::new(TransferHandler))
            .with_handler(ActionKind::Deposit, Arc::new(DepositHandler::new(markets.clone())))
            .with_handler(ActionKind::Withdraw, Arc::new(WithdrawHandler::new(markets)))
            .with_handler(ActionKind::Bridge, Arc::new(bridge))
    }

    pub fn with_handler(mut self, kind: ActionKind, handler: Arc<dyn ActionHandler>) -> Self {
        self.register(kind, handler);
        self
    }

    pub fn register(&mut self, kind: ActionKind, handler: Arc<dyn ActionHandler>) {
        if self.handlers.insert(kind, handler).is_some() {
            warn!("Replaced handler for {}", kind);
        }
    }

    pub fn supports(&self, kind: ActionKind) -> bool {
        self.handlers.contains_key(&kind)
    }

    /// Run the intent's handler and wrap its steps.
    ///
    /// Handler errors propagate unchanged.
    pub async fn process(&self, intent: &TransactionIntent) -> EngineResult<ProcessedTransaction> {
        let kind = intent.action_kind()?;
        let handler = self
            .handlers
            .get(&kind)
            .ok_or_else(|| EngineError::UnsupportedAction(intent.action.clone()))?;

        info!("Processing {} intent from solver {}", kind, intent.solver);
        let start = Instant::now();

        let result = handler
            .process_steps(&intent.data, &intent.extracted_params)
            .await;

        crate::metrics::record_intent_processed(kind.as_str(), result.is_ok());
        crate::metrics::record_intent_latency(kind.as_str(), start.elapsed().as_secs_f64());

        let transactions = result?;
        debug!("{} intent produced {} steps", kind, transactions.len());

        let data = &intent.data;
        Ok(ProcessedTransaction {
            success: true,
            description: data
                .description
                .clone()
                .unwrap_or_else(|| format!("{} transaction", kind)),
            transactions,
            action: kind.as_str().to_string(),
            solver: intent.solver.clone(),
            from_token: data.from_token.clone(),
            to_token: data.to_token.clone(),
            from_amount: data.from_amount.clone(),
            to_amount: data.to_amount.clone(),
            receiver: data.receiver.clone(),
            estimated_gas: "0".to_string(),
            protocol: intent
                .extracted_params
                .protocol
                .clone()
                .or_else(|| data.protocol.clone()),
            bridge: data.bridge.clone(),
        })
    }

    /// `process` bounded by a deadline; the handler is dropped when it expires
    pub async fn process_with_deadline(
        &self,
        intent: &TransactionIntent,
        deadline: Duration,
    ) -> EngineResult<ProcessedTransaction> {
        tokio::time::timeout(deadline, self.process(intent))
            .await
            .map_err(|_| EngineError::Timeout {
                operation: format!("{} intent", intent.action),
            })?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ApiConfig, BridgeConfig, MetricsConfig, MonitorConfig};
    use crate::handlers::MockActionHandler;
    use crate::intent::{parse_intent, ExtractedParams, IntentData, TransactionStep};
    use crate::remote::{MockSwapApi, Route, SwapRecord, SwapStatus};
    use async_trait::async_trait;
    use serde_json::json;

    fn settings() -> Settings {
        Settings {
            bridge: BridgeConfig::with_api_key("k"),
            monitor: MonitorConfig::default(),
            api: ApiConfig {
                host: "127.0.0.1".into(),
                port: 0,
                request_deadline_secs: 300,
            },
            metrics: MetricsConfig {
                enabled: false,
                port: 0,
            },
        }
    }

    fn standard(api: MockSwapApi) -> TransactionProcessor {
        let settings = settings();
        let api: Arc<dyn SwapApi> = Arc::new(api);
        let validator = Arc::new(BridgeValidator::new(api.clone(), &settings.bridge).unwrap());
        TransactionProcessor::standard(&settings, api, validator, CancellationToken::new())
    }

    fn bridge_intent(amount: &str) -> TransactionIntent {
        parse_intent(
            &json!({
                "action": "bridge",
                "extractedParams": {
                    "chain": "starknet",
                    "dest_chain": "base",
                    "token1": "ETH",
                    "token2": "ETH",
                    "amount": amount,
                    "address": "0xabcdefabcdefabcdefabcdefabcdefabcdefabcd"
                },
                "data": {"steps": []}
            })
            .to_string(),
        )
        .unwrap()
    }

    fn starknet_base_route() -> Vec<Route> {
        vec![Route {
            source_network: "starknet_mainnet".into(),
            destination_network: "base_mainnet".into(),
            source_tokens: vec!["ETH".into()],
            destination_tokens: vec!["ETH".into()],
        }]
    }

    #[tokio::test]
    async fn test_bridge_end_to_end() {
        let mut api = MockSwapApi::new();
        api.expect_get_available_routes()
            .times(1)
            .returning(|| Ok(starknet_base_route()));
        api.expect_create_swap()
            .times(1)
            .returning(|_| Ok(SwapRecord::new("swap-1", SwapStatus::Pending)));

        let processed = standard(api).process(&bridge_intent("0.1")).await.unwrap();

        assert!(processed.success);
        assert_eq!(processed.action, "bridge");
        assert_eq!(processed.estimated_gas, "0");
        assert_eq!(processed.description, "bridge transaction");
        assert!(processed.transactions.iter().any(|step| {
            serde_json::to_string(step).unwrap().contains("swap-1")
        }));
    }

    #[tokio::test]
    async fn test_bridge_above_maximum_never_creates_swap() {
        let mut api = MockSwapApi::new();
        api.expect_get_available_routes()
            .returning(|| Ok(starknet_base_route()));
        api.expect_create_swap().times(0);

        let err = standard(api).process(&bridge_intent("2000")).await.unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[tokio::test]
    async fn test_dispatches_by_action_and_fills_metadata() {
        let mut swap = MockActionHandler::new();
        swap.expect_process_steps()
            .times(1)
            .returning(|_, _| Ok(vec![TransactionStep::call("0x1", "swap", vec![])]));
        let mut transfer = MockActionHandler::new();
        transfer.expect_process_steps().times(0);

        let processor = TransactionProcessor::new()
            .with_handler(ActionKind::Swap, Arc::new(swap))
            .with_handler(ActionKind::Transfer, Arc::new(transfer));

        let intent: TransactionIntent = serde_json::from_value(json!({
            "solver": "brian",
            "action": "swap",
            "extractedParams": {"protocol": "avnu"},
            "data": {
                "description": "Swap 1 ETH for USDC",
                "steps": [],
                "fromToken": {"address": "0xeth", "symbol": "ETH", "decimals": 18},
                "fromAmount": "1000000000000000000",
                "receiver": "0xme"
            }
        }))
        .unwrap();

        let processed = processor.process(&intent).await.unwrap();
        assert_eq!(processed.description, "Swap 1 ETH for USDC");
        assert_eq!(processed.transactions.len(), 1);
        assert_eq!(processed.protocol.as_deref(), Some("avnu"));
        assert_eq!(processed.from_token.unwrap().symbol, "ETH");
        assert_eq!(processed.receiver.as_deref(), Some("0xme"));
    }

    #[tokio::test]
    async fn test_unsupported_actions() {
        let processor = TransactionProcessor::new();

        let intent = TransactionIntent::new(
            ActionKind::Bridge,
            ExtractedParams::default(),
            IntentData::default(),
        );
        let err = processor.process(&intent).await.unwrap_err();
        assert!(matches!(err, EngineError::UnsupportedAction(ref a) if a == "bridge"));

        let mut stake = intent.clone();
        stake.action = "stake".into();
        let err = processor.process(&stake).await.unwrap_err();
        assert!(matches!(err, EngineError::UnsupportedAction(ref a) if a == "stake"));
    }

    #[tokio::test]
    async fn test_handler_errors_propagate() {
        let mut handler = MockActionHandler::new();
        handler
            .expect_process_steps()
            .returning(|_, _| Err(EngineError::Validation("missing amount".into())));
        let processor =
            TransactionProcessor::new().with_handler(ActionKind::Deposit, Arc::new(handler));

        let intent = TransactionIntent::new(
            ActionKind::Deposit,
            ExtractedParams::default(),
            IntentData::default(),
        );
        let err = processor.process(&intent).await.unwrap_err();
        assert!(err.is_validation());
    }

    struct StalledHandler;

    #[async_trait]
    impl ActionHandler for StalledHandler {
        async fn process_steps(
            &self,
            _data: &IntentData,
            _params: &ExtractedParams,
        ) -> EngineResult<Vec<TransactionStep>> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(Vec::new())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_bounds_processing() {
        let processor =
            TransactionProcessor::new().with_handler(ActionKind::Bridge, Arc::new(StalledHandler));
        let intent = TransactionIntent::new(
            ActionKind::Bridge,
            ExtractedParams::default(),
            IntentData::default(),
        );

        let err = processor
            .process_with_deadline(&intent, Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Timeout { .. }));
    }

    #[test]
    fn test_standard_registers_every_action() {
        let processor = standard(MockSwapApi::new());
        for kind in ActionKind::ALL {
            assert!(processor.supports(kind), "{}", kind);
        }
    }
}
