//! Lending-market deposit and withdraw handlers

use super::ActionHandler;
use crate::error::{EngineError, EngineResult};
use crate::intent::{ExtractedParams, IntentData, TransactionStep};
use crate::registry::{to_base_units, LendingMarkets, MarketToken};

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Resolve the market token and scaled amount named by the parameters
fn resolve<'a>(
    markets: &'a LendingMarkets,
    params: &ExtractedParams,
    action: &str,
) -> EngineResult<(&'a MarketToken, String)> {
    let (Some(amount), Some(symbol), Some(protocol)) =
        (&params.amount, &params.token1, &params.protocol)
    else {
        return Err(EngineError::Validation(format!(
            "Missing required parameters for {}: amount, token1 and protocol are required",
            action
        )));
    };

    let token = markets.lookup(protocol, symbol)?;
    let base_units = to_base_units(amount, token.decimals)?.to_string();
    debug!(
        "{} {} {} on {} ({} base units)",
        action, amount, token.symbol, protocol, base_units
    );

    Ok((token, base_units))
}

/// Approve the interest-bearing token, then deposit into it
pub struct DepositHandler {
    markets: Arc<LendingMarkets>,
}

impl DepositHandler {
    pub fn new(markets: Arc<LendingMarkets>) -> Self {
        Self { markets }
    }
}

#[async_trait]
impl ActionHandler for DepositHandler {
    async fn process_steps(
        &self,
        _data: &IntentData,
        params: &ExtractedParams,
    ) -> EngineResult<Vec<TransactionStep>> {
        let (token, amount) = resolve(&self.markets, params, "deposit")?;

        Ok(vec![
            TransactionStep::call(
                token.token.clone(),
                "approve",
                vec![token.interest_token.clone(), amount.clone(), "0".to_string()],
            ),
            TransactionStep::call(token.interest_token.clone(), "deposit", vec![amount]),
        ])
    }
}

/// Withdraw from the interest-bearing token
pub struct WithdrawHandler {
    markets: Arc<LendingMarkets>,
}

impl WithdrawHandler {
    pub fn new(markets: Arc<LendingMarkets>) -> Self {
        Self { markets }
    }
}

#[async_trait]
impl ActionHandler for WithdrawHandler {
    async fn process_steps(
        &self,
        _data: &IntentData,
        params: &ExtractedParams,
    ) -> EngineResult<Vec<TransactionStep>> {
        let (token, amount) = resolve(&self.markets, params, "withdraw")?;

        Ok(vec![TransactionStep::call(
            token.interest_token.clone(),
            "withdraw",
            vec![amount],
        )])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ETH: &str = "0x049d36570d4e46f48e99674bd3fcc84644ddd6b96f7c741b1562b82f9e004dc7";
    const IETH: &str = "0x076bb5a142fa1e6b6a44d055b3cd6e31401ebbc76b6873b9f8a3f180f5b4870e";

    fn params(amount: &str, token: &str, protocol: &str) -> ExtractedParams {
        ExtractedParams {
            amount: Some(amount.into()),
            token1: Some(token.into()),
            protocol: Some(protocol.into()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_deposit_approves_then_deposits() {
        let handler = DepositHandler::new(Arc::new(LendingMarkets::nostra()));
        let steps = handler
            .process_steps(&IntentData::default(), &params("1.5", "eth", "Nostra"))
            .await
            .unwrap();

        assert_eq!(steps.len(), 2);
        let approve = steps[0].as_call().unwrap();
        assert_eq!(approve.contract_address, ETH);
        assert_eq!(approve.entrypoint, "approve");
        assert_eq!(approve.calldata, vec![IETH, "1500000000000000000", "0"]);

        let deposit = steps[1].as_call().unwrap();
        assert_eq!(deposit.contract_address, IETH);
        assert_eq!(deposit.calldata, vec!["1500000000000000000"]);
    }

    #[tokio::test]
    async fn test_withdraw_is_single_step() {
        let handler = WithdrawHandler::new(Arc::new(LendingMarkets::nostra()));
        let steps = handler
            .process_steps(&IntentData::default(), &params("2", "ETH", "nostra"))
            .await
            .unwrap();

        assert_eq!(steps.len(), 1);
        let withdraw = steps[0].as_call().unwrap();
        assert_eq!(withdraw.contract_address, IETH);
        assert_eq!(withdraw.entrypoint, "withdraw");
        assert_eq!(withdraw.calldata, vec!["2000000000000000000"]);
    }

    #[tokio::test]
    async fn test_missing_or_unknown_parameters() {
        let handler = DepositHandler::new(Arc::new(LendingMarkets::nostra()));

        let mut missing = params("1", "ETH", "nostra");
        missing.protocol = None;
        let err = handler
            .process_steps(&IntentData::default(), &missing)
            .await
            .unwrap_err();
        assert!(err.is_validation());

        for bad in [params("1", "ETH", "zklend"), params("1", "DOGE", "nostra"), params("abc", "ETH", "nostra")] {
            let err = handler
                .process_steps(&IntentData::default(), &bad)
                .await
                .unwrap_err();
            assert!(err.is_validation());
        }
    }
}
