//! Token tables: lending-market addresses and base-unit scaling

use crate::error::{EngineError, EngineResult};

use alloy_primitives::utils::{parse_units, ParseUnits};
use alloy_primitives::U256;
use std::collections::HashMap;

/// An underlying token and its interest-bearing counterpart in one market
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketToken {
    pub symbol: String,
    pub token: String,
    pub interest_token: String,
    pub decimals: u8,
}

/// Lending protocols keyed by lowercase name, each with its token table
#[derive(Debug, Clone, Default)]
pub struct LendingMarkets {
    markets: HashMap<String, HashMap<String, MarketToken>>,
}

impl LendingMarkets {
    pub fn new() -> Self {
        Self::default()
    }

    /// The Nostra market on Starknet mainnet
    pub fn nostra() -> Self {
        let mut markets = Self::new();
        markets.insert(
            "nostra",
            MarketToken {
                symbol: "STRK".to_string(),
                token: "0x04718f5a0fc34cc1af16a1cdee98ffb20c31f5cd61d6ab07201858f4287c938d"
                    .to_string(),
                interest_token:
                    "0x026c5994c2462770bbf940552c5824fb0e0920e2a8a5ce1180042da1b3e489db"
                        .to_string(),
                decimals: 18,
            },
        );
        markets.insert(
            "nostra",
            MarketToken {
                symbol: "ETH".to_string(),
                token: "0x049d36570d4e46f48e99674bd3fcc84644ddd6b96f7c741b1562b82f9e004dc7"
                    .to_string(),
                interest_token:
                    "0x076bb5a142fa1e6b6a44d055b3cd6e31401ebbc76b6873b9f8a3f180f5b4870e"
                        .to_string(),
                decimals: 18,
            },
        );
        markets
    }

    pub fn insert(&mut self, protocol: &str, token: MarketToken) {
        self.markets
            .entry(protocol.to_lowercase())
            .or_default()
            .insert(token.symbol.to_lowercase(), token);
    }

    /// Look up a market token, rejecting unknown protocols and symbols
    pub fn lookup(&self, protocol: &str, symbol: &str) -> EngineResult<&MarketToken> {
        let market = self.markets.get(&protocol.to_lowercase()).ok_or_else(|| {
            EngineError::Validation(format!("Unsupported lending protocol: {}", protocol))
        })?;

        market.get(&symbol.to_lowercase()).ok_or_else(|| {
            EngineError::Validation(format!(
                "Unsupported token for {}: {}",
                protocol, symbol
            ))
        })
    }
}

/// Scale a human decimal amount into integer base units
pub fn to_base_units(amount: &str, decimals: u8) -> EngineResult<U256> {
    let amount = amount.trim();
    match parse_units(amount, decimals) {
        Ok(ParseUnits::U256(value)) if !value.is_zero() => Ok(value),
        Ok(_) => Err(EngineError::Validation(format!(
            "Amount must be a positive number, got {}",
            amount
        ))),
        Err(e) => Err(EngineError::Validation(format!(
            "Invalid amount {}: {}",
            amount, e
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scaling_by_decimals() {
        assert_eq!(
            to_base_units("1", 18).unwrap().to_string(),
            "1000000000000000000"
        );
        assert_eq!(
            to_base_units("0.5", 18).unwrap().to_string(),
            "500000000000000000"
        );
        assert_eq!(to_base_units("2.25", 6).unwrap().to_string(), "2250000");
    }

    #[test]
    fn test_scaling_rejects_bad_amounts() {
        assert!(to_base_units("0", 18).is_err());
        assert!(to_base_units("-1", 18).is_err());
        assert!(to_base_units("abc", 18).is_err());
    }

    #[test]
    fn test_nostra_lookup() {
        let markets = LendingMarkets::nostra();
        let eth = markets.lookup("Nostra", "eth").unwrap();
        assert_eq!(eth.symbol, "ETH");
        assert_eq!(eth.decimals, 18);
        assert!(markets.lookup("nostra", "doge").is_err());
        assert!(markets.lookup("zklend", "eth").is_err());
    }
}
