//! Bridge request validation against local rules and live routes

use super::route_cache::RouteCache;
use crate::config::{AmountLimits, BridgeConfig};
use crate::error::{EngineError, EngineResult};
use crate::registry::{resolve_network, AddressFormats};
use crate::remote::{Route, SwapApi};

use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

/// Validates networks, token pairs, addresses and amounts for bridging.
///
/// Route data comes from the swap network and is cached per validator.
pub struct BridgeValidator {
    api: Arc<dyn SwapApi>,
    routes: RouteCache,
    limits: AmountLimits,
    address_formats: AddressFormats,
}

impl BridgeValidator {
    pub fn new(api: Arc<dyn SwapApi>, config: &BridgeConfig) -> EngineResult<Self> {
        Ok(Self {
            api,
            routes: RouteCache::new(config.route_cache_ttl()),
            limits: config.limits.clone(),
            address_formats: AddressFormats::from_patterns(&config.address_formats)?,
        })
    }

    pub fn format_network(&self, name: &str) -> String {
        resolve_network(name)
    }

    pub async fn routes(&self) -> EngineResult<Arc<Vec<Route>>> {
        self.routes.get_or_fetch(self.api.as_ref()).await
    }

    /// Drop cached routes so the next lookup refetches them
    pub async fn refresh_routes(&self) {
        debug!("Dropping cached bridge routes");
        self.routes.invalidate().await;
    }

    /// Fail when a resolved network id appears on no live route
    fn ensure_listed(routes: &[Route], network: &str) -> EngineResult<()> {
        let listed = routes
            .iter()
            .any(|r| r.source_network == network || r.destination_network == network);
        if listed {
            Ok(())
        } else {
            Err(EngineError::Validation(format!(
                "Unsupported network: {}",
                network
            )))
        }
    }

    /// Tokens tradable on both sides of the route between two networks
    pub async fn available_tokens(
        &self,
        source_network: &str,
        destination_network: &str,
    ) -> EngineResult<Vec<String>> {
        let source = self.format_network(source_network);
        let destination = self.format_network(destination_network);
        let routes = self.routes().await?;

        Self::ensure_listed(&routes, &source)?;
        Self::ensure_listed(&routes, &destination)?;

        if !routes.iter().any(|r| r.connects(&source, &destination)) {
            return Err(EngineError::RouteNotFound(format!(
                "No bridge route from {} to {}",
                source, destination
            )));
        }

        Ok(token_intersection(&routes, &source, &destination))
    }

    /// Check both tokens are tradable on the route; returns them uppercased
    pub async fn validate_token_pair(
        &self,
        source_network: &str,
        destination_network: &str,
        source_token: &str,
        destination_token: &str,
    ) -> EngineResult<(String, String)> {
        let source_token = source_token.trim().to_uppercase();
        let destination_token = destination_token.trim().to_uppercase();
        if source_token.is_empty() || destination_token.is_empty() {
            return Err(EngineError::Validation(
                "Both source and destination tokens are required".to_string(),
            ));
        }

        let available = self
            .available_tokens(source_network, destination_network)
            .await?;

        for token in [&source_token, &destination_token] {
            if !available.contains(token) {
                return Err(EngineError::Validation(format!(
                    "Token {} is not available from {} to {} (available: {})",
                    token,
                    source_network,
                    destination_network,
                    available.join(", ")
                )));
            }
        }

        debug!(
            "Token pair {}/{} valid for {} -> {}",
            source_token, destination_token, source_network, destination_network
        );
        Ok((source_token, destination_token))
    }

    pub fn validate_addresses(
        &self,
        source_network: &str,
        source_address: &str,
        destination_network: &str,
        destination_address: &str,
    ) -> EngineResult<()> {
        let checks = [
            ("Source", source_network, source_address),
            ("Destination", destination_network, destination_address),
        ];

        for (side, network, address) in checks {
            let address = address.trim();
            if address.is_empty() {
                return Err(EngineError::Validation(format!("{} address is required", side)));
            }
            let network = self.format_network(network);
            if !self.address_formats.is_valid(&network, address) {
                return Err(EngineError::Validation(format!(
                    "{} address {} is not a valid {} address",
                    side, address, network
                )));
            }
        }

        Ok(())
    }

    /// Parse and bound-check an amount.
    ///
    /// A configured per-token minimum replaces the global minimum for that
    /// token; the global maximum always applies.
    pub fn validate_amount(&self, amount: &str, token: &str) -> EngineResult<Decimal> {
        let value = Decimal::from_str(amount.trim()).map_err(|_| {
            EngineError::Validation(format!("Amount {:?} is not a valid number", amount))
        })?;

        if value <= Decimal::ZERO {
            return Err(EngineError::Validation(format!(
                "Amount must be greater than zero, got {}",
                value
            )));
        }

        let token = token.trim().to_uppercase();
        match self.limits.token_minimums.get(&token) {
            Some(minimum) if value < *minimum => {
                return Err(EngineError::Validation(format!(
                    "Amount {} is below the minimum of {} {}",
                    value, minimum, token
                )))
            }
            Some(_) => {}
            None if value < self.limits.min_amount => {
                return Err(EngineError::Validation(format!(
                    "Amount {} is below the minimum bridge amount of {}",
                    value, self.limits.min_amount
                )))
            }
            None => {}
        }

        if value > self.limits.max_amount {
            return Err(EngineError::Validation(format!(
                "Amount {} exceeds the maximum bridge amount of {}",
                value, self.limits.max_amount
            )));
        }

        Ok(value)
    }
}

/// Exact intersection of a route's token lists; empty when no route matches
pub fn token_intersection(
    routes: &[Route],
    source_network: &str,
    destination_network: &str,
) -> Vec<String> {
    routes
        .iter()
        .find(|r| r.connects(source_network, destination_network))
        .map(Route::common_tokens)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::MockSwapApi;

    fn routes() -> Vec<Route> {
        vec![
            Route {
                source_network: "starknet_mainnet".into(),
                destination_network: "base_mainnet".into(),
                source_tokens: vec!["ETH".into(), "USDC".into(), "STRK".into()],
                destination_tokens: vec!["ETH".into(), "USDC".into()],
            },
            Route {
                source_network: "ethereum_mainnet".into(),
                destination_network: "starknet_mainnet".into(),
                source_tokens: vec!["ETH".into()],
                destination_tokens: vec!["ETH".into()],
            },
        ]
    }

    fn validator() -> BridgeValidator {
        let mut api = MockSwapApi::new();
        api.expect_get_available_routes()
            .times(0..=1)
            .returning(|| Ok(routes()));
        BridgeValidator::new(Arc::new(api), &BridgeConfig::with_api_key("k")).unwrap()
    }

    #[test]
    fn test_format_network() {
        let validator = validator();
        assert_eq!(validator.format_network("Starknet"), "starknet_mainnet");
        assert_eq!(
            validator.format_network(&validator.format_network("starknet")),
            "starknet_mainnet"
        );
    }

    #[tokio::test]
    async fn test_available_tokens_is_intersection() {
        let tokens = validator()
            .available_tokens("starknet", "base")
            .await
            .unwrap();
        assert_eq!(tokens, vec!["ETH", "USDC"]);
    }

    #[tokio::test]
    async fn test_missing_route_and_unlisted_network() {
        let validator = validator();

        let err = validator.available_tokens("base", "ethereum").await.unwrap_err();
        assert!(matches!(err, EngineError::RouteNotFound(_)));

        let err = validator.available_tokens("starknet", "fantom").await.unwrap_err();
        assert!(matches!(err, EngineError::Validation(ref m) if m.contains("fantom_mainnet")));
    }

    #[test]
    fn test_token_intersection_is_empty_without_route() {
        assert!(token_intersection(&routes(), "base_mainnet", "ethereum_mainnet").is_empty());
        assert_eq!(
            token_intersection(&routes(), "ethereum_mainnet", "starknet_mainnet"),
            vec!["ETH"]
        );
    }

    #[tokio::test]
    async fn test_token_pair_is_case_insensitive() {
        let validator = validator();
        let pair = validator
            .validate_token_pair("starknet", "base", "eth", "Usdc")
            .await
            .unwrap();
        assert_eq!(pair, ("ETH".to_string(), "USDC".to_string()));

        let err = validator
            .validate_token_pair("starknet", "base", "STRK", "ETH")
            .await
            .unwrap_err();
        assert!(err.is_validation());

        let err = validator
            .validate_token_pair("starknet", "base", "", "ETH")
            .await
            .unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_address_formats() {
        let validator = validator();
        let evm = format!("0x{}", "a".repeat(40));
        let stark = format!("0x{}", "0F".repeat(32));

        assert!(validator
            .validate_addresses("starknet", &stark, "base", &evm)
            .is_ok());
        assert!(validator
            .validate_addresses("starknet", "", "base", &evm)
            .is_err());
        assert!(validator
            .validate_addresses("starknet", &stark, "base", "not-an-address")
            .is_err());
        assert!(validator
            .validate_addresses("starknet", &format!("0x{}", "a".repeat(39)), "base", &evm)
            .is_err());
    }

    #[test]
    fn test_network_specific_address_format() {
        let mut config = BridgeConfig::with_api_key("k");
        config
            .address_formats
            .insert("solana".into(), "^[1-9A-HJ-NP-Za-km-z]{32,44}$".into());
        let validator = BridgeValidator::new(Arc::new(MockSwapApi::new()), &config).unwrap();

        let evm = format!("0x{}", "a".repeat(40));
        assert!(validator
            .validate_addresses("base", &evm, "solana", "9xQeWvG816bUx9EPjHmaT23yvVM2ZWbrrpZb9PusVFin")
            .is_ok());
        assert!(validator
            .validate_addresses("base", &evm, "solana", &evm)
            .is_err());
    }

    #[test]
    fn test_non_positive_and_non_numeric_amounts_fail() {
        let validator = validator();
        for token in ["ETH", "USDC", "DOGE"] {
            for amount in ["0", "-1", "-0.5", "abc", "", "NaN", "inf"] {
                assert!(
                    validator.validate_amount(amount, token).is_err(),
                    "{} {}",
                    amount,
                    token
                );
            }
        }
    }

    #[test]
    fn test_token_minimums_are_exact_bounds() {
        let validator = validator();
        assert!(validator.validate_amount("0.001", "ETH").is_ok());
        assert!(validator.validate_amount("0.000999", "eth").is_err());
        assert!(validator.validate_amount("1", "USDC").is_ok());
        assert!(validator.validate_amount("0.99", "USDC").is_err());
        assert!(validator.validate_amount("1", "USDT").is_ok());
        assert!(validator.validate_amount("0.999999", "USDT").is_err());
    }

    #[test]
    fn test_global_bounds() {
        let validator = validator();
        assert!(validator.validate_amount("0.01", "STRK").is_ok());
        assert!(validator.validate_amount("0.009", "STRK").is_err());
        assert_eq!(
            validator.validate_amount(" 1000 ", "ETH").unwrap(),
            Decimal::new(1000, 0)
        );
        let err = validator.validate_amount("2000", "ETH").unwrap_err();
        assert!(err.to_string().contains("maximum"));
    }
}
