//! Network name normalisation and per-network address formats

use crate::error::{EngineError, EngineResult};

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;

lazy_static! {
    /// Human network names accepted from intents, keyed lowercase
    static ref NETWORK_ALIASES: HashMap<&'static str, &'static str> = HashMap::from([
        ("starknet", "starknet_mainnet"),
        ("ethereum", "ethereum_mainnet"),
        ("eth", "ethereum_mainnet"),
        ("mainnet", "ethereum_mainnet"),
        ("base", "base_mainnet"),
        ("arbitrum", "arbitrum_mainnet"),
        ("arb", "arbitrum_mainnet"),
        ("optimism", "optimism_mainnet"),
        ("op", "optimism_mainnet"),
        ("polygon", "polygon_mainnet"),
        ("matic", "polygon_mainnet"),
        ("zkera", "zkera_mainnet"),
        ("linea", "linea_mainnet"),
        ("scroll", "scroll_mainnet"),
        ("zksync", "zksync_mainnet"),
    ]);

    /// 0x-prefixed hex covering 20-byte EVM and up-to-32-byte Starknet addresses
    static ref DEFAULT_ADDRESS_FORMAT: Regex =
        Regex::new(r"^0x[a-fA-F0-9]{40,64}$").expect("static pattern");
}

/// Suffixes that already mark a canonical network id
const CANONICAL_SUFFIXES: &[&str] = &["_mainnet", "_sepolia", "_goerli", "_testnet"];

/// Map a human network name to the remote network's canonical id.
///
/// Unknown names are not rejected: they pass through with a `_mainnet`
/// suffix, and ids that already carry a network suffix are returned as-is,
/// which keeps the mapping idempotent.
pub fn resolve_network(name: &str) -> String {
    let normalized = name.trim().to_lowercase();

    if let Some(canonical) = NETWORK_ALIASES.get(normalized.as_str()) {
        return (*canonical).to_string();
    }

    if CANONICAL_SUFFIXES
        .iter()
        .any(|suffix| normalized.ends_with(suffix))
    {
        return normalized;
    }

    format!("{}_mainnet", normalized)
}

/// Address format rules, optionally specialised per network id
#[derive(Debug, Clone, Default)]
pub struct AddressFormats {
    overrides: HashMap<String, Regex>,
}

impl AddressFormats {
    /// Compile network-specific patterns from configuration
    pub fn from_patterns(patterns: &HashMap<String, String>) -> EngineResult<Self> {
        let mut overrides = HashMap::new();
        for (network, pattern) in patterns {
            let regex = Regex::new(pattern).map_err(|e| {
                EngineError::Config(format!(
                    "Invalid address format for {}: {}",
                    network, e
                ))
            })?;
            overrides.insert(resolve_network(network), regex);
        }
        Ok(Self { overrides })
    }

    /// Pattern applied to addresses on `network`
    pub fn pattern_for(&self, network: &str) -> &Regex {
        self.overrides
            .get(network)
            .unwrap_or(&DEFAULT_ADDRESS_FORMAT)
    }

    pub fn is_valid(&self, network: &str, address: &str) -> bool {
        self.pattern_for(network).is_match(address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_is_case_insensitive() {
        assert_eq!(resolve_network("Starknet"), "starknet_mainnet");
        assert_eq!(resolve_network("starknet"), "starknet_mainnet");
        assert_eq!(resolve_network("  BASE "), "base_mainnet");
    }

    #[test]
    fn test_resolve_is_idempotent() {
        for name in ["starknet", "Arbitrum", "unknownchain", "ethereum_sepolia"] {
            let once = resolve_network(name);
            assert_eq!(resolve_network(&once), once);
        }
    }

    #[test]
    fn test_unknown_names_pass_through() {
        assert_eq!(resolve_network("Blast"), "blast_mainnet");
        assert_eq!(resolve_network("ZkSync"), "zksync_mainnet");
    }

    #[test]
    fn test_default_address_format() {
        let formats = AddressFormats::default();
        let evm = format!("0x{}", "a".repeat(40));
        let stark = format!("0x{}", "B".repeat(64));

        assert!(formats.is_valid("base_mainnet", &evm));
        assert!(formats.is_valid("starknet_mainnet", &stark));
        assert!(!formats.is_valid("base_mainnet", "not-an-address"));
        assert!(!formats.is_valid("base_mainnet", &format!("0x{}", "a".repeat(39))));
        assert!(!formats.is_valid("base_mainnet", &format!("0x{}", "a".repeat(65))));
    }

    #[test]
    fn test_network_specific_override() {
        let patterns = HashMap::from([("base".to_string(), "^0x[a-fA-F0-9]{40}$".to_string())]);
        let formats = AddressFormats::from_patterns(&patterns).unwrap();
        let stark = format!("0x{}", "1".repeat(64));

        assert!(!formats.is_valid("base_mainnet", &stark));
        assert!(formats.is_valid("starknet_mainnet", &stark));
    }
}
