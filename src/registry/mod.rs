//! Network and token registry
//!
//! Static knowledge the orchestration core needs before it talks to the
//! remote swap network:
//! - Human network names to canonical network ids
//! - Address formats per network
//! - Lending-market token tables and base-unit scaling

pub mod networks;
pub mod tokens;

pub use networks::{resolve_network, AddressFormats};
pub use tokens::{to_base_units, LendingMarkets, MarketToken};
