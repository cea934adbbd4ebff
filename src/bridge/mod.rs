//! Bridge validation and swap lifecycle tracking
//!
//! - `BridgeValidator` checks networks, tokens, addresses and amounts
//! - `RouteCache` keeps live route data per validator
//! - `SwapMonitor` polls a created swap until it settles

pub mod monitor;
pub mod route_cache;
pub mod validator;

pub use monitor::{SwapMonitor, BRIDGE_STEP_TYPE};
pub use route_cache::RouteCache;
pub use validator::{token_intersection, BridgeValidator};
