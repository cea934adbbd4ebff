//! Bridge orchestrator - intent-driven bridge and DeFi transaction orchestration
//!
//! Turns a structured transaction intent into an ordered list of unsigned
//! on-chain calls. Bridge intents are validated against a remote swap
//! network's live routes, submitted as swaps and optionally tracked until
//! they settle.

pub mod api;
pub mod bridge;
pub mod config;
pub mod error;
pub mod handlers;
pub mod intent;
pub mod log_store;
pub mod metrics;
pub mod registry;
pub mod remote;

pub use error::{EngineError, EngineResult};
