//! Configuration management for the bridge orchestrator
//!
//! Loads configuration from TOML files with environment variable substitution.

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub bridge: BridgeConfig,
    #[serde(default)]
    pub monitor: MonitorConfig,
    pub api: ApiConfig,
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BridgeConfig {
    pub api_key: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_tracking_url")]
    pub tracking_url: String,
    #[serde(default = "default_min_request_interval_ms")]
    pub min_request_interval_ms: u64,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Zero keeps fetched routes for the lifetime of the validator
    #[serde(default = "default_route_cache_ttl_secs")]
    pub route_cache_ttl_secs: u64,
    #[serde(default)]
    pub mode: BridgeMode,
    #[serde(default = "default_true")]
    pub use_deposit_address: bool,
    #[serde(default = "default_source_network")]
    pub default_source_network: String,
    #[serde(default = "default_destination_network")]
    pub default_destination_network: String,
    #[serde(default)]
    pub limits: AmountLimits,
    /// Network id -> address regex, overriding the generic hex format
    #[serde(default)]
    pub address_formats: HashMap<String, String>,
}

/// What the bridge handler returns once the swap exists
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BridgeMode {
    /// Map the swap's deposit actions into executable steps
    #[default]
    DepositCalls,
    /// Poll the swap until it settles and report the outcome
    Track,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AmountLimits {
    #[serde(default = "default_min_amount")]
    pub min_amount: Decimal,
    #[serde(default = "default_max_amount")]
    pub max_amount: Decimal,
    #[serde(default = "default_token_minimums")]
    pub token_minimums: HashMap<String, Decimal>,
}

impl Default for AmountLimits {
    fn default() -> Self {
        Self {
            min_amount: default_min_amount(),
            max_amount: default_max_amount(),
            token_minimums: default_token_minimums(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MonitorConfig {
    #[serde(default = "default_monitor_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_monitor_min_delay_ms")]
    pub min_delay_ms: u64,
    #[serde(default = "default_monitor_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_monitor_attempts(),
            min_delay_ms: default_monitor_min_delay_ms(),
            max_delay_ms: default_monitor_max_delay_ms(),
        }
    }
}

impl MonitorConfig {
    /// Longest total time spent sleeping between polls
    pub fn sleep_budget(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms) * self.max_attempts.saturating_sub(1)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
    /// Upper bound on one `POST /transactions` request, monitoring included
    #[serde(default = "default_request_deadline_secs")]
    pub request_deadline_secs: u64,
}

impl ApiConfig {
    pub fn request_deadline(&self) -> Duration {
        Duration::from_secs(self.request_deadline_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub port: u16,
}

fn default_base_url() -> String {
    "https://api.layerswap.io/api/v2".to_string()
}

fn default_tracking_url() -> String {
    "https://layerswap.io/track".to_string()
}

fn default_min_request_interval_ms() -> u64 {
    1000
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    2000
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_route_cache_ttl_secs() -> u64 {
    600
}

fn default_true() -> bool {
    true
}

fn default_source_network() -> String {
    "starknet".to_string()
}

fn default_destination_network() -> String {
    "base".to_string()
}

fn default_min_amount() -> Decimal {
    Decimal::new(1, 2)
}

fn default_max_amount() -> Decimal {
    Decimal::new(1000, 0)
}

fn default_token_minimums() -> HashMap<String, Decimal> {
    HashMap::from([
        ("ETH".to_string(), Decimal::new(1, 3)),
        ("USDC".to_string(), Decimal::ONE),
        ("USDT".to_string(), Decimal::ONE),
    ])
}

fn default_request_deadline_secs() -> u64 {
    300
}

fn default_monitor_attempts() -> u32 {
    30
}

fn default_monitor_min_delay_ms() -> u64 {
    3000
}

fn default_monitor_max_delay_ms() -> u64 {
    10000
}

impl BridgeConfig {
    /// Bridge config with defaults for everything but the API key
    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: default_base_url(),
            tracking_url: default_tracking_url(),
            min_request_interval_ms: default_min_request_interval_ms(),
            max_attempts: default_max_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
            request_timeout_secs: default_request_timeout_secs(),
            route_cache_ttl_secs: default_route_cache_ttl_secs(),
            mode: BridgeMode::default(),
            use_deposit_address: true,
            default_source_network: default_source_network(),
            default_destination_network: default_destination_network(),
            limits: AmountLimits::default(),
            address_formats: HashMap::new(),
        }
    }

    pub fn min_request_interval(&self) -> Duration {
        Duration::from_millis(self.min_request_interval_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// `None` means routes never expire
    pub fn route_cache_ttl(&self) -> Option<Duration> {
        match self.route_cache_ttl_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

impl Settings {
    /// Load settings from configuration files
    pub fn load() -> Result<Self> {
        let config_path = env::var("BRIDGE_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config/default.toml"));

        Self::load_from(&config_path)
    }

    /// Load settings from an explicit path
    pub fn load_from(config_path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {:?}", config_path))?;

        // Substitute environment variables
        let config_str = substitute_env_vars(&config_str);

        let settings: Settings =
            toml::from_str(&config_str).with_context(|| "Failed to parse configuration")?;

        settings.validate()?;

        Ok(settings)
    }

    /// Deadline for one API request.
    ///
    /// In track mode the request also waits for the monitor, so the deadline
    /// never falls below its sleep budget plus a few request timeouts of
    /// headroom for swap creation and the polls themselves.
    pub fn request_deadline(&self) -> Duration {
        let configured = self.api.request_deadline();
        if self.bridge.mode != BridgeMode::Track {
            return configured;
        }

        let floor = self.monitor.sleep_budget() + self.bridge.request_timeout() * TRACK_HEADROOM_TIMEOUTS;
        if configured < floor {
            tracing::warn!(
                "api.request_deadline_secs {} is shorter than the track-mode monitor window, using {}s",
                self.api.request_deadline_secs,
                floor.as_secs()
            );
            return floor;
        }
        configured
    }

    /// Validate configuration
    fn validate(&self) -> Result<()> {
        if self.bridge.api_key.trim().is_empty() {
            anyhow::bail!("bridge.api_key must be set (check LAYERSWAP_API_KEY)");
        }

        let limits = &self.bridge.limits;
        if limits.min_amount > limits.max_amount {
            anyhow::bail!(
                "bridge.limits.min_amount {} exceeds max_amount {}",
                limits.min_amount,
                limits.max_amount
            );
        }

        if self.monitor.min_delay_ms > self.monitor.max_delay_ms {
            anyhow::bail!("monitor.min_delay_ms exceeds monitor.max_delay_ms");
        }

        for (network, pattern) in &self.bridge.address_formats {
            regex::Regex::new(pattern).with_context(|| {
                format!("Invalid address format for network {}: {}", network, pattern)
            })?;
        }

        if self.bridge.max_attempts == 0 {
            tracing::warn!("bridge.max_attempts is 0 - requests will be attempted once");
        }

        Ok(())
    }
}

/// Request timeouts of slack added to the monitor window in track mode
const TRACK_HEADROOM_TIMEOUTS: u32 = 4;

/// Substitute environment variables in the format ${VAR_NAME}
fn substitute_env_vars(input: &str) -> String {
    lazy_static::lazy_static! {
        static ref ENV_VAR: regex::Regex =
            regex::Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").expect("static pattern");
    }

    let mut result = input.to_string();
    for cap in ENV_VAR.captures_iter(input) {
        let var_name = &cap[1];
        let var_value = env::var(var_name).unwrap_or_default();
        result = result.replace(&cap[0], &var_value);
    }

    result
}
