//! Configuration types for riskgate

use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub capital: CapitalConfig,
    #[serde(default)]
    pub risk: RiskConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Orchestrator configuration
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Instrument traded by this orchestrator instance
    #[serde(default = "default_instrument")]
    pub instrument: String,

    /// Default stop-loss distance as a fraction of entry price
    #[serde(default = "default_stop_loss_ratio")]
    pub default_stop_loss_ratio: Decimal,

    /// Default take-profit distance as a fraction of entry price
    #[serde(default = "default_take_profit_ratio")]
    pub default_take_profit_ratio: Decimal,

    /// Seconds between status summary log lines on tick
    #[serde(default = "default_status_interval")]
    pub status_log_interval_secs: u64,
}

fn default_instrument() -> String {
    "BTCUSDT".to_string()
}
fn default_stop_loss_ratio() -> Decimal {
    Decimal::new(5, 2) // 0.05 = 5%
}
fn default_take_profit_ratio() -> Decimal {
    Decimal::new(10, 2) // 0.10 = 10%
}
fn default_status_interval() -> u64 {
    60
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            instrument: default_instrument(),
            default_stop_loss_ratio: default_stop_loss_ratio(),
            default_take_profit_ratio: default_take_profit_ratio(),
            status_log_interval_secs: default_status_interval(),
        }
    }
}

/// Capital allocation configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CapitalConfig {
    /// Fraction of total balance the engine may allocate
    #[serde(default = "default_capital_ratio")]
    pub capital_ratio: Decimal,

    /// Maximum loss per position as a fraction of allocated capital
    #[serde(default = "default_max_loss_ratio")]
    pub max_loss_ratio: Decimal,

    /// Single-position concentration limit as a fraction of allocated capital
    #[serde(default = "default_max_position_ratio")]
    pub max_position_ratio: Decimal,

    /// Smallest order size the exchange accepts
    #[serde(default = "default_min_order_size")]
    pub min_order_size: Decimal,

    /// Synthetic per-unit risk when no stop-loss is supplied,
    /// as a fraction of entry price
    #[serde(default = "default_fallback_risk_ratio")]
    pub fallback_risk_ratio: Decimal,

    /// Quantity decimal places when no per-instrument override exists
    #[serde(default = "default_precision")]
    pub default_quantity_precision: u32,

    /// Per-instrument quantity precision overrides
    #[serde(default)]
    pub quantity_precision: HashMap<String, u32>,
}

fn default_capital_ratio() -> Decimal {
    Decimal::new(10, 2) // 0.10 = 10%
}
fn default_max_loss_ratio() -> Decimal {
    Decimal::new(2, 2) // 0.02 = 2%
}
fn default_max_position_ratio() -> Decimal {
    Decimal::new(50, 2) // 0.50 = 50%
}
fn default_min_order_size() -> Decimal {
    Decimal::new(1, 3) // 0.001
}
fn default_fallback_risk_ratio() -> Decimal {
    Decimal::new(5, 2) // 0.05 = 5%
}
fn default_precision() -> u32 {
    3
}

impl CapitalConfig {
    /// Quantity precision for an instrument, falling back to the default
    pub fn precision_for(&self, instrument: &str) -> u32 {
        self.quantity_precision
            .get(instrument)
            .copied()
            .unwrap_or(self.default_quantity_precision)
    }
}

impl Default for CapitalConfig {
    fn default() -> Self {
        Self {
            capital_ratio: default_capital_ratio(),
            max_loss_ratio: default_max_loss_ratio(),
            max_position_ratio: default_max_position_ratio(),
            min_order_size: default_min_order_size(),
            fallback_risk_ratio: default_fallback_risk_ratio(),
            default_quantity_precision: default_precision(),
            quantity_precision: HashMap::new(),
        }
    }
}

/// Risk gate configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RiskConfig {
    /// Daily loss limit as a fraction of balance
    #[serde(default = "default_max_daily_loss")]
    pub max_daily_loss_ratio: Decimal,

    /// Weekly loss limit as a fraction of balance
    #[serde(default = "default_max_weekly_loss")]
    pub max_weekly_loss_ratio: Decimal,

    /// Monthly loss limit as a fraction of balance
    #[serde(default = "default_max_monthly_loss")]
    pub max_monthly_loss_ratio: Decimal,

    /// Consecutive qualifying losses before new trades stop
    #[serde(default = "default_max_consecutive_losses")]
    pub max_consecutive_losses: u32,

    /// A loss only counts toward the streak when its magnitude exceeds
    /// this fraction of balance
    #[serde(default = "default_consecutive_loss_threshold")]
    pub consecutive_loss_threshold: Decimal,

    /// Drawdown from peak triggering emergency stop
    #[serde(default = "default_max_drawdown")]
    pub max_drawdown_ratio: Decimal,

    /// Drawdown from peak triggering size reduction
    #[serde(default = "default_drawdown_stop")]
    pub drawdown_stop_ratio: Decimal,

    /// Trade-count cap per trailing hour
    #[serde(default = "default_max_trades_per_hour")]
    pub max_trades_per_hour: u32,

    /// Trade-count cap per trailing day
    #[serde(default = "default_max_trades_per_day")]
    pub max_trades_per_day: u32,

    /// Cooldown after the consecutive-loss stop fires, in minutes
    #[serde(default = "default_cool_down_consecutive")]
    pub cool_down_after_consecutive_mins: i64,

    /// Ring-buffer capacity for trade history
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,
}

fn default_max_daily_loss() -> Decimal {
    Decimal::new(5, 2) // 0.05 = 5%
}
fn default_max_weekly_loss() -> Decimal {
    Decimal::new(15, 2) // 0.15 = 15%
}
fn default_max_monthly_loss() -> Decimal {
    Decimal::new(30, 2) // 0.30 = 30%
}
fn default_max_consecutive_losses() -> u32 {
    5
}
fn default_consecutive_loss_threshold() -> Decimal {
    Decimal::new(2, 2) // 0.02 = 2%
}
fn default_max_drawdown() -> Decimal {
    Decimal::new(20, 2) // 0.20 = 20%
}
fn default_drawdown_stop() -> Decimal {
    Decimal::new(15, 2) // 0.15 = 15%
}
fn default_max_trades_per_hour() -> u32 {
    10
}
fn default_max_trades_per_day() -> u32 {
    50
}
fn default_cool_down_consecutive() -> i64 {
    60
}
fn default_history_capacity() -> usize {
    1000
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            max_daily_loss_ratio: default_max_daily_loss(),
            max_weekly_loss_ratio: default_max_weekly_loss(),
            max_monthly_loss_ratio: default_max_monthly_loss(),
            max_consecutive_losses: default_max_consecutive_losses(),
            consecutive_loss_threshold: default_consecutive_loss_threshold(),
            max_drawdown_ratio: default_max_drawdown(),
            drawdown_stop_ratio: default_drawdown_stop(),
            max_trades_per_hour: default_max_trades_per_hour(),
            max_trades_per_day: default_max_trades_per_day(),
            cool_down_after_consecutive_mins: default_cool_down_consecutive(),
            history_capacity: default_history_capacity(),
        }
    }
}

/// Telemetry configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<std::path::Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}
