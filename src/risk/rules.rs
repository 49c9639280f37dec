//! Threshold rule table
//!
//! Precedence is a data structure: rules are evaluated top-to-bottom and the
//! first match decides the level and action. Frequency proximity warnings are
//! appended separately and never alter the action.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::{RiskAction, RiskLevel};
use crate::config::RiskConfig;

/// Streak length that triggers the size-reduction caution
const CAUTION_STREAK: u32 = 3;

/// Inputs a threshold rule may inspect
#[derive(Debug, Clone)]
pub struct RuleInputs {
    /// Fractional decline from peak balance
    pub drawdown: Decimal,
    pub daily_pnl: Decimal,
    pub weekly_pnl: Decimal,
    pub consecutive_losses: u32,
    pub balance: Decimal,
}

/// One row of the precedence table
pub struct ThresholdRule {
    pub name: &'static str,
    pub level: RiskLevel,
    pub action: RiskAction,
    /// Returns the warning message when the rule triggers
    pub check: fn(&RuleInputs, &RiskConfig) -> Option<String>,
}

fn drawdown_emergency(inputs: &RuleInputs, config: &RiskConfig) -> Option<String> {
    (inputs.drawdown >= config.max_drawdown_ratio).then(|| {
        format!(
            "max drawdown exceeded: {:.1}%",
            inputs.drawdown * dec!(100)
        )
    })
}

fn daily_loss_breach(inputs: &RuleInputs, config: &RiskConfig) -> Option<String> {
    (inputs.daily_pnl.abs() >= inputs.balance * config.max_daily_loss_ratio)
        .then(|| format!("daily loss limit breached: {:.2}", inputs.daily_pnl))
}

fn consecutive_loss_stop(inputs: &RuleInputs, config: &RiskConfig) -> Option<String> {
    (inputs.consecutive_losses >= config.max_consecutive_losses)
        .then(|| format!("{} consecutive losses", inputs.consecutive_losses))
}

fn drawdown_warning(inputs: &RuleInputs, config: &RiskConfig) -> Option<String> {
    (inputs.drawdown >= config.drawdown_stop_ratio).then(|| {
        format!(
            "drawdown warning: {:.1}%",
            inputs.drawdown * dec!(100)
        )
    })
}

fn weekly_loss_warning(inputs: &RuleInputs, config: &RiskConfig) -> Option<String> {
    // Early warning at 80% of the weekly limit
    let threshold = inputs.balance * config.max_weekly_loss_ratio * dec!(0.8);
    (inputs.weekly_pnl.abs() >= threshold)
        .then(|| format!("weekly loss warning: {:.2}", inputs.weekly_pnl))
}

fn consecutive_loss_caution(inputs: &RuleInputs, _config: &RiskConfig) -> Option<String> {
    (inputs.consecutive_losses >= CAUTION_STREAK)
        .then(|| format!("loss streak caution: {}", inputs.consecutive_losses))
}

/// Ordered precedence table, first match wins
pub const THRESHOLD_RULES: &[ThresholdRule] = &[
    ThresholdRule {
        name: "drawdown_emergency",
        level: RiskLevel::Critical,
        action: RiskAction::EmergencyStop,
        check: drawdown_emergency,
    },
    ThresholdRule {
        name: "daily_loss_breach",
        level: RiskLevel::High,
        action: RiskAction::CloseAll,
        check: daily_loss_breach,
    },
    ThresholdRule {
        name: "consecutive_loss_stop",
        level: RiskLevel::High,
        action: RiskAction::StopNew,
        check: consecutive_loss_stop,
    },
    ThresholdRule {
        name: "drawdown_warning",
        level: RiskLevel::Medium,
        action: RiskAction::ReduceSize,
        check: drawdown_warning,
    },
    ThresholdRule {
        name: "weekly_loss_warning",
        level: RiskLevel::Medium,
        action: RiskAction::ReduceSize,
        check: weekly_loss_warning,
    },
    ThresholdRule {
        name: "consecutive_loss_caution",
        level: RiskLevel::Medium,
        action: RiskAction::ReduceSize,
        check: consecutive_loss_caution,
    },
];

/// Evaluate the table and return the verdict plus any triggered warning
pub fn classify(
    inputs: &RuleInputs,
    config: &RiskConfig,
) -> (RiskLevel, RiskAction, Option<String>) {
    for rule in THRESHOLD_RULES {
        if let Some(warning) = (rule.check)(inputs, config) {
            tracing::debug!(rule = rule.name, %warning, "threshold rule triggered");
            return (rule.level, rule.action, Some(warning));
        }
    }
    (RiskLevel::Low, RiskAction::Continue, None)
}

/// Trade-frequency proximity warnings at 90% of the hourly/daily caps
pub fn frequency_warnings(
    trades_this_hour: u32,
    trades_today: u32,
    config: &RiskConfig,
) -> Vec<String> {
    let mut warnings = Vec::new();

    if trades_this_hour * 10 >= config.max_trades_per_hour * 9 {
        warnings.push(format!(
            "hourly trade cap approaching: {}/{}",
            trades_this_hour, config.max_trades_per_hour
        ));
    }
    if trades_today * 10 >= config.max_trades_per_day * 9 {
        warnings.push(format!(
            "daily trade cap approaching: {}/{}",
            trades_today, config.max_trades_per_day
        ));
    }

    warnings
}
