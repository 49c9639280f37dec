//! Risk gating module
//!
//! Trade history, threshold classification, and the trading verdict

mod gate;
mod rules;
mod types;

pub use gate::RiskGate;
pub use rules::{classify, frequency_warnings, RuleInputs, ThresholdRule, THRESHOLD_RULES};
pub use types::{RiskAction, RiskLevel, RiskSnapshot, TradeRecord};
