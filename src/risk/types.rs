//! Risk gate types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::exchange::OrderSide;

/// Account risk classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

/// Enforcement action prescribed by the gate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskAction {
    /// Trade normally
    Continue,
    /// Scale position sizes down
    ReduceSize,
    /// Refuse new trades, keep existing positions
    StopNew,
    /// Liquidate all positions, keep the system running
    CloseAll,
    /// Liquidate everything and halt
    EmergencyStop,
}

impl RiskAction {
    /// Whether this action refuses new trades
    pub fn blocks_new_trades(&self) -> bool {
        matches!(
            self,
            RiskAction::StopNew | RiskAction::CloseAll | RiskAction::EmergencyStop
        )
    }

    /// Whether this action requires liquidating open positions
    pub fn requires_liquidation(&self) -> bool {
        matches!(self, RiskAction::CloseAll | RiskAction::EmergencyStop)
    }
}

/// An immutable trade outcome fed into the gate's history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeRecord {
    pub timestamp: DateTime<Utc>,
    pub instrument: String,
    pub side: OrderSide,
    pub quantity: Decimal,
    pub price: Decimal,
    /// Absent for entries; present once the trade is realized
    pub realized_pnl: Option<Decimal>,
    /// Caller-supplied loss flag, deliberately distinct from the P&L sign
    pub is_loss: bool,
}

/// Point-in-time risk verdict
///
/// Recomputed fresh from the history on every request, never stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskSnapshot {
    pub level: RiskLevel,
    pub action: RiskAction,
    pub daily_pnl: Decimal,
    pub weekly_pnl: Decimal,
    pub monthly_pnl: Decimal,
    pub consecutive_losses: u32,
    /// Fractional decline from peak balance
    pub current_drawdown: Decimal,
    pub trades_today: u32,
    pub trades_this_hour: u32,
    pub cool_down_until: Option<DateTime<Utc>>,
    /// One entry per triggered threshold, in precedence order
    pub warnings: Vec<String>,
}
