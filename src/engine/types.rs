//! Orchestrator types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::capital::CapitalStatus;
use crate::exchange::OrderSide;
use crate::risk::{RiskAction, RiskLevel};

/// System lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Lifecycle {
    /// Not started, or stopped normally
    Inactive,
    /// Trading
    Active,
    /// Halted by an emergency stop; requires an explicit restart
    EmergencyStopped,
}

/// Collaborator failures surfaced to the caller
///
/// Policy refusals are not errors; they come back as
/// [`TradeOutcome::Refused`].
#[derive(Debug, Error)]
pub enum EngineError {
    /// Balance source failed
    #[error("balance fetch failed: {0}")]
    BalanceFetch(String),
    /// Price source failed
    #[error("price fetch failed: {0}")]
    PriceFetch(String),
    /// Order executor failed
    #[error("order submission failed: {0}")]
    OrderSubmit(String),
}

/// A successfully executed gated trade
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutedTrade {
    pub order_id: Uuid,
    pub instrument: String,
    pub side: OrderSide,
    pub quantity: Decimal,
    pub price: Decimal,
    /// Derived protective stop price, when one applies
    pub stop_loss: Option<Decimal>,
    /// Derived take-profit price, when one applies
    pub take_profit: Option<Decimal>,
    /// Realized P&L for closes; absent on entries
    pub realized_pnl: Option<Decimal>,
    pub timestamp: DateTime<Utc>,
}

/// Outcome of a gated order or close
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TradeOutcome {
    /// The trade went through
    Executed(ExecutedTrade),
    /// Policy said no; expected and non-exceptional
    Refused { reason: String },
}

impl TradeOutcome {
    pub fn is_executed(&self) -> bool {
        matches!(self, TradeOutcome::Executed(_))
    }

    /// Refusal reason, if this outcome is a refusal
    pub fn refusal_reason(&self) -> Option<&str> {
        match self {
            TradeOutcome::Refused { reason } => Some(reason),
            TradeOutcome::Executed(_) => None,
        }
    }

    pub fn refused(reason: impl Into<String>) -> Self {
        TradeOutcome::Refused {
            reason: reason.into(),
        }
    }
}

/// The orchestrator's single open position
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenPosition {
    pub side: OrderSide,
    pub quantity: Decimal,
    pub entry_price: Decimal,
    /// Capital reserved for this position at entry
    pub notional: Decimal,
    pub unrealized_pnl: Decimal,
    pub opened_at: DateTime<Utc>,
}

impl OpenPosition {
    /// Unrealized P&L at a given mark price
    pub fn unrealized_at(&self, price: Decimal) -> Decimal {
        match self.side {
            OrderSide::Buy => (price - self.entry_price) * self.quantity,
            OrderSide::Sell => (self.entry_price - price) * self.quantity,
        }
    }

    /// Refresh the stored mark
    pub fn mark(&mut self, price: Decimal) {
        self.unrealized_pnl = self.unrealized_at(price);
    }
}

/// Balance summary for status reporting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceInfo {
    pub initial: Decimal,
    pub current: Decimal,
    pub peak: Decimal,
    pub total_pnl: Decimal,
}

/// Full engine status for operators
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineStatus {
    pub lifecycle: Lifecycle,
    pub level: RiskLevel,
    pub action: RiskAction,
    pub balance: BalanceInfo,
    pub capital: CapitalStatus,
    pub consecutive_losses: u32,
    pub cool_down_until: Option<DateTime<Utc>>,
    pub warnings: Vec<String>,
    pub position: Option<OpenPosition>,
}
