//! Capital accounting types

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Result of a position sizing calculation
///
/// A zero-sized result is the normal "no room" outcome, not a fault.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionSize {
    /// Tradable quantity, truncated to the instrument's precision
    pub size: Decimal,
    /// Dollar exposure at entry (size * entry price)
    pub notional: Decimal,
    /// Dollars lost if the stop is hit
    pub risk_amount: Decimal,
    /// Risk as a fraction of allocated capital
    pub risk_pct: Decimal,
}

impl PositionSize {
    /// The zero-sized outcome
    pub fn zero() -> Self {
        Self {
            size: dec!(0),
            notional: dec!(0),
            risk_amount: dec!(0),
            risk_pct: dec!(0),
        }
    }

    /// Whether this result carries a tradable size
    pub fn is_tradable(&self) -> bool {
        self.size > dec!(0)
    }
}

/// Reserved exposure for one instrument
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Exposure {
    /// Reserved dollar exposure
    pub notional: Decimal,
    /// Last-known mark-to-market P&L, overwritten on each update
    pub unrealized_pnl: Decimal,
}

impl Exposure {
    pub fn new() -> Self {
        Self {
            notional: dec!(0),
            unrealized_pnl: dec!(0),
        }
    }
}

impl Default for Exposure {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of a loss-limit check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitCheck {
    /// Current unrealized loss as a fraction of allocated capital
    pub current_loss_ratio: Decimal,
    /// True when the loss ratio exceeds the configured maximum
    pub exceeded: bool,
    /// Used capital as a fraction of allocated capital
    pub utilization: Decimal,
}

/// Capital overview for status reporting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapitalStatus {
    pub total_balance: Decimal,
    pub allocated_capital: Decimal,
    pub used_capital: Decimal,
    pub available_capital: Decimal,
    /// Used capital as a fraction of allocated capital
    pub utilization: Decimal,
    pub total_unrealized_pnl: Decimal,
    pub open_exposures: usize,
}
