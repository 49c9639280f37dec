//! Exchange collaborator types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Order direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    /// The side that closes a position opened on this side
    pub fn opposite(&self) -> Self {
        match self {
            OrderSide::Buy => OrderSide::Sell,
            OrderSide::Sell => OrderSide::Buy,
        }
    }
}

/// Account balance as reported by the exchange
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AccountBalance {
    /// Total equity
    pub total: Decimal,
    /// Portion not locked in positions or orders
    pub available: Decimal,
}

/// An executed market order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketFill {
    pub order_id: Uuid,
    pub instrument: String,
    pub side: OrderSide,
    pub quantity: Decimal,
    pub price: Decimal,
    pub timestamp: DateTime<Utc>,
}
