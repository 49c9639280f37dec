//! Exchange collaborator contracts
//!
//! The engine performs no I/O itself; balance, prices, and order execution
//! come from these mockable traits.

mod paper;
mod types;

pub use paper::PaperExchange;
pub use types::{AccountBalance, MarketFill, OrderSide};

use async_trait::async_trait;
use rust_decimal::Decimal;

/// Source of account balance
#[async_trait]
pub trait BalanceSource: Send + Sync {
    /// Fetch the current account balance
    async fn fetch_balance(&self) -> anyhow::Result<AccountBalance>;
}

/// Source of current prices
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Fetch the current price for an instrument
    async fn fetch_price(&self, instrument: &str) -> anyhow::Result<Decimal>;
}

/// Order submission and cancellation
#[async_trait]
pub trait OrderExecutor: Send + Sync {
    /// Submit a market order and return the fill
    async fn submit_market_order(
        &self,
        instrument: &str,
        side: OrderSide,
        quantity: Decimal,
    ) -> anyhow::Result<MarketFill>;

    /// Cancel all resting orders for an instrument (best effort)
    async fn cancel_all_resting(&self, instrument: &str) -> anyhow::Result<()>;
}
