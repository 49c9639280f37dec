//! Paper exchange with simulated fills

use super::{AccountBalance, BalanceSource, MarketFill, OrderExecutor, OrderSide, PriceSource};
use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

struct PaperState {
    balance: AccountBalance,
    price: Decimal,
    fills: Vec<MarketFill>,
    cancel_requests: u32,
    fail_orders: bool,
    fail_balance: bool,
    fail_price: bool,
    fail_cancels: bool,
}

/// Simulated exchange: settable balance and price, immediate fills at the
/// current price, recorded order log
///
/// Implements all three collaborator traits so a single instance can drive
/// an orchestrator in demos and tests.
#[derive(Clone)]
pub struct PaperExchange {
    state: Arc<RwLock<PaperState>>,
}

impl PaperExchange {
    /// Create a paper exchange with a starting balance and price
    pub fn new(balance: Decimal, price: Decimal) -> Self {
        Self {
            state: Arc::new(RwLock::new(PaperState {
                balance: AccountBalance {
                    total: balance,
                    available: balance,
                },
                price,
                fills: vec![],
                cancel_requests: 0,
                fail_orders: false,
                fail_balance: false,
                fail_price: false,
                fail_cancels: false,
            })),
        }
    }

    /// Move the simulated market price
    pub async fn set_price(&self, price: Decimal) {
        self.state.write().await.price = price;
    }

    /// Overwrite the reported balance
    pub async fn set_balance(&self, total: Decimal, available: Decimal) {
        self.state.write().await.balance = AccountBalance { total, available };
    }

    /// Make subsequent order submissions fail
    pub async fn set_fail_orders(&self, fail: bool) {
        self.state.write().await.fail_orders = fail;
    }

    /// Make subsequent balance fetches fail
    pub async fn set_fail_balance(&self, fail: bool) {
        self.state.write().await.fail_balance = fail;
    }

    /// Make subsequent price fetches fail
    pub async fn set_fail_price(&self, fail: bool) {
        self.state.write().await.fail_price = fail;
    }

    /// Make subsequent cancel-all requests fail
    pub async fn set_fail_cancels(&self, fail: bool) {
        self.state.write().await.fail_cancels = fail;
    }

    /// All fills so far
    pub async fn fills(&self) -> Vec<MarketFill> {
        self.state.read().await.fills.clone()
    }

    /// Number of cancel-all requests received
    pub async fn cancel_requests(&self) -> u32 {
        self.state.read().await.cancel_requests
    }
}

#[async_trait]
impl BalanceSource for PaperExchange {
    async fn fetch_balance(&self) -> anyhow::Result<AccountBalance> {
        let state = self.state.read().await;
        if state.fail_balance {
            anyhow::bail!("balance unavailable from paper exchange");
        }
        Ok(state.balance)
    }
}

#[async_trait]
impl PriceSource for PaperExchange {
    async fn fetch_price(&self, _instrument: &str) -> anyhow::Result<Decimal> {
        let state = self.state.read().await;
        if state.fail_price {
            anyhow::bail!("price unavailable from paper exchange");
        }
        Ok(state.price)
    }
}

#[async_trait]
impl OrderExecutor for PaperExchange {
    async fn submit_market_order(
        &self,
        instrument: &str,
        side: OrderSide,
        quantity: Decimal,
    ) -> anyhow::Result<MarketFill> {
        let mut state = self.state.write().await;
        if state.fail_orders {
            anyhow::bail!("order rejected by paper exchange");
        }

        // Immediate fill at the current simulated price
        let fill = MarketFill {
            order_id: Uuid::new_v4(),
            instrument: instrument.to_string(),
            side,
            quantity,
            price: state.price,
            timestamp: Utc::now(),
        };
        state.fills.push(fill.clone());
        Ok(fill)
    }

    async fn cancel_all_resting(&self, _instrument: &str) -> anyhow::Result<()> {
        let mut state = self.state.write().await;
        state.cancel_requests += 1;
        if state.fail_cancels {
            anyhow::bail!("cancel rejected by paper exchange");
        }
        Ok(())
    }
}
