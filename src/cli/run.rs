//! Run command implementation
//!
//! Drives a short paper session through the full gated flow so the engine
//! can be exercised end to end without an exchange.

use clap::Args;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;

use crate::clock::SystemClock;
use crate::config::Config;
use crate::engine::TradingOrchestrator;
use crate::exchange::{OrderSide, PaperExchange};

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Starting paper balance
    #[arg(long, default_value = "1000")]
    pub balance: Decimal,

    /// Starting paper price
    #[arg(long, default_value = "50000")]
    pub price: Decimal,

    /// Number of tick cycles to run
    #[arg(long, default_value = "3")]
    pub ticks: u32,
}

impl RunArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let exchange = Arc::new(PaperExchange::new(self.balance, self.price));
        let orchestrator = TradingOrchestrator::new(
            config,
            exchange.clone(),
            exchange.clone(),
            exchange.clone(),
            Arc::new(SystemClock),
        );

        orchestrator.start().await?;
        tracing::info!(balance = %self.balance, "paper session started");

        let outcome = orchestrator
            .place_gated_order(OrderSide::Buy, None, None, None)
            .await?;
        tracing::info!(?outcome, "gated order placed");

        for n in 0..self.ticks {
            // Drift the paper price so the mark moves between ticks
            let drift = dec!(0.002) * Decimal::from(n + 1);
            exchange.set_price(self.price * (dec!(1) + drift)).await;
            orchestrator.tick().await;
        }

        let close = orchestrator.close_gated(dec!(100), true).await?;
        tracing::info!(?close, "position closed");

        orchestrator.stop(false).await;

        let status = orchestrator.status().await;
        println!("{}", serde_json::to_string_pretty(&status)?);
        Ok(())
    }
}
