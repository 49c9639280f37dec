//! Trading orchestrator
//!
//! Composes the capital allocator and the risk gate: every prospective trade
//! passes the gate, gets sized by the allocator scaled by the gate's severity
//! multiplier, and feeds its outcome back into both components. A periodic
//! tick re-evaluates the gate and enforces its verdict, up to a full
//! liquidation cascade.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use tokio::sync::Mutex;

use super::{
    BalanceInfo, EngineError, EngineStatus, ExecutedTrade, Lifecycle, OpenPosition, TradeOutcome,
};
use crate::capital::CapitalAllocator;
use crate::clock::Clock;
use crate::config::{Config, EngineConfig};
use crate::exchange::{BalanceSource, OrderExecutor, OrderSide, PriceSource};
use crate::risk::{RiskAction, RiskGate, TradeRecord};

/// Mutable state shared by both entry points (inbound orders and the tick)
///
/// Everything that both call sites touch lives behind one mutex so
/// reservations and loss streaks cannot lose updates.
struct Inner {
    lifecycle: Lifecycle,
    allocator: CapitalAllocator,
    gate: RiskGate,
    position: Option<OpenPosition>,
    last_status_log: Option<DateTime<Utc>>,
}

/// One orchestrator instance per traded instrument
pub struct TradingOrchestrator {
    config: EngineConfig,
    balances: Arc<dyn BalanceSource>,
    prices: Arc<dyn PriceSource>,
    executor: Arc<dyn OrderExecutor>,
    clock: Arc<dyn Clock>,
    inner: Mutex<Inner>,
}

impl TradingOrchestrator {
    pub fn new(
        config: &Config,
        balances: Arc<dyn BalanceSource>,
        prices: Arc<dyn PriceSource>,
        executor: Arc<dyn OrderExecutor>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config: config.engine.clone(),
            balances,
            prices,
            executor,
            clock: clock.clone(),
            inner: Mutex::new(Inner {
                lifecycle: Lifecycle::Inactive,
                allocator: CapitalAllocator::new(config.capital.clone()),
                gate: RiskGate::new(config.risk.clone(), clock),
                position: None,
                last_status_log: None,
            }),
        }
    }

    /// Start the session, seeding both components from a balance fetch
    ///
    /// A failed fetch aborts with no state mutated.
    pub async fn start(&self) -> Result<(), EngineError> {
        let balance = self
            .balances
            .fetch_balance()
            .await
            .map_err(|e| EngineError::BalanceFetch(e.to_string()))?;

        let mut inner = self.inner.lock().await;
        inner.allocator.set_balance(balance.total);
        inner.gate.initialize_balance(balance.total);
        inner.lifecycle = Lifecycle::Active;

        tracing::info!(
            instrument = %self.config.instrument,
            balance = %balance.total,
            "orchestrator started"
        );
        Ok(())
    }

    /// Stop the session; an emergency stop liquidates first
    pub async fn stop(&self, emergency: bool) {
        if emergency {
            tracing::warn!("emergency stop requested");
            self.run_emergency_cascade().await;
        } else {
            let mut inner = self.inner.lock().await;
            inner.lifecycle = Lifecycle::Inactive;
            tracing::info!("orchestrator stopped");
        }
    }

    /// Place a new position through the gate
    ///
    /// Explicit ratios override the configured defaults; an explicit quantity
    /// bypasses sizing but not the gate.
    pub async fn place_gated_order(
        &self,
        side: OrderSide,
        stop_loss_ratio: Option<Decimal>,
        take_profit_ratio: Option<Decimal>,
        quantity: Option<Decimal>,
    ) -> Result<TradeOutcome, EngineError> {
        let mut inner = self.inner.lock().await;

        match inner.lifecycle {
            Lifecycle::Active => {}
            Lifecycle::Inactive => return Ok(TradeOutcome::refused("engine not active")),
            Lifecycle::EmergencyStopped => {
                return Ok(TradeOutcome::refused("emergency stopped"))
            }
        }
        if inner.position.is_some() {
            return Ok(TradeOutcome::refused("position already open"));
        }

        let (allowed, reason) = inner.gate.check_trading_allowed();
        if !allowed {
            tracing::warn!(%reason, "order refused by risk gate");
            return Ok(TradeOutcome::refused(reason));
        }

        let price = self
            .prices
            .fetch_price(&self.config.instrument)
            .await
            .map_err(|e| EngineError::PriceFetch(e.to_string()))?;

        // Direction-aware protective prices: long stops below entry,
        // short stops above
        let sl_ratio = stop_loss_ratio.unwrap_or(self.config.default_stop_loss_ratio);
        let tp_ratio = take_profit_ratio.unwrap_or(self.config.default_take_profit_ratio);
        let (stop_loss, take_profit) = match side {
            OrderSide::Buy => (
                price * (dec!(1) - sl_ratio),
                price * (dec!(1) + tp_ratio),
            ),
            OrderSide::Sell => (
                price * (dec!(1) + sl_ratio),
                price * (dec!(1) - tp_ratio),
            ),
        };

        let quantity = match quantity {
            Some(q) => q,
            None => {
                let sized = inner
                    .allocator
                    .size_position(&self.config.instrument, price, Some(stop_loss));
                let multiplier = inner.gate.position_size_multiplier();
                let scaled = inner
                    .allocator
                    .truncate_quantity(&self.config.instrument, sized.size * multiplier);
                tracing::info!(
                    base = %sized.size,
                    %multiplier,
                    %scaled,
                    "position sized"
                );
                scaled
            }
        };
        if quantity <= dec!(0) {
            return Ok(TradeOutcome::refused("computed position size is zero"));
        }

        let notional = quantity * price;
        if !inner.allocator.reserve(&self.config.instrument, notional) {
            return Ok(TradeOutcome::refused("insufficient capital to reserve"));
        }

        let fill = match self
            .executor
            .submit_market_order(&self.config.instrument, side, quantity)
            .await
        {
            Ok(fill) => fill,
            Err(e) => {
                // Roll back the reservation made for the failed order
                inner.allocator.release(&self.config.instrument, notional);
                return Err(EngineError::OrderSubmit(e.to_string()));
            }
        };

        // Entries carry no realized P&L
        inner.gate.record_trade(TradeRecord {
            timestamp: fill.timestamp,
            instrument: fill.instrument.clone(),
            side: fill.side,
            quantity: fill.quantity,
            price: fill.price,
            realized_pnl: None,
            is_loss: false,
        });
        inner.position = Some(OpenPosition {
            side,
            quantity: fill.quantity,
            entry_price: fill.price,
            notional,
            unrealized_pnl: dec!(0),
            opened_at: fill.timestamp,
        });

        tracing::info!(
            order_id = %fill.order_id,
            side = ?side,
            quantity = %fill.quantity,
            price = %fill.price,
            %stop_loss,
            %take_profit,
            "gated order executed"
        );

        // Post-trade re-check surfaces warnings but never blocks retroactively
        let snapshot = inner.gate.assess_risk();
        for warning in &snapshot.warnings {
            tracing::warn!(%warning, "post-trade risk warning");
        }

        Ok(TradeOutcome::Executed(ExecutedTrade {
            order_id: fill.order_id,
            instrument: fill.instrument,
            side: fill.side,
            quantity: fill.quantity,
            price: fill.price,
            stop_loss: Some(stop_loss),
            take_profit: Some(take_profit),
            realized_pnl: None,
            timestamp: fill.timestamp,
        }))
    }

    /// Close part or all of the open position, realizing P&L
    pub async fn close_gated(
        &self,
        percentage: Decimal,
        record_pnl: bool,
    ) -> Result<TradeOutcome, EngineError> {
        let mut inner = self.inner.lock().await;

        let Some(position) = inner.position.clone() else {
            return Ok(TradeOutcome::refused("no open position"));
        };

        let price = self
            .prices
            .fetch_price(&self.config.instrument)
            .await
            .map_err(|e| EngineError::PriceFetch(e.to_string()))?;

        // Percentages above 100 close the full position, never more
        let fraction = (percentage / dec!(100)).min(dec!(1));
        let close_quantity = if percentage >= dec!(100) {
            position.quantity
        } else {
            inner
                .allocator
                .truncate_quantity(&self.config.instrument, position.quantity * fraction)
        };
        if close_quantity <= dec!(0) {
            return Ok(TradeOutcome::refused("close quantity is zero"));
        }

        let realized = position.unrealized_at(price) * fraction;

        let fill = self
            .executor
            .submit_market_order(
                &self.config.instrument,
                position.side.opposite(),
                close_quantity,
            )
            .await
            .map_err(|e| EngineError::OrderSubmit(e.to_string()))?;

        if record_pnl {
            inner.gate.record_trade(TradeRecord {
                timestamp: fill.timestamp,
                instrument: fill.instrument.clone(),
                side: fill.side,
                quantity: fill.quantity,
                price: fill.price,
                realized_pnl: Some(realized),
                is_loss: realized < dec!(0),
            });
        }

        let released = position.notional * fraction;
        inner.allocator.release(&self.config.instrument, released);

        if percentage >= dec!(100) {
            inner.position = None;
        } else if let Some(remaining) = inner.position.as_mut() {
            remaining.quantity -= close_quantity;
            remaining.notional -= released;
        }

        tracing::info!(
            %percentage,
            quantity = %fill.quantity,
            price = %fill.price,
            pnl = %realized,
            "position closed"
        );

        // Refresh balances after a realized close; failure here must not
        // undo an already-executed close
        if record_pnl {
            match self.balances.fetch_balance().await {
                Ok(balance) => {
                    inner.allocator.set_balance(balance.total);
                    inner.gate.set_balance(balance.total);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "balance refresh failed after close");
                }
            }
        }

        let snapshot = inner.gate.assess_risk();
        for warning in &snapshot.warnings {
            tracing::warn!(%warning, "post-trade risk warning");
        }

        Ok(TradeOutcome::Executed(ExecutedTrade {
            order_id: fill.order_id,
            instrument: fill.instrument,
            side: fill.side,
            quantity: fill.quantity,
            price: fill.price,
            stop_loss: None,
            take_profit: None,
            realized_pnl: Some(realized),
            timestamp: fill.timestamp,
        }))
    }

    /// Periodic re-evaluation and enforcement
    ///
    /// EMERGENCY_STOP runs the full cascade and halts; CLOSE_ALL liquidates
    /// without halting; STOP_NEW is advisory since new orders are already
    /// blocked at the gate.
    pub async fn tick(&self) {
        let action = {
            let mut inner = self.inner.lock().await;
            if inner.lifecycle != Lifecycle::Active {
                return;
            }

            // Best-effort mark-to-market refresh
            if inner.position.is_some() {
                if let Ok(price) = self.prices.fetch_price(&self.config.instrument).await {
                    if let Some(position) = inner.position.as_mut() {
                        position.mark(price);
                        let pnl = position.unrealized_pnl;
                        inner
                            .allocator
                            .mark_unrealized(&self.config.instrument, pnl);
                    }
                    let limits = inner.allocator.check_limits();
                    if limits.exceeded {
                        tracing::warn!(
                            loss_ratio = %limits.current_loss_ratio,
                            "unrealized loss limit exceeded"
                        );
                    }
                }
            }

            inner.gate.assess_risk().action
        };

        match action {
            RiskAction::EmergencyStop => {
                tracing::error!("emergency stop verdict on tick");
                self.run_emergency_cascade().await;
            }
            RiskAction::CloseAll => {
                tracing::warn!("close-all verdict on tick");
                if let Err(e) = self.close_gated(dec!(100), true).await {
                    tracing::error!(error = %e, "close-all liquidation failed");
                }
            }
            RiskAction::StopNew => {
                // New orders are already refused at the gate
                tracing::warn!("new trades suspended by risk gate");
            }
            RiskAction::ReduceSize | RiskAction::Continue => {}
        }

        self.maybe_log_status().await;
    }

    /// Liquidate the open position; idempotent
    ///
    /// A cancellation failure is logged and does not abort the attempt.
    pub async fn emergency_liquidate(&self) -> Result<(), EngineError> {
        {
            let inner = self.inner.lock().await;
            if inner.position.is_none() {
                tracing::info!("no open position to liquidate");
                return Ok(());
            }
        }

        if let Err(e) = self
            .executor
            .cancel_all_resting(&self.config.instrument)
            .await
        {
            tracing::warn!(error = %e, "cancel-all failed, continuing liquidation");
        }

        match self.close_gated(dec!(100), true).await? {
            TradeOutcome::Executed(trade) => {
                tracing::info!(pnl = ?trade.realized_pnl, "emergency liquidation complete");
                Ok(())
            }
            // Position already gone; nothing left to do
            TradeOutcome::Refused { .. } => Ok(()),
        }
    }

    /// Current engine status; read-only
    pub async fn status(&self) -> EngineStatus {
        let inner = self.inner.lock().await;
        let snapshot = inner.gate.compute_snapshot();

        EngineStatus {
            lifecycle: inner.lifecycle,
            level: snapshot.level,
            action: snapshot.action,
            balance: BalanceInfo {
                initial: inner.gate.initial_balance(),
                current: inner.gate.current_balance(),
                peak: inner.gate.peak_balance(),
                total_pnl: inner.gate.current_balance() - inner.gate.initial_balance(),
            },
            capital: inner.allocator.status(),
            consecutive_losses: snapshot.consecutive_losses,
            cool_down_until: snapshot.cool_down_until,
            warnings: snapshot.warnings,
            position: inner.position.clone(),
        }
    }

    /// Current lifecycle state
    pub async fn lifecycle(&self) -> Lifecycle {
        self.inner.lock().await.lifecycle
    }

    /// The cascade must reach a flat, halted state even when individual
    /// steps fail
    async fn run_emergency_cascade(&self) {
        if let Err(e) = self.emergency_liquidate().await {
            tracing::error!(error = %e, "emergency liquidation failed");
        }

        let mut inner = self.inner.lock().await;
        inner.lifecycle = Lifecycle::EmergencyStopped;
        tracing::error!("trading halted");
    }

    async fn maybe_log_status(&self) {
        let now = self.clock.now();
        let interval = Duration::seconds(self.config.status_log_interval_secs as i64);

        let mut inner = self.inner.lock().await;
        let due = inner
            .last_status_log
            .map_or(true, |last| now - last >= interval);
        if !due {
            return;
        }
        inner.last_status_log = Some(now);

        let snapshot = inner.gate.compute_snapshot();
        let capital = inner.allocator.status();
        tracing::info!(
            balance = %inner.gate.current_balance(),
            daily_pnl = %snapshot.daily_pnl,
            level = ?snapshot.level,
            utilization = %capital.utilization,
            "status summary"
        );
    }
}
