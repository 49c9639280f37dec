//! The risk gate: trade history in, verdict out

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::VecDeque;
use std::sync::Arc;

use super::rules::{self, RuleInputs};
use super::{RiskAction, RiskLevel, RiskSnapshot, TradeRecord};
use crate::clock::Clock;
use crate::config::RiskConfig;

/// Maintains trade history and balance state, and translates them into a
/// single authoritative verdict
///
/// The verdict is recomputed from scratch on every request; the only state
/// the assessment itself mutates is the cooldown stamp, and that mutation is
/// an explicit, separately testable step (`apply_cooldown_if_triggered`).
pub struct RiskGate {
    config: RiskConfig,
    clock: Arc<dyn Clock>,

    /// Bounded ring of recent trades, oldest silently evicted
    history: VecDeque<TradeRecord>,

    initial_balance: Decimal,
    peak_balance: Decimal,
    current_balance: Decimal,

    consecutive_losses: u32,
    last_loss_time: Option<DateTime<Utc>>,
    cool_down_until: Option<DateTime<Utc>>,

    /// Level from the most recent assessment, for external inspection
    current_level: RiskLevel,
}

impl RiskGate {
    pub fn new(config: RiskConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            clock,
            history: VecDeque::new(),
            initial_balance: dec!(0),
            peak_balance: dec!(0),
            current_balance: dec!(0),
            consecutive_losses: 0,
            last_loss_time: None,
            cool_down_until: None,
            current_level: RiskLevel::Low,
        }
    }

    /// Seed the balance at session start
    pub fn initialize_balance(&mut self, balance: Decimal) {
        self.initial_balance = balance;
        self.peak_balance = balance;
        self.current_balance = balance;
        tracing::info!(%balance, "risk gate seeded");
    }

    /// Update the current balance, advancing the high-water mark
    pub fn set_balance(&mut self, balance: Decimal) {
        let old = self.current_balance;
        self.current_balance = balance;
        if balance > self.peak_balance {
            self.peak_balance = balance;
            tracing::info!(%balance, "new peak balance");
        }
        if balance != old {
            tracing::info!(from = %old, to = %balance, "balance updated");
        }
    }

    /// Append a trade to the history and maintain the loss streak
    ///
    /// A loss only advances the streak when the caller flagged it *and* its
    /// magnitude exceeds `consecutive_loss_threshold` of balance; any
    /// non-loss record, entries included, resets the streak. Small flagged
    /// losses do neither.
    pub fn record_trade(&mut self, record: TradeRecord) {
        if self.history.len() >= self.config.history_capacity {
            self.history.pop_front();
        }

        if record.is_loss {
            let qualifying_loss = -(self.current_balance * self.config.consecutive_loss_threshold);
            if record.realized_pnl.is_some_and(|pnl| pnl < qualifying_loss) {
                self.consecutive_losses += 1;
                self.last_loss_time = Some(record.timestamp);
                tracing::warn!(streak = self.consecutive_losses, "qualifying loss recorded");
            }
        } else if self.consecutive_losses > 0 {
            tracing::info!(ended = self.consecutive_losses, "loss streak reset");
            self.consecutive_losses = 0;
            self.last_loss_time = None;
        }

        tracing::info!(
            instrument = %record.instrument,
            side = ?record.side,
            pnl = ?record.realized_pnl,
            "trade recorded"
        );
        self.history.push_back(record);
    }

    /// Sum realized P&L over a trailing window
    fn period_pnl(&self, now: DateTime<Utc>, window: Duration) -> Decimal {
        let cutoff = now - window;
        self.history
            .iter()
            .filter(|t| t.timestamp >= cutoff)
            .filter_map(|t| t.realized_pnl)
            .sum()
    }

    /// Count trades over a trailing window
    fn trades_in(&self, now: DateTime<Utc>, window: Duration) -> u32 {
        let cutoff = now - window;
        self.history.iter().filter(|t| t.timestamp >= cutoff).count() as u32
    }

    /// Compute a fresh verdict; pure with respect to gate state
    pub fn compute_snapshot(&self) -> RiskSnapshot {
        let now = self.clock.now();

        let current_drawdown = if self.peak_balance > dec!(0) {
            (self.peak_balance - self.current_balance) / self.peak_balance
        } else {
            dec!(0)
        };

        let inputs = RuleInputs {
            drawdown: current_drawdown,
            daily_pnl: self.period_pnl(now, Duration::hours(24)),
            weekly_pnl: self.period_pnl(now, Duration::days(7)),
            consecutive_losses: self.consecutive_losses,
            balance: self.current_balance,
        };
        let trades_today = self.trades_in(now, Duration::hours(24));
        let trades_this_hour = self.trades_in(now, Duration::hours(1));

        let (level, action, rule_warning) = rules::classify(&inputs, &self.config);

        let mut warnings: Vec<String> = rule_warning.into_iter().collect();
        warnings.extend(rules::frequency_warnings(
            trades_this_hour,
            trades_today,
            &self.config,
        ));

        RiskSnapshot {
            level,
            action,
            daily_pnl: inputs.daily_pnl,
            weekly_pnl: inputs.weekly_pnl,
            monthly_pnl: self.period_pnl(now, Duration::days(30)),
            consecutive_losses: self.consecutive_losses,
            current_drawdown,
            trades_today,
            trades_this_hour,
            cool_down_until: self.cool_down_until,
            warnings,
        }
    }

    /// Stamp the cooldown when the consecutive-loss stop fired
    ///
    /// Re-stamped on every assessment while the condition persists, so the
    /// window extends until the streak is broken.
    pub fn apply_cooldown_if_triggered(&mut self, snapshot: &RiskSnapshot) {
        if snapshot.action == RiskAction::StopNew
            && snapshot.consecutive_losses >= self.config.max_consecutive_losses
        {
            let until =
                self.clock.now() + Duration::minutes(self.config.cool_down_after_consecutive_mins);
            self.cool_down_until = Some(until);
            tracing::warn!(%until, "cooldown set after consecutive losses");
        }
    }

    /// Full assessment: snapshot plus cooldown side effect and cached level
    pub fn assess_risk(&mut self) -> RiskSnapshot {
        let snapshot = self.compute_snapshot();
        self.apply_cooldown_if_triggered(&snapshot);
        self.current_level = snapshot.level;
        snapshot
    }

    /// Go/no-go for a new trade; fails closed
    pub fn check_trading_allowed(&mut self) -> (bool, String) {
        let now = self.clock.now();

        if let Some(until) = self.cool_down_until {
            if now < until {
                let remaining = (until - now).num_seconds() as f64 / 60.0;
                return (false, format!("cooling down for {remaining:.1} more minutes"));
            }
        }

        let snapshot = self.assess_risk();

        if snapshot.action.blocks_new_trades() {
            return (false, format!("risk level {:?}", snapshot.level));
        }
        if snapshot.trades_this_hour >= self.config.max_trades_per_hour {
            return (false, "hourly trade cap reached".to_string());
        }
        if snapshot.trades_today >= self.config.max_trades_per_day {
            return (false, "daily trade cap reached".to_string());
        }

        (true, "trading allowed".to_string())
    }

    /// Severity scaling applied on top of the allocator's raw size
    pub fn position_size_multiplier(&self) -> Decimal {
        match self.compute_snapshot().level {
            RiskLevel::Low => dec!(1.0),
            RiskLevel::Medium => dec!(0.5),
            RiskLevel::High => dec!(0.2),
            RiskLevel::Critical => dec!(0.1),
        }
    }

    /// Whether the current verdict requires liquidating open positions
    pub fn should_close_all(&self) -> bool {
        self.compute_snapshot().action.requires_liquidation()
    }

    /// Level from the most recent assessment
    pub fn current_level(&self) -> RiskLevel {
        self.current_level
    }

    /// Active cooldown stamp, if any
    pub fn cool_down_until(&self) -> Option<DateTime<Utc>> {
        self.cool_down_until
    }

    /// Timestamp of the last qualifying loss
    pub fn last_loss_time(&self) -> Option<DateTime<Utc>> {
        self.last_loss_time
    }

    /// Current loss streak length
    pub fn consecutive_losses(&self) -> u32 {
        self.consecutive_losses
    }

    pub fn initial_balance(&self) -> Decimal {
        self.initial_balance
    }

    pub fn current_balance(&self) -> Decimal {
        self.current_balance
    }

    pub fn peak_balance(&self) -> Decimal {
        self.peak_balance
    }

    /// Number of trades currently held in the history ring
    pub fn history_len(&self) -> usize {
        self.history.len()
    }
}
