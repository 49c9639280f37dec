//! End-to-end risk scenarios driven through a manual clock

use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use riskgate::capital::CapitalAllocator;
use riskgate::clock::{Clock, ManualClock};
use riskgate::config::{CapitalConfig, RiskConfig};
use riskgate::exchange::OrderSide;
use riskgate::risk::{RiskAction, RiskGate, RiskLevel, TradeRecord};

fn gate_with_clock() -> (RiskGate, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2025, 6, 2, 9, 0, 0).unwrap(),
    ));
    let mut gate = RiskGate::new(RiskConfig::default(), clock.clone());
    gate.initialize_balance(dec!(10000));
    (gate, clock)
}

fn closed_trade(clock: &ManualClock, pnl: Decimal) -> TradeRecord {
    TradeRecord {
        timestamp: clock.now(),
        instrument: "BTCUSDT".to_string(),
        side: OrderSide::Sell,
        quantity: dec!(0.01),
        price: dec!(50000),
        realized_pnl: Some(pnl),
        is_loss: pnl < dec!(0),
    }
}

#[test]
fn test_three_losses_reduce_size() {
    let (mut gate, clock) = gate_with_clock();

    // Each loss clears the 2%-of-balance qualifying bar; spacing them a day
    // apart keeps the daily and weekly loss rules out of the picture
    for _ in 0..3 {
        gate.record_trade(closed_trade(&clock, dec!(-300)));
        clock.advance(Duration::hours(26));
    }

    let snapshot = gate.assess_risk();
    assert_eq!(snapshot.level, RiskLevel::Medium);
    assert_eq!(snapshot.action, RiskAction::ReduceSize);
    assert_eq!(snapshot.consecutive_losses, 3);
    assert_eq!(gate.position_size_multiplier(), dec!(0.5));

    // Reduced size still trades
    let (allowed, _) = gate.check_trading_allowed();
    assert!(allowed);
}

#[test]
fn test_streak_stop_and_cooldown_recovery() {
    let (mut gate, clock) = gate_with_clock();

    // Qualifying losses a day apart so the streak stop fires on its own
    for _ in 0..5 {
        gate.record_trade(closed_trade(&clock, dec!(-250)));
        clock.advance(Duration::hours(26));
    }

    let (allowed, reason) = gate.check_trading_allowed();
    assert!(!allowed);
    assert!(reason.contains("risk level"));
    let until = gate.cool_down_until().expect("cooldown stamped");
    assert_eq!(until, clock.now() + Duration::minutes(60));

    // During the window the refusal cites the cooldown itself
    clock.advance(Duration::minutes(30));
    let (allowed, reason) = gate.check_trading_allowed();
    assert!(!allowed);
    assert!(reason.contains("cooling down"));

    // The window lapses but the unbroken streak re-stamps it
    clock.advance(Duration::minutes(40));
    let (allowed, _) = gate.check_trading_allowed();
    assert!(!allowed);

    // Only a win clears the streak and reopens trading
    gate.record_trade(closed_trade(&clock, dec!(400)));
    clock.advance(Duration::minutes(70));
    let (allowed, _) = gate.check_trading_allowed();
    assert!(allowed);
    assert_eq!(gate.consecutive_losses(), 0);
}

#[test]
fn test_daily_breach_expires_with_the_window() {
    let (mut gate, clock) = gate_with_clock();

    gate.record_trade(closed_trade(&clock, dec!(-600)));
    let snapshot = gate.assess_risk();
    assert_eq!(snapshot.level, RiskLevel::High);
    assert_eq!(snapshot.action, RiskAction::CloseAll);
    assert!(gate.should_close_all());

    // 25 hours on, the loss has left the trailing day
    clock.advance(Duration::hours(25));
    let snapshot = gate.assess_risk();
    assert_eq!(snapshot.daily_pnl, dec!(0));
    assert_eq!(snapshot.action, RiskAction::Continue);
    assert!(!gate.should_close_all());
}

#[test]
fn test_weekly_warning_without_daily_breach() {
    let (mut gate, clock) = gate_with_clock();

    // Each day stays under the 500 daily limit; the trailing week
    // accumulates past 80% of the 1500 weekly limit
    for _ in 0..3 {
        gate.record_trade(closed_trade(&clock, dec!(-450)));
        clock.advance(Duration::hours(26));
    }

    let snapshot = gate.assess_risk();
    assert_eq!(snapshot.daily_pnl, dec!(0));
    assert_eq!(snapshot.weekly_pnl, dec!(-1350));
    assert_eq!(snapshot.level, RiskLevel::Medium);
    assert_eq!(snapshot.action, RiskAction::ReduceSize);
    assert!(snapshot.warnings.iter().any(|w| w.contains("weekly")));
}

#[test]
fn test_drawdown_ladder() {
    let (mut gate, _clock) = gate_with_clock();

    gate.set_balance(dec!(8400)); // 16% off peak
    let snapshot = gate.assess_risk();
    assert_eq!(snapshot.level, RiskLevel::Medium);
    assert_eq!(snapshot.action, RiskAction::ReduceSize);
    assert_eq!(gate.position_size_multiplier(), dec!(0.5));

    gate.set_balance(dec!(7900)); // 21% off peak
    let snapshot = gate.assess_risk();
    assert_eq!(snapshot.level, RiskLevel::Critical);
    assert_eq!(snapshot.action, RiskAction::EmergencyStop);
    assert_eq!(gate.position_size_multiplier(), dec!(0.1));
    assert!(gate.should_close_all());

    // Recovery above both drawdown thresholds clears the verdict
    gate.set_balance(dec!(9800));
    let snapshot = gate.assess_risk();
    assert_eq!(snapshot.level, RiskLevel::Low);
}

#[test]
fn test_hourly_cap_frees_up_as_trades_age_out() {
    let (mut gate, clock) = gate_with_clock();

    for _ in 0..10 {
        gate.record_trade(closed_trade(&clock, dec!(10)));
        clock.advance(Duration::minutes(2));
    }

    let (allowed, reason) = gate.check_trading_allowed();
    assert!(!allowed);
    assert_eq!(reason, "hourly trade cap reached");

    // 45 minutes later the earliest trades have left the trailing hour
    clock.advance(Duration::minutes(45));
    let (allowed, _) = gate.check_trading_allowed();
    assert!(allowed);
}

#[test]
fn test_history_ring_keeps_recent_trades() {
    let mut config = RiskConfig::default();
    config.history_capacity = 50;
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2025, 6, 2, 9, 0, 0).unwrap(),
    ));
    let mut gate = RiskGate::new(config, clock.clone());
    gate.initialize_balance(dec!(10000));

    for _ in 0..75 {
        gate.record_trade(closed_trade(&clock, dec!(1)));
        clock.advance(Duration::hours(1));
    }

    assert_eq!(gate.history_len(), 50);
}

#[test]
fn test_sizing_shrinks_as_capital_is_reserved() {
    let mut config = CapitalConfig::default();
    config.max_position_ratio = dec!(1);
    let mut allocator = CapitalAllocator::new(config);
    allocator.set_balance(dec!(100000));

    // Allocated 10000, max risk 200, stop 2% below entry; the risk bound
    // and the capital bound meet at 0.2
    let first = allocator.size_position("BTCUSDT", dec!(50000), Some(dec!(49000)));
    assert_eq!(first.size, dec!(0.2));
    assert!(allocator.reserve("BTCUSDT", first.notional));

    // Everything is reserved, nothing left to size against
    let second = allocator.size_position("BTCUSDT", dec!(50000), Some(dec!(49000)));
    assert!(!second.is_tradable());

    allocator.release("BTCUSDT", first.notional);
    let third = allocator.size_position("BTCUSDT", dec!(50000), Some(dec!(49000)));
    assert_eq!(third.size, first.size);
}

#[test]
fn test_unrealized_marks_feed_limit_check() {
    let mut allocator = CapitalAllocator::new(CapitalConfig::default());
    allocator.set_balance(dec!(10000));

    assert!(allocator.reserve("BTCUSDT", dec!(400)));
    allocator.mark_unrealized("BTCUSDT", dec!(-15));

    // 15 against 1000 allocated stays under the 2% limit
    let check = allocator.check_limits();
    assert!(!check.exceeded);
    assert_eq!(check.current_loss_ratio, dec!(0.015));

    allocator.mark_unrealized("BTCUSDT", dec!(-25));
    let check = allocator.check_limits();
    assert!(check.exceeded);
}
