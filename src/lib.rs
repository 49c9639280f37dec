//! riskgate: capital allocation and risk gating for automated trading
//!
//! This library provides the core components for:
//! - Position sizing bounded by a per-trade risk budget
//! - Capital reservation tracking per instrument
//! - Risk classification from P&L, drawdown, and loss streaks
//! - Verdict enforcement up to emergency liquidation
//! - Mockable exchange collaborator traits with a paper implementation

pub mod capital;
pub mod cli;
pub mod clock;
pub mod config;
pub mod engine;
pub mod exchange;
pub mod risk;
pub mod telemetry;
