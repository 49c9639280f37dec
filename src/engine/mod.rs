//! Orchestration module
//!
//! Lifecycle, gated order flow, and verdict enforcement

mod orchestrator;
mod types;

pub use orchestrator::TradingOrchestrator;
pub use types::{
    BalanceInfo, EngineError, EngineStatus, ExecutedTrade, Lifecycle, OpenPosition, TradeOutcome,
};
