//! CLI interface for riskgate
//!
//! Provides subcommands for:
//! - `run`: Drive a paper trading session through the engine
//! - `status`: Show current state
//! - `config`: Show configuration

mod run;

pub use run::RunArgs;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "riskgate")]
#[command(about = "Capital allocation and risk-gating engine for automated trading")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Drive a paper trading session through the engine
    Run(RunArgs),
    /// Show current state
    Status,
    /// Show configuration
    Config,
}
