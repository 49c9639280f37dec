use clap::Parser;
use riskgate::cli::{Cli, Commands};
use riskgate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(&cli.config).unwrap_or_else(|e| {
        eprintln!("Warning: Could not load config from {}: {}", cli.config, e);
        eprintln!("Using default configuration");
        toml::from_str(include_str!("../config.toml.example")).expect("Invalid default config")
    });

    // Initialize telemetry
    riskgate::telemetry::init_telemetry(&config.telemetry)?;

    match cli.command {
        Commands::Run(args) => {
            tracing::info!("Starting paper session");
            args.execute(&config).await?;
        }
        Commands::Status => {
            println!("riskgate status");
            println!("  Instrument: {}", config.engine.instrument);
            println!("  Status: Not running");
        }
        Commands::Config => {
            println!("Current configuration:");
            println!("  Instrument: {}", config.engine.instrument);
            println!(
                "  Capital: ratio={}, max loss={}, max position={}",
                config.capital.capital_ratio,
                config.capital.max_loss_ratio,
                config.capital.max_position_ratio
            );
            println!(
                "  Risk: max drawdown={}, max streak={}, daily loss={}",
                config.risk.max_drawdown_ratio,
                config.risk.max_consecutive_losses,
                config.risk.max_daily_loss_ratio
            );
        }
    }

    Ok(())
}
