use clap::Parser;
use poly_mirror::cli::{Cli, Commands};
use poly_mirror::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(&cli.config).unwrap_or_else(|e| {
        eprintln!("Warning: Could not load config from {}: {}", cli.config, e);
        eprintln!("Using default configuration");
        Config::default()
    });

    // Initialize telemetry
    let _guard = poly_mirror::telemetry::init_telemetry(&config.telemetry)?;

    match cli.command {
        Commands::Run(args) => {
            tracing::info!("Starting live mirroring engine");
            args.execute(&config).await?;
        }
        Commands::Pause(args) => {
            args.execute(&config).await?;
        }
        Commands::Resume(args) => {
            args.execute(&config).await?;
        }
        Commands::Cancel(args) => {
            args.execute(&config).await?;
        }
        Commands::Status(args) => {
            args.execute(&config).await?;
        }
        Commands::Config => {
            println!("Current configuration:");
            println!("  Exchange: {}", config.exchange.clob_base_url);
            println!("  Market data: {}", config.market.gamma_base_url);
            println!(
                "  Jobs: sync={}s reconcile={}s risk={}s signals={}s",
                config.jobs.sync_interval_secs,
                config.jobs.reconcile_interval_secs,
                config.jobs.risk_interval_secs,
                config.jobs.signal_interval_secs
            );
            println!("  Seeded strategies: {}", config.strategies.len());
        }
    }

    Ok(())
}
