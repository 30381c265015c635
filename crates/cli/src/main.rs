use clap::{Parser, Subcommand};

mod commands;

use commands::{FreshnessArgs, IndicatorsArgs, RunArgs};

#[derive(Parser)]
#[command(name = "mirror-market")]
#[command(about = "Commodity market-data ingestion and daily briefing", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest every configured layer and print the daily briefing
    Run(RunArgs),
    /// Show the last successful ingestion of each configured layer
    Freshness(FreshnessArgs),
    /// Print the latest indicators and recent signals of a price CSV
    Indicators(IndicatorsArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so the briefing on stdout stays clean
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Run(args) => commands::run_briefing(args).await?,
        Commands::Freshness(args) => commands::run_freshness(&args)?,
        Commands::Indicators(args) => commands::run_indicators(&args)?,
    }

    Ok(())
}
