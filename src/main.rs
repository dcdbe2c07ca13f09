use anyhow::{Context, Result};
use clap::Parser;
use ema_monitor::api::{KrakenClient, MarketDataSource, YahooFinanceClient};
use ema_monitor::cli::Cli;
use ema_monitor::config::{MonitorConfig, SourceKind};
use ema_monitor::monitor::{Monitor, TokioSleeper};
use ema_monitor::persistence::CsvTradeLedger;
use tokio::sync::watch;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    setup_logging();

    let cli = Cli::parse();
    let mut config =
        MonitorConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    cli.apply_overrides(&mut config);
    config.validate()?;

    tracing::info!("{}", "=".repeat(50));
    tracing::info!("🚀 Live EMA Crossover Monitor for {}", config.symbol);
    tracing::info!("{}", "=".repeat(50));
    tracing::info!(
        "Strategy: EMA Crossover ({}/{})",
        config.short_window,
        config.long_window
    );
    tracing::info!(
        "Checking for signals every {:.1} minutes",
        config.poll_interval_secs as f64 / 60.0
    );
    tracing::info!("Trade log: {}", config.ledger_path.display());
    tracing::info!("{}", "=".repeat(50));

    let ledger = CsvTradeLedger::open(&config.ledger_path).with_context(|| {
        format!("Failed to open trade ledger {}", config.ledger_path.display())
    })?;
    if let Some(moved) = ledger.quarantined() {
        tracing::error!(
            "⚠️  Previous trade log was unreadable and moved to {}. Starting from ${:.2}.",
            moved.display(),
            config.initial_balance
        );
    }

    let source = create_source(&config)?;
    tracing::info!("Market data source: {}", source.name());

    let once = cli.once;
    let mut monitor = Monitor::new(config, source, ledger, TokioSleeper);
    if once {
        monitor = monitor.with_max_cycles(1);
    }

    let shutdown = spawn_shutdown_listener();
    monitor.run(shutdown).await;

    tracing::info!(
        "👋 Monitor stopped. Trade log saved to {}",
        monitor.config().ledger_path.display()
    );
    Ok(())
}

fn setup_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("ema_monitor=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn create_source(config: &MonitorConfig) -> Result<Box<dyn MarketDataSource>> {
    Ok(match config.source {
        SourceKind::Yahoo => {
            Box::new(YahooFinanceClient::new().with_interval(config.bar_interval.clone()))
        }
        SourceKind::Kraken => Box::new(
            KrakenClient::new().with_interval_minutes(config.interval_minutes()?),
        ),
    })
}

/// Flip the shutdown flag on Ctrl+C
fn spawn_shutdown_listener() -> watch::Receiver<bool> {
    let (tx, rx) = watch::channel(false);

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("\n⚠️  Received Ctrl+C, shutting down...");
                let _ = tx.send(true);
            }
            Err(e) => {
                tracing::warn!("Unable to listen for Ctrl+C: {}", e);
                // Keep the sender alive so the monitor keeps running
                tx.closed().await;
            }
        }
    });

    rx
}
