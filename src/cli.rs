use clap::Parser;
use std::path::PathBuf;

use crate::config::{MonitorConfig, SourceKind};

/// EMA crossover signal monitor (advisory only, places no orders)
#[derive(Debug, Parser)]
#[command(name = "ema-monitor", version, about)]
pub struct Cli {
    /// Path to a TOML config file (defaults to ./ema-monitor.toml if present)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Instrument symbol (e.g. BA, XXBTZUSD)
    #[arg(short, long)]
    pub symbol: Option<String>,

    /// Short EMA window
    #[arg(long)]
    pub short_window: Option<usize>,

    /// Long EMA window
    #[arg(long)]
    pub long_window: Option<usize>,

    /// Seconds between checks
    #[arg(short = 'i', long)]
    pub interval_secs: Option<u64>,

    /// Starting cash balance used for tracking
    #[arg(long)]
    pub initial_balance: Option<f64>,

    /// Trade ledger CSV file
    #[arg(long)]
    pub ledger: Option<PathBuf>,

    /// Where to write the chart on shutdown
    #[arg(long)]
    pub chart: Option<PathBuf>,

    /// Market data provider
    #[arg(long, value_enum)]
    pub source: Option<SourceKind>,

    /// Run a single check, print the summary and exit
    #[arg(long)]
    pub once: bool,
}

impl Cli {
    /// Apply flags given on the command line over the loaded configuration
    pub fn apply_overrides(&self, config: &mut MonitorConfig) {
        if let Some(symbol) = &self.symbol {
            config.symbol = symbol.clone();
        }
        if let Some(short) = self.short_window {
            config.short_window = short;
        }
        if let Some(long) = self.long_window {
            config.long_window = long;
        }
        if let Some(interval) = self.interval_secs {
            config.poll_interval_secs = interval;
        }
        if let Some(balance) = self.initial_balance {
            config.initial_balance = balance;
        }
        if let Some(ledger) = &self.ledger {
            config.ledger_path = ledger.clone();
        }
        if let Some(chart) = &self.chart {
            config.chart_path = chart.clone();
        }
        if let Some(source) = self.source {
            config.source = source;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_only_given_flags() {
        let cli = Cli::parse_from([
            "ema-monitor",
            "--symbol",
            "XXBTZUSD",
            "--source",
            "kraken",
            "--long-window",
            "50",
            "--once",
        ]);
        let mut config = MonitorConfig::default();
        cli.apply_overrides(&mut config);

        assert_eq!(config.symbol, "XXBTZUSD");
        assert_eq!(config.source, SourceKind::Kraken);
        assert_eq!(config.long_window, 50);
        assert_eq!(config.short_window, 5);
        assert_eq!(config.initial_balance, 100.0);
        assert!(cli.once);
    }

    #[test]
    fn test_no_flags_keeps_config() {
        let cli = Cli::parse_from(["ema-monitor"]);
        let mut config = MonitorConfig::default();
        cli.apply_overrides(&mut config);

        assert_eq!(config, MonitorConfig::default());
        assert!(!cli.once);
    }
}
