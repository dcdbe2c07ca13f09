use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::MonitorError;
use crate::Result;

const ENV_PREFIX: &str = "EMA_MONITOR";
const DEFAULT_CONFIG_FILE: &str = "ema-monitor.toml";

/// Which market data provider to poll
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Yahoo,
    Kraken,
}

/// Monitor configuration
///
/// Layered as: built-in defaults, then an optional TOML file, then
/// `EMA_MONITOR_*` environment variables. CLI flags are applied on top by
/// the binary.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct MonitorConfig {
    pub symbol: String,
    pub short_window: usize,
    pub long_window: usize,
    pub poll_interval_secs: u64,
    pub initial_balance: f64,
    pub ledger_path: PathBuf,
    pub chart_path: PathBuf,
    pub source: SourceKind,
    /// Days of history requested per cycle; `3 × long_window` when unset
    pub lookback_days: Option<u32>,
    /// Bar size: `1d`/`1h`/`15m` style (Kraken also accepts plain minutes)
    pub bar_interval: String,
    /// Bars shown in the shutdown chart
    pub chart_bars: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            symbol: "BA".to_string(),
            short_window: 5,
            long_window: 20,
            poll_interval_secs: 3600,
            initial_balance: 100.0,
            ledger_path: PathBuf::from("trade_signals.csv"),
            chart_path: PathBuf::from("current_market_state.svg"),
            source: SourceKind::Yahoo,
            lookback_days: None,
            bar_interval: "1d".to_string(),
            chart_bars: 60,
        }
    }
}

impl MonitorConfig {
    /// Load from defaults, `file` (or `ema-monitor.toml` if present) and the environment
    ///
    /// An explicitly named file must exist.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        Self::load_with_env(file, Environment::with_prefix(ENV_PREFIX).try_parsing(true))
    }

    fn load_with_env(file: Option<&Path>, env: Environment) -> Result<Self> {
        let defaults = Self::default();

        let file_source = match file {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let config: MonitorConfig = Config::builder()
            .set_default("symbol", defaults.symbol)?
            .set_default("short_window", defaults.short_window as u64)?
            .set_default("long_window", defaults.long_window as u64)?
            .set_default("poll_interval_secs", defaults.poll_interval_secs)?
            .set_default("initial_balance", defaults.initial_balance)?
            .set_default("ledger_path", defaults.ledger_path.to_string_lossy().to_string())?
            .set_default("chart_path", defaults.chart_path.to_string_lossy().to_string())?
            .set_default("source", "yahoo")?
            .set_default("bar_interval", defaults.bar_interval)?
            .set_default("chart_bars", defaults.chart_bars as u64)?
            .add_source(file_source)
            .add_source(env)
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Reject settings the strategy cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.symbol.trim().is_empty() {
            return Err(MonitorError::Config("symbol must not be empty".to_string()));
        }
        if self.short_window == 0 || self.long_window == 0 {
            return Err(MonitorError::Config(
                "EMA windows must be positive".to_string(),
            ));
        }
        if self.short_window >= self.long_window {
            return Err(MonitorError::Config(format!(
                "short window ({}) must be less than long window ({})",
                self.short_window, self.long_window
            )));
        }
        if self.poll_interval_secs == 0 {
            return Err(MonitorError::Config(
                "poll interval must be positive".to_string(),
            ));
        }
        if !(self.initial_balance.is_finite() && self.initial_balance > 0.0) {
            return Err(MonitorError::Config(format!(
                "initial balance must be a positive amount, got {}",
                self.initial_balance
            )));
        }
        if self.lookback_days == Some(0) {
            return Err(MonitorError::Config(
                "lookback days must be positive".to_string(),
            ));
        }
        if self.source == SourceKind::Kraken {
            self.interval_minutes()?;
        }
        Ok(())
    }

    /// Days of history to request each cycle
    pub fn lookback_days(&self) -> u32 {
        self.lookback_days
            .unwrap_or_else(|| (self.long_window as u32).saturating_mul(3))
    }

    /// Bar interval in minutes (`60`, `15m`, `4h`, `1d`)
    pub fn interval_minutes(&self) -> Result<u32> {
        let raw = self.bar_interval.trim();
        let invalid = || MonitorError::Config(format!("invalid bar interval '{}'", raw));

        let (digits, multiplier) = match raw.chars().last() {
            Some('m') => (&raw[..raw.len() - 1], 1),
            Some('h') => (&raw[..raw.len() - 1], 60),
            Some('d') => (&raw[..raw.len() - 1], 1440),
            _ => (raw, 1),
        };

        let value: u32 = digits.parse().map_err(|_| invalid())?;
        if value == 0 {
            return Err(invalid());
        }
        value.checked_mul(multiplier).ok_or_else(invalid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::fs;

    fn env(vars: &[(&str, &str)]) -> Environment {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Environment::with_prefix(ENV_PREFIX)
            .try_parsing(true)
            .source(Some(map))
    }

    #[test]
    fn test_defaults() {
        let config = MonitorConfig::load_with_env(None, env(&[])).unwrap();

        assert_eq!(config, MonitorConfig::default());
        assert_eq!(config.lookback_days(), 60);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_file_then_env_override() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("monitor.toml");
        fs::write(
            &path,
            "symbol = \"AAPL\"\nshort_window = 8\nlong_window = 21\ninitial_balance = 250.5\n",
        )
        .unwrap();

        let config = MonitorConfig::load_with_env(
            Some(&path),
            env(&[("EMA_MONITOR_LONG_WINDOW", "30"), ("EMA_MONITOR_SOURCE", "kraken")]),
        )
        .unwrap();

        assert_eq!(config.symbol, "AAPL");
        assert_eq!(config.short_window, 8);
        assert_eq!(config.long_window, 30);
        assert_eq!(config.initial_balance, 250.5);
        assert_eq!(config.source, SourceKind::Kraken);
        assert_eq!(config.poll_interval_secs, 3600);
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let result =
            MonitorConfig::load_with_env(Some(Path::new("/nonexistent/monitor.toml")), env(&[]));
        assert!(matches!(result, Err(MonitorError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_bad_windows() {
        let config = MonitorConfig {
            short_window: 20,
            long_window: 20,
            ..MonitorConfig::default()
        };
        assert!(config.validate().is_err());

        let config = MonitorConfig {
            short_window: 0,
            ..MonitorConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_balance_and_interval() {
        let config = MonitorConfig {
            initial_balance: 0.0,
            ..MonitorConfig::default()
        };
        assert!(config.validate().is_err());

        let config = MonitorConfig {
            initial_balance: f64::NAN,
            ..MonitorConfig::default()
        };
        assert!(config.validate().is_err());

        let config = MonitorConfig {
            poll_interval_secs: 0,
            ..MonitorConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_interval_minutes() {
        let with = |interval: &str| MonitorConfig {
            bar_interval: interval.to_string(),
            ..MonitorConfig::default()
        };

        assert_eq!(with("60").interval_minutes().unwrap(), 60);
        assert_eq!(with("15m").interval_minutes().unwrap(), 15);
        assert_eq!(with("4h").interval_minutes().unwrap(), 240);
        assert_eq!(with("1d").interval_minutes().unwrap(), 1440);
        assert!(with("fast").interval_minutes().is_err());
        assert!(with("0h").interval_minutes().is_err());
    }

    #[test]
    fn test_explicit_lookback() {
        let config = MonitorConfig {
            lookback_days: Some(10),
            ..MonitorConfig::default()
        };
        assert_eq!(config.lookback_days(), 10);
    }
}
