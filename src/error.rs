use std::path::PathBuf;

/// Errors raised by the monitor and its collaborators.
///
/// The variants follow how each failure is recovered from:
/// - `DataFetch` skips the current cycle; the next tick retries.
/// - `LedgerCorrupt` resets history to empty after quarantining the file.
/// - `LedgerWrite` discards the pending decision; position state is untouched.
#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    #[error("failed to fetch market data for {symbol}: {reason}")]
    DataFetch { symbol: String, reason: String },

    #[error("trade ledger {} is corrupt: {reason}", .path.display())]
    LedgerCorrupt { path: PathBuf, reason: String },

    #[error("failed to append to trade ledger {}: {reason}", .path.display())]
    LedgerWrite { path: PathBuf, reason: String },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

impl MonitorError {
    /// True for failures after which the poll loop simply moves on to the next cycle.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            MonitorError::DataFetch { .. }
                | MonitorError::LedgerCorrupt { .. }
                | MonitorError::Http(_)
        )
    }
}

impl From<config::ConfigError> for MonitorError {
    fn from(err: config::ConfigError) -> Self {
        MonitorError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_failure_is_recoverable() {
        let err = MonitorError::DataFetch {
            symbol: "BA".to_string(),
            reason: "timeout".to_string(),
        };
        assert!(err.is_recoverable());
        assert_eq!(
            err.to_string(),
            "failed to fetch market data for BA: timeout"
        );
    }

    #[test]
    fn test_ledger_write_failure_is_not_recoverable() {
        let err = MonitorError::LedgerWrite {
            path: PathBuf::from("trades.csv"),
            reason: "disk full".to_string(),
        };
        assert!(!err.is_recoverable());
        assert!(err.to_string().contains("trades.csv"));
    }
}
