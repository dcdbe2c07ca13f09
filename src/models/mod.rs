use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// OHLCV bar for the monitored instrument
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    /// Sort bars oldest first and drop repeated timestamps (last one wins)
    pub fn normalize(mut bars: Vec<Bar>) -> Vec<Bar> {
        bars.sort_by_key(|b| b.timestamp);

        let mut normalized: Vec<Bar> = Vec::with_capacity(bars.len());
        for bar in bars {
            match normalized.last_mut() {
                Some(prev) if prev.timestamp == bar.timestamp => *prev = bar,
                _ => normalized.push(bar),
            }
        }
        normalized
    }
}

/// Action recorded in the trade ledger
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeAction {
    Buy,
    Sell,
}

impl fmt::Display for TradeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeAction::Buy => write!(f, "BUY"),
            TradeAction::Sell => write!(f, "SELL"),
        }
    }
}

/// One executed (advisory) trade decision
///
/// `shares` and `balance` are the holdings *after* the trade, so the last
/// record alone is enough to rebuild the position.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TradeRecord {
    pub timestamp: DateTime<Utc>,
    pub action: TradeAction,
    pub price: f64,
    pub shares: f64,
    pub balance: f64,
}

/// Whether the strategy holds the instrument or cash
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Position {
    Flat,
    Holding,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Position::Flat => write!(f, "CASH"),
            Position::Holding => write!(f, "HOLDING"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn bar(day: u32, close: f64) -> Bar {
        Bar {
            timestamp: Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap(),
            open: close,
            high: close,
            low: close,
            close,
            volume: 1000.0,
        }
    }

    #[test]
    fn test_normalize_sorts_and_dedups() {
        let bars = vec![bar(3, 12.0), bar(1, 10.0), bar(2, 11.0), bar(3, 13.0)];
        let normalized = Bar::normalize(bars);

        let closes: Vec<f64> = normalized.iter().map(|b| b.close).collect();
        assert_eq!(closes, vec![10.0, 11.0, 13.0]);
    }

    #[test]
    fn test_trade_action_display() {
        assert_eq!(TradeAction::Buy.to_string(), "BUY");
        assert_eq!(TradeAction::Sell.to_string(), "SELL");
    }

    #[test]
    fn test_position_display() {
        assert_eq!(Position::Flat.to_string(), "CASH");
        assert_eq!(Position::Holding.to_string(), "HOLDING");
    }
}
