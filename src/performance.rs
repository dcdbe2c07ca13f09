use std::fmt;

use crate::execution::EngineState;
use crate::models::{TradeAction, TradeRecord};

/// Performance of the strategy since the initial balance
#[derive(Debug, Clone, PartialEq)]
pub struct PerformanceSummary {
    pub initial_balance: f64,
    pub current_value: f64,
    pub profit: f64,
    pub roi_pct: f64,
    pub total_trades: usize,
    pub buys: usize,
    pub sells: usize,
}

impl PerformanceSummary {
    /// Value the current position at its last observed price and count trades
    pub fn calculate(trades: &[TradeRecord], state: &EngineState, initial_balance: f64) -> Self {
        let current_value = state.current_value();
        let profit = current_value - initial_balance;
        let roi_pct = if initial_balance > 0.0 {
            (profit / initial_balance) * 100.0
        } else {
            0.0
        };

        let buys = trades.iter().filter(|t| t.action == TradeAction::Buy).count();
        let sells = trades.iter().filter(|t| t.action == TradeAction::Sell).count();

        Self {
            initial_balance,
            current_value,
            profit,
            roi_pct,
            total_trades: buys + sells,
            buys,
            sells,
        }
    }
}

impl fmt::Display for PerformanceSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Performance Summary:")?;
        writeln!(f, "  Initial Balance: ${:.2}", self.initial_balance)?;
        writeln!(f, "  Current Value: ${:.2}", self.current_value)?;
        writeln!(f, "  Profit: ${:.2}", self.profit)?;
        writeln!(f, "  ROI: {:.2}%", self.roi_pct)?;
        write!(
            f,
            "  Total Trades: {} (Buys: {}, Sells: {})",
            self.total_trades, self.buys, self.sells
        )
    }
}
