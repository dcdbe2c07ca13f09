use chrono::{DateTime, Utc};

use crate::execution::{Decision, EngineState};
use crate::strategy::EmaSnapshot;

/// One-line status shown when a cycle produces no signal
pub fn status_line(
    timestamp: DateTime<Utc>,
    symbol: &str,
    snapshot: &EmaSnapshot,
    state: &EngineState,
) -> String {
    format!(
        "[{}] {}: ${:.2} | Short EMA: {:.2} | Long EMA: {:.2} | {} | Balance: ${:.2}",
        timestamp.format("%Y-%m-%d %H:%M:%S"),
        symbol,
        state.last_price,
        snapshot.short,
        snapshot.long,
        state.position,
        state.balance
    )
}

/// Multi-line notice for a BUY or SELL decision
///
/// Returns `None` for `Decision::None`.
pub fn signal_notice(
    timestamp: DateTime<Utc>,
    symbol: &str,
    decision: &Decision,
    snapshot: &EmaSnapshot,
    state: &EngineState,
    windows: (usize, usize),
) -> Option<String> {
    let headline = match decision {
        Decision::Buy { price, shares } => format!(
            "🟢 BUY SIGNAL at {:.2} on {}\n    Buy {:.6} shares of {}",
            price,
            timestamp.format("%Y-%m-%d %H:%M:%S"),
            shares,
            symbol
        ),
        Decision::Sell { price, proceeds } => format!(
            "🔴 SELL SIGNAL at {:.2} on {}\n    Sell all {} shares for ${:.2}",
            price,
            timestamp.format("%Y-%m-%d %H:%M:%S"),
            symbol,
            proceeds
        ),
        Decision::None => return None,
    };

    let mut notice = format!(
        "{}\n    Execute this trade manually in your brokerage account!\n\
         Signal Details:\n    Short EMA ({}): {:.2}\n    Long EMA ({}): {:.2}\n    \
         Current Position: {}\n    Balance: ${:.2}",
        headline, windows.0, snapshot.short, windows.1, snapshot.long, state.position, state.balance
    );
    if state.shares > 0.0 {
        notice.push_str(&format!("\n    Current Value: ${:.2}", state.current_value()));
    }

    Some(notice)
}
