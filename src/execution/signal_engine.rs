use chrono::{DateTime, Utc};

use crate::models::{Bar, Position, TradeAction, TradeRecord};
use crate::persistence::TradeLedger;
use crate::strategy::{Crossover, EmaCrossoverStrategy, EmaSnapshot};
use crate::Result;

/// Position bookkeeping owned by the signal engine
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineState {
    pub position: Position,
    pub shares: f64,
    pub balance: f64,
    pub last_price: f64,
}

impl EngineState {
    /// Fresh state: all cash, nothing held
    pub fn flat(balance: f64) -> Self {
        Self {
            position: Position::Flat,
            shares: 0.0,
            balance,
            last_price: 0.0,
        }
    }

    /// Rebuild state from the last ledger record
    pub fn from_record(record: &TradeRecord) -> Self {
        match record.action {
            TradeAction::Buy => Self {
                position: Position::Holding,
                shares: record.shares,
                balance: 0.0,
                last_price: record.price,
            },
            TradeAction::Sell => Self {
                position: Position::Flat,
                shares: 0.0,
                balance: record.balance,
                last_price: record.price,
            },
        }
    }

    /// FLAT holds cash and no shares, HOLDING holds shares and no cash
    pub fn is_consistent(&self) -> bool {
        match self.position {
            Position::Flat => self.shares == 0.0 && self.balance.is_finite() && self.balance > 0.0,
            Position::Holding => {
                self.shares.is_finite() && self.shares > 0.0 && self.balance == 0.0
            }
        }
    }

    /// Mark-to-market value at the last observed price
    pub fn current_value(&self) -> f64 {
        match self.position {
            Position::Holding => self.shares * self.last_price,
            Position::Flat => self.balance,
        }
    }
}

/// Outcome of one evaluation
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Decision {
    Buy { price: f64, shares: f64 },
    Sell { price: f64, proceeds: f64 },
    None,
}

impl Decision {
    pub fn is_trade(&self) -> bool {
        !matches!(self, Decision::None)
    }
}

/// Decision plus the indicator values it was based on
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluation {
    pub decision: Decision,
    pub snapshot: Option<EmaSnapshot>,
    pub timestamp: DateTime<Utc>,
}

/// Converts a bar history into BUY/SELL/NONE decisions
///
/// State changes and ledger appends happen together: a decision is only
/// applied to the in-memory state after the ledger has durably recorded it.
pub struct SignalEngine<L: TradeLedger> {
    strategy: EmaCrossoverStrategy,
    ledger: L,
    state: EngineState,
}

impl<L: TradeLedger> SignalEngine<L> {
    /// Create an engine, replaying the ledger's last record if there is one
    pub fn restore(strategy: EmaCrossoverStrategy, initial_balance: f64, ledger: L) -> Self {
        let state = match ledger.load_last() {
            Some(last) => {
                let state = EngineState::from_record(&last);
                tracing::info!(
                    "Restored {} position from last {} at ${:.2} (shares: {:.6}, balance: ${:.2})",
                    state.position,
                    last.action,
                    last.price,
                    state.shares,
                    state.balance
                );
                state
            }
            None => EngineState::flat(initial_balance),
        };

        Self {
            strategy,
            ledger,
            state,
        }
    }

    pub fn state(&self) -> &EngineState {
        &self.state
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn strategy(&self) -> &EmaCrossoverStrategy {
        &self.strategy
    }

    /// Evaluate the latest bars, timestamping any trade with the current time
    pub fn evaluate(&mut self, bars: &[Bar]) -> Result<Evaluation> {
        self.evaluate_at(bars, Utc::now())
    }

    /// Evaluate the latest bars, timestamping any trade with `now`
    ///
    /// Fewer than two bars is a normal warm-up condition and yields
    /// `Decision::None`. If the ledger append fails, the error is returned
    /// and the position is left exactly as it was.
    pub fn evaluate_at(&mut self, bars: &[Bar], now: DateTime<Utc>) -> Result<Evaluation> {
        if let Some(last) = bars.last() {
            self.state.last_price = last.close;
        }

        let Some(snapshot) = self.strategy.analyze(bars) else {
            tracing::debug!(
                "Warming up: {} bars, need {}",
                bars.len(),
                self.strategy.min_bars_required()
            );
            return Ok(Evaluation {
                decision: Decision::None,
                snapshot: None,
                timestamp: now,
            });
        };

        let price = self.state.last_price;
        let next = match (snapshot.crossover, self.state.position) {
            (Some(Crossover::Bullish), Position::Flat) => Some(EngineState {
                position: Position::Holding,
                shares: self.state.balance / price,
                balance: 0.0,
                last_price: price,
            }),
            (Some(Crossover::Bearish), Position::Holding) => Some(EngineState {
                position: Position::Flat,
                shares: 0.0,
                balance: self.state.shares * price,
                last_price: price,
            }),
            _ => None,
        };

        // A trade at a bad price would leave a position that cannot be replayed
        let next = next.filter(|next| {
            let valid = price.is_finite() && price > 0.0 && next.is_consistent();
            if !valid {
                tracing::warn!(
                    "Ignoring {} cross at invalid price {}",
                    if next.position == Position::Holding { "bullish" } else { "bearish" },
                    price
                );
            }
            valid
        });

        let Some(next) = next else {
            return Ok(Evaluation {
                decision: Decision::None,
                snapshot: Some(snapshot),
                timestamp: now,
            });
        };

        let (action, decision) = match next.position {
            Position::Holding => (
                TradeAction::Buy,
                Decision::Buy {
                    price,
                    shares: next.shares,
                },
            ),
            Position::Flat => (
                TradeAction::Sell,
                Decision::Sell {
                    price,
                    proceeds: next.balance,
                },
            ),
        };

        self.ledger.append(TradeRecord {
            timestamp: now,
            action,
            price,
            shares: next.shares,
            balance: next.balance,
        })?;

        self.state = next;
        debug_assert!(self.state.is_consistent());

        Ok(Evaluation {
            decision,
            snapshot: Some(snapshot),
            timestamp: now,
        })
    }
}
