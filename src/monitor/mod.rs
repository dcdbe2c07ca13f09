// Poll loop tying market data, the signal engine and reporting together
pub mod report;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::watch;
use tokio::time::Duration;

use crate::api::MarketDataSource;
use crate::chart::{self, ChartData};
use crate::config::MonitorConfig;
use crate::execution::{Decision, SignalEngine};
use crate::models::Bar;
use crate::performance::PerformanceSummary;
use crate::persistence::TradeLedger;
use crate::strategy::EmaCrossoverStrategy;

/// Waits between cycles
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Real-time sleeper backed by the tokio timer
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// What a single cycle did
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CycleOutcome {
    /// Market data unavailable; nothing evaluated
    Skipped,
    /// Not enough bars for a crossover check yet
    WarmingUp,
    /// Evaluated, no trade
    NoSignal,
    /// Trade recorded in the ledger
    Signal(Decision),
    /// A trade was due but could not be recorded; position unchanged
    LedgerWriteFailed,
}

/// Drives fetch → evaluate → report → sleep until told to stop
pub struct Monitor<S, L, Z>
where
    S: MarketDataSource,
    L: TradeLedger,
    Z: Sleeper,
{
    config: MonitorConfig,
    source: S,
    engine: SignalEngine<L>,
    sleeper: Z,
    last_bars: Vec<Bar>,
    max_cycles: Option<u64>,
}

impl<S, L, Z> Monitor<S, L, Z>
where
    S: MarketDataSource,
    L: TradeLedger,
    Z: Sleeper,
{
    /// Build the monitor, restoring position state from `ledger`
    pub fn new(config: MonitorConfig, source: S, ledger: L, sleeper: Z) -> Self {
        let strategy = EmaCrossoverStrategy::new(config.short_window, config.long_window);
        let engine = SignalEngine::restore(strategy, config.initial_balance, ledger);

        Self {
            config,
            source,
            engine,
            sleeper,
            last_bars: Vec::new(),
            max_cycles: None,
        }
    }

    /// Stop after `cycles` cycles even without a shutdown signal
    pub fn with_max_cycles(mut self, cycles: u64) -> Self {
        self.max_cycles = Some(cycles);
        self
    }

    pub fn engine(&self) -> &SignalEngine<L> {
        &self.engine
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Run one fetch/evaluate/report cycle
    ///
    /// Never fails: fetch errors skip the cycle and ledger write errors
    /// discard the decision, both logged.
    pub async fn run_cycle(&mut self) -> CycleOutcome {
        let symbol = self.config.symbol.clone();

        let bars = match self.source.fetch(&symbol, self.config.lookback_days()).await {
            Ok(bars) => bars,
            Err(e) => {
                if e.is_recoverable() {
                    tracing::warn!(error = %e, "Could not get market data. Will try again later.");
                } else {
                    tracing::error!(error = %e, "Market data source failed");
                }
                return CycleOutcome::Skipped;
            }
        };

        let evaluation = match self.engine.evaluate(&bars) {
            Ok(evaluation) => evaluation,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    "Trade decision could NOT be recorded; position left unchanged"
                );
                self.last_bars = bars;
                return CycleOutcome::LedgerWriteFailed;
            }
        };
        self.last_bars = bars;

        let Some(snapshot) = evaluation.snapshot else {
            tracing::info!(
                symbol = %symbol,
                "Collecting data... ({}/{} bars needed)",
                self.last_bars.len(),
                self.engine.strategy().min_bars_required()
            );
            return CycleOutcome::WarmingUp;
        };

        let state = self.engine.state();
        match report::signal_notice(
            evaluation.timestamp,
            &symbol,
            &evaluation.decision,
            &snapshot,
            state,
            (self.config.short_window, self.config.long_window),
        ) {
            Some(notice) => {
                tracing::info!("\n{}", notice);
                CycleOutcome::Signal(evaluation.decision)
            }
            None => {
                tracing::info!(
                    "{}",
                    report::status_line(evaluation.timestamp, &symbol, &snapshot, state)
                );
                CycleOutcome::NoSignal
            }
        }
    }

    /// Run cycles until `shutdown` flips to `true` (or its sender is dropped)
    ///
    /// The shutdown flag is checked before each cycle and interrupts the
    /// sleep between cycles. Returns the final performance summary.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) -> PerformanceSummary {
        let interval = Duration::from_secs(self.config.poll_interval_secs);
        let mut cycles = 0u64;

        loop {
            if *shutdown.borrow_and_update() {
                break;
            }

            self.run_cycle().await;
            cycles += 1;

            if self.max_cycles.is_some_and(|max| cycles >= max) {
                break;
            }

            // A new value is picked up by the check at the top of the loop
            let sender_gone = tokio::select! {
                changed = shutdown.changed() => changed.is_err(),
                _ = self.sleeper.sleep(interval) => false,
            };
            if sender_gone {
                break;
            }
        }

        tracing::info!("Stopping monitor after {} cycles. Final status:", cycles);
        self.finish()
    }

    /// Report final performance and write the chart
    pub fn finish(&self) -> PerformanceSummary {
        let state = self.engine.state();
        let trades = self.engine.ledger().all();
        let summary = PerformanceSummary::calculate(trades, state, self.config.initial_balance);

        tracing::info!("\n{}", summary);

        if !self.last_bars.is_empty() {
            let closes: Vec<f64> = self.last_bars.iter().map(|b| b.close).collect();
            let (short_ema, long_ema) = self.engine.strategy().ema_series(&closes);
            let data = ChartData {
                symbol: &self.config.symbol,
                bars: &self.last_bars,
                short_ema: &short_ema,
                long_ema: &long_ema,
                short_window: self.config.short_window,
                long_window: self.config.long_window,
                trades,
            };
            if let Err(e) =
                chart::write_chart(&self.config.chart_path, &data, self.config.chart_bars)
            {
                tracing::warn!(error = %e, "Failed to write chart");
            }
        }

        tracing::debug!(finished_at = %Utc::now(), "Monitor finished");
        summary
    }
}
