use crate::indicators::calculate_ema_series;
use crate::models::Bar;

/// Direction of an EMA crossover
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Crossover {
    /// Short EMA moved from at-or-below to strictly above the long EMA
    Bullish,
    /// Short EMA moved from at-or-above to strictly below the long EMA
    Bearish,
}

/// Detect a crossover between the previous and current EMA pairs
///
/// Equality on the current pair never fires. Equality on the previous pair
/// counts as "not yet crossed", so a signal fires on the first bar where the
/// strict inequality holds.
pub fn detect_crossover(
    prev_short: f64,
    prev_long: f64,
    cur_short: f64,
    cur_long: f64,
) -> Option<Crossover> {
    if cur_short > cur_long && prev_short <= prev_long {
        Some(Crossover::Bullish)
    } else if cur_short < cur_long && prev_short >= prev_long {
        Some(Crossover::Bearish)
    } else {
        None
    }
}

/// Last two points of both EMA series plus the crossover they form
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EmaSnapshot {
    pub prev_short: f64,
    pub prev_long: f64,
    pub short: f64,
    pub long: f64,
    pub crossover: Option<Crossover>,
}

/// Dual-EMA crossover strategy
///
/// EMAs are recomputed over the full bar history on every call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmaCrossoverStrategy {
    pub short_window: usize,
    pub long_window: usize,
}

impl EmaCrossoverStrategy {
    pub fn new(short_window: usize, long_window: usize) -> Self {
        Self {
            short_window,
            long_window,
        }
    }

    /// Minimum bars needed to compare two consecutive EMA points
    pub fn min_bars_required(&self) -> usize {
        2
    }

    /// Compute both EMA series and inspect their last two points
    ///
    /// Returns `None` during warm-up (fewer than two bars).
    pub fn analyze(&self, bars: &[Bar]) -> Option<EmaSnapshot> {
        if bars.len() < self.min_bars_required() {
            return None;
        }

        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let (short_series, long_series) = self.ema_series(&closes);

        let n = closes.len();
        let (prev_short, short) = (short_series[n - 2], short_series[n - 1]);
        let (prev_long, long) = (long_series[n - 2], long_series[n - 1]);

        Some(EmaSnapshot {
            prev_short,
            prev_long,
            short,
            long,
            crossover: detect_crossover(prev_short, prev_long, short, long),
        })
    }

    /// Short and long EMA series over the given closes
    pub fn ema_series(&self, closes: &[f64]) -> (Vec<f64>, Vec<f64>) {
        (
            calculate_ema_series(closes, self.short_window),
            calculate_ema_series(closes, self.long_window),
        )
    }
}
