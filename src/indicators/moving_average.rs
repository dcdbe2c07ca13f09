/// Running exponential moving average
///
/// Seeded with the first price, then `ema = alpha * price + (1 - alpha) * ema`
/// with `alpha = 2 / (period + 1)`, evaluated as `ema + alpha * (price - ema)`
/// so a constant series stays exactly constant. Feeding prices one at a time produces
/// exactly the values of [`calculate_ema_series`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EmaState {
    alpha: f64,
    value: Option<f64>,
}

impl EmaState {
    pub fn new(period: usize) -> Self {
        Self {
            alpha: 2.0 / (period as f64 + 1.0),
            value: None,
        }
    }

    /// Feed the next price and return the updated average
    pub fn update(&mut self, price: f64) -> f64 {
        let next = match self.value {
            None => price,
            Some(prev) => prev + self.alpha * (price - prev),
        };
        self.value = Some(next);
        next
    }

    /// Current average, `None` until the first price arrives
    pub fn value(&self) -> Option<f64> {
        self.value
    }
}

/// Calculate the Exponential Moving Average (EMA) series
///
/// Output has one value per input price.
pub fn calculate_ema_series(prices: &[f64], period: usize) -> Vec<f64> {
    let mut state = EmaState::new(period);
    prices.iter().map(|&price| state.update(price)).collect()
}
