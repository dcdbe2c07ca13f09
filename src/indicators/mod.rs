// Technical indicators module
// Implements the EMA used by the crossover strategy

pub mod moving_average;

pub use moving_average::{calculate_ema_series, EmaState};
