// Trading strategy module
pub mod crossover;

pub use crossover::{detect_crossover, Crossover, EmaCrossoverStrategy, EmaSnapshot};
