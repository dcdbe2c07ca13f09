// Signal evaluation and position bookkeeping
pub mod signal_engine;

pub use signal_engine::{Decision, EngineState, Evaluation, SignalEngine};
