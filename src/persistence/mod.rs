// Durable trade history
pub mod ledger;

pub use ledger::{CsvTradeLedger, MemoryLedger, TradeLedger};
