// Core modules
pub mod api;
pub mod chart;
pub mod cli;
pub mod config;
pub mod error;
pub mod execution;
pub mod indicators;
pub mod models;
pub mod monitor;
pub mod performance;
pub mod persistence;
pub mod strategy;

// Re-export commonly used types
pub use api::MarketDataSource;
pub use config::MonitorConfig;
pub use error::MonitorError;
pub use models::*;
pub use monitor::Monitor;

// Error handling
pub type Result<T> = std::result::Result<T, MonitorError>;
