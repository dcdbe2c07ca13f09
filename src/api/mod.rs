use async_trait::async_trait;

use crate::models::Bar;
use crate::Result;

pub mod http;
pub mod kraken;
pub mod yahoo;

pub use http::JsonHttpClient;
pub use kraken::KrakenClient;
pub use yahoo::YahooFinanceClient;

/// Supplier of OHLCV history for one symbol
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// Bars covering the last `lookback_days`, oldest first, no duplicate timestamps
    ///
    /// Failures are returned as [`crate::MonitorError::DataFetch`].
    async fn fetch(&self, symbol: &str, lookback_days: u32) -> Result<Vec<Bar>>;

    /// Short provider name for logs
    fn name(&self) -> &str;
}

#[async_trait]
impl<T: MarketDataSource + ?Sized> MarketDataSource for Box<T> {
    async fn fetch(&self, symbol: &str, lookback_days: u32) -> Result<Vec<Bar>> {
        (**self).fetch(symbol, lookback_days).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
