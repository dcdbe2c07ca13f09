use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::http::JsonHttpClient;
use super::MarketDataSource;
use crate::error::MonitorError;
use crate::models::Bar;
use crate::Result;

const YAHOO_API_BASE: &str = "https://query1.finance.yahoo.com";
const RATE_LIMIT_RPM: u32 = 30;

/// Yahoo Finance chart API client (daily or intraday bars for equities)
#[derive(Clone)]
pub struct YahooFinanceClient {
    http: JsonHttpClient,
    base_url: String,
    interval: String,
}

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<Quote>,
}

// Yahoo pads missing values with nulls
#[derive(Debug, Deserialize, Default)]
struct Quote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

impl YahooFinanceClient {
    pub fn new() -> Self {
        Self::with_base_url(YAHOO_API_BASE)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            http: JsonHttpClient::new("Yahoo Finance", RATE_LIMIT_RPM),
            base_url: base_url.into(),
            interval: "1d".to_string(),
        }
    }

    /// Bar size, e.g. `1d`, `1h`, `15m`
    pub fn with_interval(mut self, interval: impl Into<String>) -> Self {
        self.interval = interval.into();
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.http = self.http.with_max_retries(max_retries);
        self
    }

    fn to_bars(result: ChartResult) -> Vec<Bar> {
        let quote = result.indicators.quote.into_iter().next().unwrap_or_default();
        let at = |values: &[Option<f64>], i: usize| values.get(i).copied().flatten();

        let bars = result
            .timestamp
            .iter()
            .enumerate()
            .filter_map(|(i, &ts)| {
                let timestamp = DateTime::<Utc>::from_timestamp(ts, 0)?;
                let close = at(&quote.close, i)?;
                Some(Bar {
                    timestamp,
                    open: at(&quote.open, i).unwrap_or(close),
                    high: at(&quote.high, i).unwrap_or(close),
                    low: at(&quote.low, i).unwrap_or(close),
                    close,
                    volume: at(&quote.volume, i).unwrap_or(0.0),
                })
            })
            .collect();

        Bar::normalize(bars)
    }
}

impl Default for YahooFinanceClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MarketDataSource for YahooFinanceClient {
    async fn fetch(&self, symbol: &str, lookback_days: u32) -> Result<Vec<Bar>> {
        let url = format!("{}/v8/finance/chart/{}", self.base_url, symbol);
        let query = [
            ("range", format!("{}d", lookback_days)),
            ("interval", self.interval.clone()),
        ];

        let fetch_error = |reason: String| MonitorError::DataFetch {
            symbol: symbol.to_string(),
            reason,
        };

        let response: ChartResponse = self.http.get_json(&url, &query).await.map_err(fetch_error)?;

        if let Some(err) = response.chart.error {
            return Err(fetch_error(format!("{}: {}", err.code, err.description)));
        }

        let result = response
            .chart
            .result
            .and_then(|r| r.into_iter().next())
            .ok_or_else(|| fetch_error("empty chart result".to_string()))?;

        let bars = Self::to_bars(result);
        tracing::debug!("Fetched {} bars for {} from Yahoo Finance", bars.len(), symbol);

        Ok(bars)
    }

    fn name(&self) -> &str {
        "yahoo"
    }
}
