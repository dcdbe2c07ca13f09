use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

use super::http::JsonHttpClient;
use super::MarketDataSource;
use crate::error::MonitorError;
use crate::models::Bar;
use crate::Result;

const KRAKEN_API_BASE: &str = "https://api.kraken.com";
const RATE_LIMIT_RPM: u32 = 60;

/// Kraken public OHLC client (crypto pairs such as `XXBTZUSD`)
#[derive(Clone)]
pub struct KrakenClient {
    http: JsonHttpClient,
    base_url: String,
    interval_minutes: u32,
}

#[derive(Debug, Deserialize)]
struct OhlcResponse {
    #[serde(default)]
    error: Vec<String>,
    result: Option<HashMap<String, Value>>,
}

impl KrakenClient {
    pub fn new() -> Self {
        Self::with_base_url(KRAKEN_API_BASE)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            http: JsonHttpClient::new("Kraken", RATE_LIMIT_RPM),
            base_url: base_url.into(),
            interval_minutes: 60,
        }
    }

    /// Bar size in minutes (1, 5, 15, 30, 60, 240, 1440, ...)
    pub fn with_interval_minutes(mut self, interval_minutes: u32) -> Self {
        self.interval_minutes = interval_minutes;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.http = self.http.with_max_retries(max_retries);
        self
    }

    /// Parse one `[time, open, high, low, close, vwap, volume, count]` row
    ///
    /// Kraken encodes prices and volume as strings.
    fn parse_row(row: &Value) -> Option<Bar> {
        let fields = row.as_array()?;
        let number = |i: usize| -> Option<f64> {
            match fields.get(i)? {
                Value::String(s) => s.parse().ok(),
                Value::Number(n) => n.as_f64(),
                _ => None,
            }
        };

        Some(Bar {
            timestamp: DateTime::<Utc>::from_timestamp(fields.first()?.as_i64()?, 0)?,
            open: number(1)?,
            high: number(2)?,
            low: number(3)?,
            close: number(4)?,
            volume: number(6).unwrap_or(0.0),
        })
    }
}

impl Default for KrakenClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MarketDataSource for KrakenClient {
    async fn fetch(&self, symbol: &str, lookback_days: u32) -> Result<Vec<Bar>> {
        let url = format!("{}/0/public/OHLC", self.base_url);
        let since = Utc::now() - Duration::days(i64::from(lookback_days));
        let query = [
            ("pair", symbol.to_string()),
            ("interval", self.interval_minutes.to_string()),
            ("since", since.timestamp().to_string()),
        ];

        let fetch_error = |reason: String| MonitorError::DataFetch {
            symbol: symbol.to_string(),
            reason,
        };

        let response: OhlcResponse = self.http.get_json(&url, &query).await.map_err(fetch_error)?;

        if !response.error.is_empty() {
            return Err(fetch_error(response.error.join("; ")));
        }

        // Result holds the pair's rows plus a numeric "last" cursor
        let rows = response
            .result
            .and_then(|result| {
                result
                    .into_iter()
                    .find(|(key, value)| key != "last" && value.is_array())
                    .map(|(_, value)| value)
            })
            .ok_or_else(|| fetch_error("no OHLC rows in response".to_string()))?;

        let bars: Vec<Bar> = rows
            .as_array()
            .map(|rows| rows.iter().filter_map(Self::parse_row).collect())
            .unwrap_or_default();

        tracing::debug!("Fetched {} bars for {} from Kraken", bars.len(), symbol);

        Ok(Bar::normalize(bars))
    }

    fn name(&self) -> &str {
        "kraken"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    #[tokio::test]
    async fn test_fetch_parses_string_prices() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/0/public/OHLC")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("pair".into(), "XXBTZUSD".into()),
                Matcher::UrlEncoded("interval".into(), "60".into()),
            ]))
            .with_status(200)
            .with_body(
                r#"{"error": [], "result": {
                    "XXBTZUSD": [
                        [1704070800, "42300.1", "42400.0", "42250.5", "42350.0", "42320.7", "12.5", 310],
                        [1704067200, "42200.0", "42310.0", "42150.0", "42300.1", "42240.2", "10.25", 280]
                    ],
                    "last": 1704070800
                }}"#,
            )
            .create_async()
            .await;

        let client = KrakenClient::with_base_url(server.url());
        let bars = client.fetch("XXBTZUSD", 2).await.unwrap();

        mock.assert_async().await;
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].close, 42300.1);
        assert_eq!(bars[1].close, 42350.0);
        assert_eq!(bars[0].volume, 10.25);
    }

    #[tokio::test]
    async fn test_fetch_reports_kraken_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/0/public/OHLC")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"error": ["EQuery:Unknown asset pair"]}"#)
            .create_async()
            .await;

        let client = KrakenClient::with_base_url(server.url());
        let err = client.fetch("BOGUS", 2).await.unwrap_err();

        assert!(err.to_string().contains("Unknown asset pair"));
    }

    #[test]
    fn test_parse_row_rejects_malformed() {
        let row: Value = serde_json::json!([1704067200, "abc", "1", "1", "1", "1", "1", 1]);
        assert!(KrakenClient::parse_row(&row).is_none());
        assert!(KrakenClient::parse_row(&Value::Null).is_none());
    }
}
