use governor::{Quota, RateLimiter};
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::num::NonZeroU32;
use std::sync::Arc;
use tokio::time::{sleep, Duration};

const DEFAULT_MAX_RETRIES: u32 = 3;
const INITIAL_BACKOFF_MS: u64 = 2000;
const MAX_BACKOFF_MS: u64 = 60_000;
const USER_AGENT: &str = concat!("ema-monitor/", env!("CARGO_PKG_VERSION"));

type DirectRateLimiter = RateLimiter<
    governor::state::direct::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// Rate-limited JSON GET client with retry on transient failures
///
/// Clones share the same rate limiter.
#[derive(Clone)]
pub struct JsonHttpClient {
    client: Client,
    rate_limiter: Arc<DirectRateLimiter>,
    max_retries: u32,
    provider: &'static str,
}

impl JsonHttpClient {
    pub fn new(provider: &'static str, requests_per_minute: u32) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_else(|_| Client::new());

        let quota =
            Quota::per_minute(NonZeroU32::new(requests_per_minute).unwrap_or(NonZeroU32::MIN));

        Self {
            client,
            rate_limiter: Arc::new(RateLimiter::direct(quota)),
            max_retries: DEFAULT_MAX_RETRIES,
            provider,
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries.max(1);
        self
    }

    /// GET `url` and decode the JSON body
    ///
    /// Retries 429, 5xx and network errors with exponential backoff. Other
    /// 4xx responses fail immediately. Errors are returned as display strings
    /// so callers can attach the symbol they were fetching.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> std::result::Result<T, String> {
        let mut last_error = String::from("no attempts made");

        for attempt in 1..=self.max_retries {
            self.rate_limiter.until_ready().await;

            match self.client.get(url).query(query).send().await {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        return response
                            .json::<T>()
                            .await
                            .map_err(|e| {
                                format!("failed to parse {} response: {}", self.provider, e)
                            });
                    }

                    let body = response
                        .text()
                        .await
                        .unwrap_or_else(|_| "Unknown error".to_string());
                    last_error = format!("{} API error ({}): {}", self.provider, status, body);

                    if !(status.as_u16() == 429 || status.is_server_error()) {
                        return Err(last_error);
                    }
                }
                Err(e) => {
                    last_error = format!("network error talking to {}: {}", self.provider, e);
                }
            }

            if attempt < self.max_retries {
                let backoff_ms = backoff_ms(attempt);
                tracing::warn!(
                    "Attempt {}/{} failed: {}. Retrying in {}ms...",
                    attempt,
                    self.max_retries,
                    last_error,
                    backoff_ms
                );
                sleep(Duration::from_millis(backoff_ms)).await;
            }
        }

        Err(last_error)
    }
}

/// Delay after the given failed attempt: doubles from 2s, capped at one minute
fn backoff_ms(attempt: u32) -> u64 {
    let factor = 2_u64.checked_pow(attempt.saturating_sub(1)).unwrap_or(u64::MAX);
    INITIAL_BACKOFF_MS.saturating_mul(factor).min(MAX_BACKOFF_MS)
}
