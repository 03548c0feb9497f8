use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use forecast_core::{DailyBar, ForecastError, MarketDataProvider};
use reqwest::Client;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

const BASE_URL: &str = "https://api.polygon.io";
const PROVIDER: &str = "polygon";

/// Sliding-window rate limiter: at most `max_requests` per `window` duration.
#[derive(Clone)]
struct RateLimiter {
    timestamps: Arc<Mutex<VecDeque<Instant>>>,
    max_requests: usize,
    window: Duration,
}

impl RateLimiter {
    fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            timestamps: Arc::new(Mutex::new(VecDeque::new())),
            max_requests: max_requests.max(1),
            window,
        }
    }

    async fn acquire(&self) {
        loop {
            let mut ts = self.timestamps.lock().await;
            let now = Instant::now();

            // Remove timestamps outside the window
            while let Some(&front) = ts.front() {
                if now.duration_since(front) >= self.window {
                    ts.pop_front();
                } else {
                    break;
                }
            }

            if ts.len() < self.max_requests {
                ts.push_back(now);
                return;
            }

            // Wait until the oldest request falls out of the window
            let oldest = match ts.front() {
                Some(&front) => front,
                None => continue,
            };
            let sleep_dur = (oldest + self.window).saturating_duration_since(now)
                + Duration::from_millis(50);
            drop(ts);
            tracing::debug!("Rate limiter: waiting {:.1}s for Polygon API slot", sleep_dur.as_secs_f64());
            tokio::time::sleep(sleep_dur).await;
        }
    }
}

#[derive(Clone)]
pub struct PolygonClient {
    api_key: String,
    base_url: String,
    client: Client,
    rate_limiter: RateLimiter,
}

impl PolygonClient {
    /// `rate_limit` is requests per minute; the free tier allows 5.
    pub fn new(api_key: String, rate_limit: usize) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(90))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            api_key,
            base_url: BASE_URL.to_string(),
            client,
            rate_limiter: RateLimiter::new(rate_limit, Duration::from_secs(60)),
        }
    }

    /// Send a request with rate limiting and automatic 429 retry.
    async fn send_request(
        &self,
        builder: reqwest::RequestBuilder,
        operation: &str,
    ) -> Result<reqwest::Response, ForecastError> {
        let request = builder
            .build()
            .map_err(|e| ForecastError::provider(PROVIDER, operation, e))?;

        for attempt in 0..3u32 {
            self.rate_limiter.acquire().await;
            let req_clone = request
                .try_clone()
                .ok_or_else(|| ForecastError::provider(PROVIDER, operation, "cannot clone request"))?;
            let response = self
                .client
                .execute(req_clone)
                .await
                .map_err(|e| ForecastError::provider(PROVIDER, operation, e))?;

            if response.status().as_u16() != 429 {
                return Ok(response);
            }

            let wait_secs = 15u64;
            tracing::warn!("Polygon 429 rate limited, waiting {}s before retry {}/3", wait_secs, attempt + 1);
            tokio::time::sleep(Duration::from_secs(wait_secs)).await;
        }

        Err(ForecastError::provider(PROVIDER, operation, "rate limited after 3 retries"))
    }

    /// Get daily aggregates for a symbol, either split/dividend adjusted or raw.
    pub async fn get_daily_aggregates(
        &self,
        symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
        adjusted: bool,
    ) -> Result<Vec<AggregateResult>, ForecastError> {
        let url = format!(
            "{}/v2/aggs/ticker/{}/range/1/day/{}/{}",
            self.base_url,
            symbol,
            from.format("%Y-%m-%d"),
            to.format("%Y-%m-%d")
        );
        let operation = format!("daily aggregates {} {}..{} adjusted={}", symbol, from, to, adjusted);

        let response = self
            .send_request(
                self.client.get(&url).query(&[
                    ("apiKey", self.api_key.as_str()),
                    ("adjusted", if adjusted { "true" } else { "false" }),
                    ("sort", "asc"),
                    ("limit", "50000"),
                ]),
                &operation,
            )
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(ForecastError::provider(
                PROVIDER,
                operation,
                format!("HTTP {}: {}", status, response.text().await.unwrap_or_default()),
            ));
        }

        let agg_response: AggregateResponse = response
            .json()
            .await
            .map_err(|e| ForecastError::provider(PROVIDER, operation.as_str(), e))?;

        Ok(agg_response.results)
    }
}

#[async_trait]
impl MarketDataProvider for PolygonClient {
    /// Raw OHLCV plus the adjusted close from a second, adjusted query.
    async fn daily_bars(
        &self,
        symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<DailyBar>, ForecastError> {
        let (raw, adjusted) = tokio::join!(
            self.get_daily_aggregates(symbol, from, to, false),
            self.get_daily_aggregates(symbol, from, to, true),
        );

        let raw = raw?;
        let adjusted = match adjusted {
            Ok(results) => results,
            Err(e) => {
                tracing::warn!("Adjusted closes unavailable for {}: {}", symbol, e);
                Vec::new()
            }
        };

        Ok(merge_bars(&raw, &adjusted))
    }
}

/// Join raw and adjusted aggregates by trading day.
fn merge_bars(raw: &[AggregateResult], adjusted: &[AggregateResult]) -> Vec<DailyBar> {
    let adj_closes: HashMap<NaiveDate, f64> = adjusted
        .iter()
        .filter_map(|r| r.date().map(|d| (d, r.c)))
        .collect();

    raw.iter()
        .filter_map(|r| {
            let date = r.date()?;
            Some(DailyBar {
                date,
                open: to_price(r.o)?,
                high: to_price(r.h)?,
                low: to_price(r.l)?,
                close: to_price(r.c)?,
                adj_close: adj_closes.get(&date).and_then(|c| to_price(*c)),
                volume: r.v.round() as i64,
            })
        })
        .collect()
}

fn to_price(value: f64) -> Option<Decimal> {
    Decimal::from_f64(value).map(|d| d.round_dp(4))
}

#[derive(Debug, Deserialize)]
struct AggregateResponse {
    #[serde(default)]
    results: Vec<AggregateResult>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AggregateResult {
    pub t: i64, // timestamp (ms, start of the bar in UTC)
    pub o: f64,
    pub h: f64,
    pub l: f64,
    pub c: f64,
    pub v: f64,
}

impl AggregateResult {
    /// Daily bars are stamped at midnight US/Eastern, which is still the same date in UTC.
    fn date(&self) -> Option<NaiveDate> {
        DateTime::from_timestamp_millis(self.t).map(|dt| dt.date_naive())
    }
}
