//! Test doubles for the provider and model boundaries.

use async_trait::async_trait;
use chrono::NaiveDate;
use forecast_core::{
    Company, DailyBar, FeatureWindow, ForecastError, MarketDataProvider, NewsArticle,
    NewsProvider, NewsQuery,
};
use forecast_store::ForecastDb;
use ml_client::{InferenceModel, MLError, MLResult};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tempfile::TempDir;
use tokio::sync::Barrier;

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

pub async fn seeded_db() -> (ForecastDb, Company) {
    let db = ForecastDb::new("sqlite::memory:").await.unwrap();
    let company = db.upsert_company("AAPL", "Apple Inc.").await.unwrap();
    (db, company)
}

/// File-backed database with a real multi-connection pool. Keep the `TempDir` alive
/// for as long as the database is used.
pub async fn seeded_file_db() -> (ForecastDb, Company, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite:{}", dir.path().join("forecast.db").display());
    let db = ForecastDb::new(&url).await.unwrap();
    let company = db.upsert_company("AAPL", "Apple Inc.").await.unwrap();
    (db, company, dir)
}

pub fn article(url: &str, title: &str) -> NewsArticle {
    NewsArticle {
        source_name: Some("Reuters".to_string()),
        title: Some(title.to_string()),
        url: Some(url.to_string()),
        ..Default::default()
    }
}

/// Returns canned articles per date; dates listed in `failing` return a provider error.
#[derive(Default)]
pub struct StubNewsProvider {
    pub articles: HashMap<NaiveDate, Vec<NewsArticle>>,
    pub failing: Vec<NaiveDate>,
    pub calls: AtomicUsize,
    pub queries: Mutex<Vec<NewsQuery>>,
}

impl StubNewsProvider {
    pub fn with_articles(date: NaiveDate, articles: Vec<NewsArticle>) -> Self {
        let mut stub = Self::default();
        stub.articles.insert(date, articles);
        stub
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NewsProvider for StubNewsProvider {
    async fn search(&self, query: &NewsQuery) -> Result<Vec<NewsArticle>, ForecastError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.queries.lock().unwrap().push(query.clone());
        if self.failing.contains(&query.from) {
            return Err(ForecastError::provider("stub-news", format!("search {}", query.from), "HTTP 500"));
        }
        Ok(self.articles.get(&query.from).cloned().unwrap_or_default())
    }
}

/// Returns the same articles for every query, but only once `barrier` has been
/// reached by every caller, so concurrent backfills all fetch before any of them writes.
pub struct GatedNewsProvider {
    pub articles: Vec<NewsArticle>,
    pub barrier: Barrier,
}

#[async_trait]
impl NewsProvider for GatedNewsProvider {
    async fn search(&self, _query: &NewsQuery) -> Result<Vec<NewsArticle>, ForecastError> {
        self.barrier.wait().await;
        Ok(self.articles.clone())
    }
}

/// Serves a fixed set of bars, filtered to the requested range.
#[derive(Default)]
pub struct StubMarketData {
    pub bars: Vec<DailyBar>,
    pub fail: bool,
    pub calls: AtomicUsize,
}

#[async_trait]
impl MarketDataProvider for StubMarketData {
    async fn daily_bars(
        &self,
        symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<DailyBar>, ForecastError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(ForecastError::provider("stub-market", format!("bars {}", symbol), "timeout"));
        }
        Ok(self
            .bars
            .iter()
            .filter(|b| b.date >= from && b.date <= to)
            .cloned()
            .collect())
    }
}

/// Weekday bars from `start` with closes `first_close, first_close + 1, ...`.
pub fn weekday_bars(start: NaiveDate, count: usize, first_close: i64) -> Vec<DailyBar> {
    start
        .iter_days()
        .filter(|d| !forecast_core::calendar::is_weekend(*d))
        .take(count)
        .enumerate()
        .map(|(i, date)| {
            let close = Decimal::from(first_close + i as i64);
            DailyBar {
                date,
                open: close,
                high: close,
                low: close,
                close,
                adj_close: Some(close),
                volume: 1_000_000 + i as i64,
            }
        })
        .collect()
}

/// Returns the same scalar on every call and records every window it sees.
pub struct ConstantModel {
    pub value: f64,
    pub seen: Mutex<Vec<FeatureWindow>>,
}

impl ConstantModel {
    pub fn new(value: f64) -> Self {
        Self {
            value,
            seen: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl InferenceModel for ConstantModel {
    async fn predict(&self, window: &FeatureWindow) -> MLResult<f64> {
        self.seen.lock().unwrap().push(window.clone());
        Ok(self.value)
    }

    fn backend_name(&self) -> &'static str {
        "constant"
    }
}

/// Succeeds `ok_calls` times, then fails.
pub struct FailingModel {
    pub ok_calls: usize,
    pub calls: AtomicUsize,
}

#[async_trait]
impl InferenceModel for FailingModel {
    async fn predict(&self, _window: &FeatureWindow) -> MLResult<f64> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.ok_calls {
            Ok(0.5)
        } else {
            Err(MLError::ModelNotLoaded)
        }
    }

    fn backend_name(&self) -> &'static str {
        "failing"
    }
}
