use async_trait::async_trait;
use chrono::{NaiveDate, Utc};

use crate::{DailyBar, ForecastError, NewsArticle};

/// Source of daily OHLCV bars
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    async fn daily_bars(
        &self,
        symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<DailyBar>, ForecastError>;
}

/// Parameters for a single news search
#[derive(Debug, Clone, PartialEq)]
pub struct NewsQuery {
    pub query: String,
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub page_size: u32,
}

impl NewsQuery {
    /// A search bounded to a single calendar day.
    pub fn single_day(query: &str, date: NaiveDate, page_size: u32) -> Self {
        Self {
            query: query.to_string(),
            from: date,
            to: date,
            page_size,
        }
    }
}

/// News search API. Articles are returned in provider order.
#[async_trait]
pub trait NewsProvider: Send + Sync {
    async fn search(&self, query: &NewsQuery) -> Result<Vec<NewsArticle>, ForecastError>;
}

/// Source of "today", injected so request handling is reproducible in tests
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Utc::now().date_naive()
    }
}

/// Clock pinned to one date
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}
