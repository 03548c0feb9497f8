//! Row shapes as stored in SQLite. Prices are kept as TEXT so that decimal
//! values survive the round trip without float rounding.

use chrono::{DateTime, NaiveDate, Utc};
use forecast_core::{Company, ForecastError, NewsItem, PriceRow, SentimentLabel};
use rust_decimal::Decimal;
use std::str::FromStr;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CompanyRecord {
    pub id: i64,
    pub symbol: String,
    pub name: String,
}

impl From<CompanyRecord> for Company {
    fn from(r: CompanyRecord) -> Self {
        Company {
            id: r.id,
            symbol: r.symbol,
            name: r.name,
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PriceRecord {
    pub company_id: i64,
    pub date: NaiveDate,
    pub open: String,
    pub high: String,
    pub low: String,
    pub close: String,
    pub adj_close: Option<String>,
    pub volume: i64,
    pub news_positive_sentiment: Option<i64>,
    pub news_negative_sentiment: Option<i64>,
}

fn parse_decimal(field: &str, value: &str) -> Result<Decimal, ForecastError> {
    Decimal::from_str(value)
        .map_err(|e| ForecastError::storage(format!("decode stocks.{}", field), e))
}

impl TryFrom<PriceRecord> for PriceRow {
    type Error = ForecastError;

    fn try_from(r: PriceRecord) -> Result<Self, Self::Error> {
        Ok(PriceRow {
            company_id: r.company_id,
            date: r.date,
            open: parse_decimal("open", &r.open)?,
            high: parse_decimal("high", &r.high)?,
            low: parse_decimal("low", &r.low)?,
            close: parse_decimal("close", &r.close)?,
            adj_close: r
                .adj_close
                .as_deref()
                .map(|v| parse_decimal("adj_close", v))
                .transpose()?,
            volume: r.volume,
            news_positive_sentiment: r.news_positive_sentiment,
            news_negative_sentiment: r.news_negative_sentiment,
        })
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct NewsRecord {
    pub company_id: i64,
    pub date: NaiveDate,
    pub url: String,
    pub source: Option<String>,
    pub author: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub url_to_image: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub content: Option<String>,
    pub sentiment: i64,
}

impl From<NewsRecord> for NewsItem {
    fn from(r: NewsRecord) -> Self {
        NewsItem {
            company_id: r.company_id,
            date: r.date,
            url: r.url,
            source: r.source,
            author: r.author,
            title: r.title,
            description: r.description,
            url_to_image: r.url_to_image,
            published_at: r.published_at,
            content: r.content,
            sentiment: SentimentLabel::from_i64(r.sentiment),
        }
    }
}
