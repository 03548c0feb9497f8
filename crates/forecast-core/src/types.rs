use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Scalars per timestep: open, high, low, close, volume, reserved, positive, negative.
pub const N_FEATURES: usize = 8;

/// Index of each scalar inside a [`FeatureVector`].
pub mod feature {
    pub const OPEN: usize = 0;
    pub const HIGH: usize = 1;
    pub const LOW: usize = 2;
    pub const CLOSE: usize = 3;
    pub const VOLUME: usize = 4;
    /// Symbol index slot; the deployed model was trained with it pinned to zero.
    pub const RESERVED: usize = 5;
    pub const POSITIVE: usize = 6;
    pub const NEGATIVE: usize = 7;
}

/// A company known to the local registry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Company {
    pub id: i64,
    pub symbol: String,
    /// Display name, used as the news search query
    pub name: String,
}

/// Daily bar as returned by a market-data provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyBar {
    pub date: NaiveDate,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    #[serde(default)]
    pub adj_close: Option<Decimal>,
    pub volume: i64,
}

/// Persisted daily price row for a (company, date) pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceRow {
    pub company_id: i64,
    pub date: NaiveDate,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub adj_close: Option<Decimal>,
    pub volume: i64,
    /// Filled in by the sentiment aggregator; `None` until it has run for this date
    pub news_positive_sentiment: Option<i64>,
    pub news_negative_sentiment: Option<i64>,
}

impl PriceRow {
    pub fn from_bar(company_id: i64, bar: &DailyBar) -> Self {
        Self {
            company_id,
            date: bar.date,
            open: bar.open,
            high: bar.high,
            low: bar.low,
            close: bar.close,
            adj_close: bar.adj_close,
            volume: bar.volume,
            news_positive_sentiment: None,
            news_negative_sentiment: None,
        }
    }
}

/// Binary news sentiment. There is no neutral class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SentimentLabel {
    Positive,
    Negative,
}

impl SentimentLabel {
    /// Storage encoding: `1` for positive, `-1` for negative.
    pub fn to_i64(self) -> i64 {
        match self {
            SentimentLabel::Positive => 1,
            SentimentLabel::Negative => -1,
        }
    }

    pub fn from_i64(value: i64) -> Self {
        if value == 1 {
            SentimentLabel::Positive
        } else {
            SentimentLabel::Negative
        }
    }

    pub fn to_label(self) -> &'static str {
        match self {
            SentimentLabel::Positive => "Positive",
            SentimentLabel::Negative => "Negative",
        }
    }
}

/// News article as returned by a news provider. Every field may be absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewsArticle {
    pub source_name: Option<String>,
    pub author: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub url_to_image: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub content: Option<String>,
}

impl NewsArticle {
    /// Title, description and content joined by spaces, missing parts as empty strings.
    pub fn scoring_text(&self) -> String {
        format!(
            "{} {} {}",
            self.title.as_deref().unwrap_or(""),
            self.description.as_deref().unwrap_or(""),
            self.content.as_deref().unwrap_or("")
        )
    }

    /// The dedup key, if the article has a usable one
    pub fn dedup_url(&self) -> Option<&str> {
        self.url.as_deref().map(str::trim).filter(|u| !u.is_empty())
    }
}

/// Stored news item for a (company, date, url) triple
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsItem {
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
    pub sentiment: SentimentLabel,
}

impl NewsItem {
    pub fn from_article(
        company_id: i64,
        date: NaiveDate,
        url: &str,
        article: &NewsArticle,
        sentiment: SentimentLabel,
    ) -> Self {
        Self {
            company_id,
            date,
            url: url.to_string(),
            source: article.source_name.clone(),
            author: article.author.clone(),
            title: article.title.clone(),
            description: article.description.clone(),
            url_to_image: article.url_to_image.clone(),
            published_at: article.published_at,
            content: article.content.clone(),
            sentiment,
        }
    }
}

/// Positive/negative news counts for one day
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentimentCounts {
    pub positive: i64,
    pub negative: i64,
}

pub type FeatureVector = [f64; N_FEATURES];

/// Fixed-length ordered window of feature vectors, oldest first.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureWindow {
    steps: VecDeque<FeatureVector>,
}

impl FeatureWindow {
    pub fn new(steps: Vec<FeatureVector>) -> Self {
        Self {
            steps: steps.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn last(&self) -> Option<&FeatureVector> {
        self.steps.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FeatureVector> {
        self.steps.iter()
    }

    /// Drop the oldest timestep and append `next`, keeping the length fixed.
    pub fn shift(&mut self, next: FeatureVector) {
        self.steps.pop_front();
        self.steps.push_back(next);
    }

    /// Shape `(1, len, N_FEATURES)`, the batch layout the model expects.
    pub fn to_tensor(&self) -> Vec<Vec<FeatureVector>> {
        vec![self.steps.iter().copied().collect()]
    }
}

/// Close-price range used for min-max normalization and to de-normalize model output
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceRange {
    pub min: f64,
    pub max: f64,
}

impl PriceRange {
    pub fn span(&self) -> f64 {
        self.max - self.min
    }

    pub fn normalize(&self, value: f64) -> f64 {
        (value - self.min) / self.span()
    }

    pub fn denormalize(&self, value: f64) -> f64 {
        value * self.span() + self.min
    }
}

/// One predicted trading day
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub date: NaiveDate,
    pub price: f64,
}

/// Ordered predictions, one per requested step
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ForecastResult {
    pub points: Vec<ForecastPoint>,
}

impl ForecastResult {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn dates(&self) -> Vec<String> {
        self.points
            .iter()
            .map(|p| p.date.format("%Y-%m-%d").to_string())
            .collect()
    }

    pub fn prices(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.price).collect()
    }
}
