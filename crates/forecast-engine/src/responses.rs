//! Response payloads returned by [`crate::ForecastService`] and serialized by the API.

use forecast_core::NewsItem;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub symbol: String,
    pub historical_dates: Vec<String>,
    pub historical_prices: Vec<f64>,
    pub dates: Vec<String>,
    pub predicted_prices: Vec<f64>,
}

/// Per-day sentiment counts, only for days that have news
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewsSentimentResponse {
    pub dates: Vec<String>,
    pub positive_counts: Vec<i64>,
    pub negative_counts: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsArticleSummary {
    pub title: Option<String>,
    pub url: String,
    pub source: Option<String>,
    pub sentiment: String,
    pub date: String,
    #[serde(rename = "urlToImage")]
    pub url_to_image: Option<String>,
}

impl From<NewsItem> for NewsArticleSummary {
    fn from(item: NewsItem) -> Self {
        Self {
            title: item.title,
            url: item.url,
            source: item.source,
            sentiment: item.sentiment.to_label().to_string(),
            date: item.date.format("%Y-%m-%d").to_string(),
            url_to_image: item.url_to_image,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsArticlesResponse {
    pub articles: Vec<NewsArticleSummary>,
    pub total_articles: i64,
    pub current_page: u32,
    pub total_pages: i64,
}
