//! Client for the NewsAPI `everything` search endpoint.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use forecast_core::{ForecastError, NewsArticle, NewsProvider, NewsQuery};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_URL: &str = "https://newsapi.org/v2/everything";
const PROVIDER: &str = "newsapi";

#[derive(Clone)]
pub struct NewsApiClient {
    api_key: String,
    url: String,
    language: String,
    client: Client,
}

impl NewsApiClient {
    pub fn new(api_key: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            api_key,
            url: DEFAULT_URL.to_string(),
            language: "en".to_string(),
            client,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }
}

#[async_trait]
impl NewsProvider for NewsApiClient {
    async fn search(&self, query: &NewsQuery) -> Result<Vec<NewsArticle>, ForecastError> {
        let operation = format!("search '{}' {}..{}", query.query, query.from, query.to);
        let from = query.from.format("%Y-%m-%d").to_string();
        let to = query.to.format("%Y-%m-%d").to_string();
        let page_size = query.page_size.to_string();

        let response = self
            .client
            .get(&self.url)
            .query(&[
                ("q", query.query.as_str()),
                ("from", from.as_str()),
                ("to", to.as_str()),
                ("language", self.language.as_str()),
                ("apiKey", self.api_key.as_str()),
                ("pageSize", page_size.as_str()),
            ])
            .send()
            .await
            .map_err(|e| ForecastError::provider(PROVIDER, operation.as_str(), e))?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(ForecastError::provider(
                PROVIDER,
                operation,
                format!("HTTP {}: {}", status, response.text().await.unwrap_or_default()),
            ));
        }

        let body: EverythingResponse = response
            .json()
            .await
            .map_err(|e| ForecastError::provider(PROVIDER, operation.as_str(), e))?;

        parse_articles(body).map_err(|message| ForecastError::provider(PROVIDER, operation, message))
    }
}

fn parse_articles(body: EverythingResponse) -> Result<Vec<NewsArticle>, String> {
    if body.status.as_deref() == Some("error") {
        return Err(format!(
            "{}: {}",
            body.code.unwrap_or_default(),
            body.message.unwrap_or_default()
        ));
    }

    Ok(body.articles.into_iter().map(NewsArticle::from).collect())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EverythingResponse {
    status: Option<String>,
    code: Option<String>,
    message: Option<String>,
    #[serde(default)]
    articles: Vec<RawArticle>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawArticle {
    source: Option<RawSource>,
    author: Option<String>,
    title: Option<String>,
    description: Option<String>,
    url: Option<String>,
    url_to_image: Option<String>,
    published_at: Option<String>,
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawSource {
    name: Option<String>,
}

impl From<RawArticle> for NewsArticle {
    fn from(raw: RawArticle) -> Self {
        NewsArticle {
            source_name: raw.source.and_then(|s| s.name),
            author: raw.author,
            title: raw.title,
            description: raw.description,
            url: raw.url,
            url_to_image: raw.url_to_image,
            published_at: raw
                .published_at
                .as_deref()
                .and_then(|ts| DateTime::parse_from_rfc3339(ts).ok())
                .map(|dt| dt.with_timezone(&Utc)),
            content: raw.content,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_articles_with_missing_fields() {
        let body: EverythingResponse = serde_json::from_str(
            r#"{
                "status": "ok",
                "totalResults": 2,
                "articles": [
                    {
                        "source": {"id": null, "name": "Reuters"},
                        "author": "Jane Doe",
                        "title": "Apple shares rally",
                        "description": "Strong iPhone demand",
                        "url": "https://example.com/apple-rally",
                        "urlToImage": "https://example.com/apple.jpg",
                        "publishedAt": "2024-01-02T14:30:00Z",
                        "content": "Apple Inc shares rose..."
                    },
                    {"source": {"id": null, "name": null}, "title": "No url here"}
                ]
            }"#,
        )
        .unwrap();

        let articles = parse_articles(body).unwrap();
        assert_eq!(articles.len(), 2);
        assert_eq!(articles[0].source_name.as_deref(), Some("Reuters"));
        assert_eq!(articles[0].url_to_image.as_deref(), Some("https://example.com/apple.jpg"));
        assert_eq!(
            articles[0].published_at.map(|d| d.to_rfc3339()),
            Some("2024-01-02T14:30:00+00:00".to_string())
        );
        assert!(articles[1].url.is_none());
        assert!(articles[1].source_name.is_none());
    }

    #[test]
    fn test_error_payload_is_rejected() {
        let body: EverythingResponse = serde_json::from_str(
            r#"{"status":"error","code":"apiKeyInvalid","message":"Your API key is invalid."}"#,
        )
        .unwrap();

        let err = parse_articles(body).unwrap_err();
        assert!(err.contains("apiKeyInvalid"));
    }

    #[tokio::test]
    #[ignore] // Only run with valid credentials
    async fn test_search_live() {
        let client = NewsApiClient::new(std::env::var("NEWS_API_KEY").unwrap());
        let date = Utc::now().date_naive() - chrono::Duration::days(1);
        let articles = client
            .search(&NewsQuery::single_day("Apple Inc.", date, 100))
            .await
            .unwrap();
        assert!(articles.len() <= 100);
    }
}
