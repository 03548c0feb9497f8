//! News Routes
//!
//! Per-day sentiment counts and paged article listings for a symbol.

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use forecast_engine::{NewsArticlesResponse, NewsSentimentResponse};
use serde::Deserialize;

use crate::{AppError, AppState};

#[derive(Deserialize)]
pub struct ArticlesQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_items_per_page")]
    pub items_per_page: u32,
}

fn default_page() -> u32 {
    1
}

fn default_items_per_page() -> u32 {
    12
}

pub fn news_routes() -> Router<AppState> {
    Router::new()
        .route("/news-sentiment/:symbol/:days_ago", get(news_sentiment))
        .route("/news-articles/:symbol/:days_ago", get(news_articles))
}

async fn news_sentiment(
    State(state): State<AppState>,
    Path((symbol, days_ago)): Path<(String, i64)>,
) -> Result<Json<NewsSentimentResponse>, AppError> {
    Ok(Json(state.service.news_sentiment(&symbol, days_ago).await?))
}

async fn news_articles(
    State(state): State<AppState>,
    Path((symbol, days_ago)): Path<(String, i64)>,
    Query(query): Query<ArticlesQuery>,
) -> Result<Json<NewsArticlesResponse>, AppError> {
    let response = state
        .service
        .news_articles(&symbol, days_ago, query.page, query.items_per_page)
        .await?;
    Ok(Json(response))
}
