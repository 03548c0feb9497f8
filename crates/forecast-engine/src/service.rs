use chrono::Duration;
use forecast_core::{calendar, Clock, Company, ForecastError, MarketDataProvider, NewsProvider};
use forecast_store::ForecastDb;
use ml_client::InferenceModel;
use rust_decimal::prelude::ToPrimitive;
use std::sync::Arc;

use crate::{
    build_window, ForecastConfig, IterativeForecaster, NewsArticleSummary, NewsArticlesResponse, NewsBackfill,
    NewsSentimentResponse, PredictionResponse, PriceBackfill, SentimentAggregator,
};

const MAX_DAYS_AGO: i64 = 365;
const MAX_ITEMS_PER_PAGE: u32 = 100;

/// Request-level orchestration: backfill, aggregate, build the window, forecast.
pub struct ForecastService {
    db: ForecastDb,
    news: NewsBackfill,
    prices: PriceBackfill,
    aggregator: SentimentAggregator,
    model: Arc<dyn InferenceModel>,
    clock: Arc<dyn Clock>,
    config: ForecastConfig,
}

impl ForecastService {
    pub fn new(
        db: ForecastDb,
        market_data: Arc<dyn MarketDataProvider>,
        news_provider: Arc<dyn NewsProvider>,
        model: Arc<dyn InferenceModel>,
        clock: Arc<dyn Clock>,
        config: ForecastConfig,
    ) -> Self {
        Self {
            news: NewsBackfill::new(db.clone(), news_provider, config.news_target_count, config.news_page_size),
            prices: PriceBackfill::new(db.clone(), market_data),
            aggregator: SentimentAggregator::new(db.clone()),
            db,
            model,
            clock,
            config,
        }
    }

    async fn company(&self, symbol: &str) -> Result<Company, ForecastError> {
        self.db
            .lookup_company(symbol)
            .await?
            .ok_or_else(|| ForecastError::NotFound {
                symbol: symbol.to_string(),
            })
    }

    /// Backfill recent prices and news for `symbol`, then forecast the next
    /// `forecast_steps` trading days.
    pub async fn predict(&self, symbol: &str) -> Result<PredictionResponse, ForecastError> {
        let company = self.company(symbol).await?;
        let end = self.clock.today();
        let start = end - Duration::days(self.config.price_lookback_days);

        tracing::info!("Forecast requested for {} as of {}", company.symbol, end);

        self.prices.ensure_prices(&company, start, end).await?;

        let news_dates = calendar::days_back(end, self.config.news_lookback_days);
        self.news.ensure_news_range(&company, &news_dates).await;

        self.aggregator
            .aggregate_sentiment(&company, &calendar::days_between(start, end))
            .await?;

        let rows = self.db.price_rows(company.id, start, end).await?;
        let history = &rows[rows.len().saturating_sub(self.config.history_length)..];

        let (window, range) = build_window(&company.symbol, history, self.config.sequence_length)?;
        let last_date = match history.last() {
            Some(row) => row.date,
            None => {
                return Err(ForecastError::InsufficientData {
                    symbol: company.symbol.clone(),
                    needed: self.config.sequence_length,
                    available: 0,
                })
            }
        };

        let forecast = IterativeForecaster::new(self.model.as_ref())
            .forecast(&company.symbol, window, range, last_date, self.config.forecast_steps)
            .await?;

        tracing::info!(
            "Forecast for {}: {} history rows, {} predicted days from {}",
            company.symbol,
            history.len(),
            forecast.len(),
            last_date
        );

        Ok(PredictionResponse {
            symbol: company.symbol,
            historical_dates: history.iter().map(|r| r.date.format("%Y-%m-%d").to_string()).collect(),
            historical_prices: history.iter().map(|r| r.close.to_f64().unwrap_or(0.0)).collect(),
            dates: forecast.dates(),
            predicted_prices: forecast.prices(),
        })
    }

    /// Backfill news over the last `days_ago` days and return per-day sentiment counts.
    pub async fn news_sentiment(&self, symbol: &str, days_ago: i64) -> Result<NewsSentimentResponse, ForecastError> {
        validate_days_ago(days_ago)?;
        let company = self.company(symbol).await?;
        let end = self.clock.today();
        let start = end - Duration::days(days_ago);

        self.news
            .ensure_news_range(&company, &calendar::days_between(start, end))
            .await;

        let mut response = NewsSentimentResponse::default();
        for (date, counts) in self.db.sentiment_by_date(company.id, start, end).await? {
            response.dates.push(date.format("%Y-%m-%d").to_string());
            response.positive_counts.push(counts.positive);
            response.negative_counts.push(counts.negative);
        }
        Ok(response)
    }

    /// One page of stored articles from the last `days_ago` days, newest first.
    pub async fn news_articles(
        &self,
        symbol: &str,
        days_ago: i64,
        page: u32,
        items_per_page: u32,
    ) -> Result<NewsArticlesResponse, ForecastError> {
        validate_days_ago(days_ago)?;
        if page < 1 {
            return Err(ForecastError::InvalidInput("page must be at least 1".into()));
        }
        if !(1..=MAX_ITEMS_PER_PAGE).contains(&items_per_page) {
            return Err(ForecastError::InvalidInput(format!(
                "items_per_page must be between 1 and {}",
                MAX_ITEMS_PER_PAGE
            )));
        }

        let company = self.company(symbol).await?;
        let end = self.clock.today();
        let start = end - Duration::days(days_ago);

        let total = self.db.count_news_between(company.id, start, end).await?;
        let limit = i64::from(items_per_page);
        let offset = i64::from(page - 1) * limit;
        let items = self.db.news_page(company.id, start, end, limit, offset).await?;

        Ok(NewsArticlesResponse {
            articles: items.into_iter().map(NewsArticleSummary::from).collect(),
            total_articles: total,
            current_page: page,
            total_pages: (total + limit - 1) / limit,
        })
    }
}

fn validate_days_ago(days_ago: i64) -> Result<(), ForecastError> {
    if !(1..=MAX_DAYS_AGO).contains(&days_ago) {
        return Err(ForecastError::InvalidInput(format!(
            "days_ago must be between 1 and {}, got {}",
            MAX_DAYS_AGO, days_ago
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;
    use forecast_core::{FixedClock, NewsArticle};
    use std::sync::atomic::AtomicUsize;

    struct Fixture {
        service: ForecastService,
        news: Arc<StubNewsProvider>,
        market: Arc<StubMarketData>,
    }

    async fn fixture(news: StubNewsProvider, model: Arc<dyn InferenceModel>) -> Fixture {
        let (db, _) = seeded_db().await;
        // 2024-03-01 is a Friday; 60 calendar days back hold ~43 weekdays
        let market = Arc::new(StubMarketData {
            bars: weekday_bars(date("2023-12-01"), 80, 100),
            ..Default::default()
        });
        let news = Arc::new(news);
        let service = ForecastService::new(
            db,
            market.clone(),
            news.clone(),
            model,
            Arc::new(FixedClock(date("2024-03-01"))),
            ForecastConfig::default(),
        );
        Fixture {
            service,
            news,
            market,
        }
    }

    fn articles(prefix: &str, titles: &[&str]) -> Vec<NewsArticle> {
        titles
            .iter()
            .enumerate()
            .map(|(i, title)| article(&format!("https://n.example.com/{}/{}", prefix, i), title))
            .collect()
    }

    #[tokio::test]
    async fn test_predict_end_to_end() {
        let news = StubNewsProvider::with_articles(
            date("2024-02-29"),
            articles("feb29", &["Apple shares surge", "Apple stock rally", "Apple shares plunge"]),
        );
        let model = Arc::new(ConstantModel::new(0.5));
        let fx = fixture(news, model.clone()).await;

        let response = fx.service.predict("AAPL").await.unwrap();

        assert_eq!(response.symbol, "AAPL");
        assert_eq!(response.historical_dates.len(), 30);
        assert_eq!(response.historical_dates.last().unwrap(), "2024-03-01");
        assert_eq!(response.dates, vec![
            "2024-03-04", "2024-03-05", "2024-03-06", "2024-03-07", "2024-03-08", "2024-03-11", "2024-03-12"
        ]);

        let min = response.historical_prices.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = response.historical_prices.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        for price in &response.predicted_prices {
            assert!((price - (0.5 * (max - min) + min)).abs() < 1e-9);
        }

        // One news search per lookback day; sentiment flows into the model input
        assert_eq!(fx.news.calls(), 30);
        let seen = model.seen.lock().unwrap();
        assert_eq!(seen.len(), 7);
        let feb29 = seen[0].iter().nth(28).unwrap();
        assert_eq!(feb29[forecast_core::feature::POSITIVE], 2.0);
        assert_eq!(feb29[forecast_core::feature::NEGATIVE], 1.0);
    }

    #[tokio::test]
    async fn test_predict_is_repeatable() {
        let fx = fixture(StubNewsProvider::default(), Arc::new(ConstantModel::new(0.3))).await;

        let first = fx.service.predict("AAPL").await.unwrap();
        let second = fx.service.predict("AAPL").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(fx.market.calls.load(std::sync::atomic::Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_predict_unknown_symbol() {
        let fx = fixture(StubNewsProvider::default(), Arc::new(ConstantModel::new(0.5))).await;
        let err = fx.service.predict("MSFT").await.unwrap_err();
        assert!(matches!(err, ForecastError::NotFound { ref symbol } if symbol == "MSFT"));
        assert_eq!(fx.news.calls(), 0);
    }

    #[tokio::test]
    async fn test_predict_model_failure() {
        let model = Arc::new(FailingModel {
            ok_calls: 0,
            calls: AtomicUsize::new(0),
        });
        let fx = fixture(StubNewsProvider::default(), model).await;
        let err = fx.service.predict("AAPL").await.unwrap_err();
        assert!(matches!(err, ForecastError::Inference { step: 1, .. }));
    }

    #[tokio::test]
    async fn test_predict_without_enough_prices() {
        let (db, _) = seeded_db().await;
        let service = ForecastService::new(
            db,
            Arc::new(StubMarketData {
                bars: weekday_bars(date("2024-02-20"), 5, 100),
                ..Default::default()
            }),
            Arc::new(StubNewsProvider::default()),
            Arc::new(ConstantModel::new(0.5)),
            Arc::new(FixedClock(date("2024-03-01"))),
            ForecastConfig::default(),
        );
        let err = service.predict("AAPL").await.unwrap_err();
        assert!(matches!(err, ForecastError::InsufficientData { needed: 30, available: 5, .. }));
    }

    #[tokio::test]
    async fn test_news_sentiment_counts_only_days_with_news() {
        let mut news = StubNewsProvider::with_articles(
            date("2024-02-28"),
            articles("a", &["Apple shares surge", "Apple shares plunge"]),
        );
        news.articles
            .insert(date("2024-03-01"), articles("b", &["Apple record profit"]));
        let fx = fixture(news, Arc::new(ConstantModel::new(0.5))).await;

        let response = fx.service.news_sentiment("AAPL", 7).await.unwrap();
        assert_eq!(response.dates, vec!["2024-02-28", "2024-03-01"]);
        assert_eq!(response.positive_counts, vec![1, 1]);
        assert_eq!(response.negative_counts, vec![1, 0]);
        // 2024-02-23 ..= 2024-03-01
        assert_eq!(fx.news.calls(), 8);
    }

    #[tokio::test]
    async fn test_news_sentiment_rejects_bad_range() {
        let fx = fixture(StubNewsProvider::default(), Arc::new(ConstantModel::new(0.5))).await;
        for days in [0, -1, 366] {
            let err = fx.service.news_sentiment("AAPL", days).await.unwrap_err();
            assert!(matches!(err, ForecastError::InvalidInput(_)));
        }
    }

    #[tokio::test]
    async fn test_news_articles_paging() {
        let titles: Vec<String> = (0..5).map(|i| format!("Apple headline {}", i)).collect();
        let title_refs: Vec<&str> = titles.iter().map(String::as_str).collect();
        let mut news = StubNewsProvider::with_articles(date("2024-02-29"), articles("old", &title_refs[..3]));
        news.articles
            .insert(date("2024-03-01"), articles("new", &title_refs[3..]));
        let fx = fixture(news, Arc::new(ConstantModel::new(0.5))).await;
        fx.service.news_sentiment("AAPL", 2).await.unwrap();

        let page1 = fx.service.news_articles("AAPL", 2, 1, 2).await.unwrap();
        assert_eq!(page1.total_articles, 5);
        assert_eq!(page1.total_pages, 3);
        assert_eq!(page1.current_page, 1);
        assert_eq!(page1.articles.len(), 2);
        assert!(page1.articles.iter().all(|a| a.date == "2024-03-01"));

        let page3 = fx.service.news_articles("AAPL", 2, 3, 2).await.unwrap();
        assert_eq!(page3.articles.len(), 1);
        assert_eq!(page3.articles[0].date, "2024-02-29");

        let beyond = fx.service.news_articles("AAPL", 2, 9, 2).await.unwrap();
        assert!(beyond.articles.is_empty());
        assert_eq!(beyond.total_pages, 3);
    }

    #[tokio::test]
    async fn test_news_articles_validation() {
        let fx = fixture(StubNewsProvider::default(), Arc::new(ConstantModel::new(0.5))).await;
        assert!(matches!(
            fx.service.news_articles("AAPL", 7, 0, 12).await,
            Err(ForecastError::InvalidInput(_))
        ));
        assert!(matches!(
            fx.service.news_articles("AAPL", 7, 1, 101).await,
            Err(ForecastError::InvalidInput(_))
        ));
        assert!(matches!(
            fx.service.news_articles("NOPE", 7, 1, 12).await,
            Err(ForecastError::NotFound { .. })
        ));
        let empty = fx.service.news_articles("AAPL", 7, 1, 12).await.unwrap();
        assert_eq!(empty.total_articles, 0);
        assert_eq!(empty.total_pages, 0);
    }
}
