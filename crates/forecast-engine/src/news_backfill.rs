use chrono::NaiveDate;
use forecast_core::{Company, ForecastError, NewsItem, NewsProvider, NewsQuery};
use forecast_store::ForecastDb;
use sentiment_analysis::SentimentScorer;
use std::sync::Arc;

/// Outcome of a multi-date news backfill
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewsBackfillReport {
    pub dates_checked: usize,
    /// Dates that already held the target number of items
    pub dates_skipped_full: usize,
    /// Dates skipped because the provider or the store failed
    pub dates_failed: usize,
    pub articles_added: usize,
}

/// Tops up stored news per (company, date) from a news provider, up to a quota.
pub struct NewsBackfill {
    db: ForecastDb,
    provider: Arc<dyn NewsProvider>,
    scorer: SentimentScorer,
    target_count: i64,
    page_size: u32,
}

impl NewsBackfill {
    pub fn new(db: ForecastDb, provider: Arc<dyn NewsProvider>, target_count: i64, page_size: u32) -> Self {
        Self {
            db,
            provider,
            scorer: SentimentScorer::new(),
            target_count,
            page_size,
        }
    }

    /// Make sure (company, date) holds at least `target_count` news items, if the
    /// provider has that many. Returns the number of items added.
    ///
    /// Articles without a URL or already stored are skipped. All inserts for the
    /// date commit together; any storage failure rolls the whole date back.
    pub async fn ensure_news(
        &self,
        company: &Company,
        date: NaiveDate,
        target_count: i64,
    ) -> Result<usize, ForecastError> {
        let existing = self.db.count_news(company.id, date).await?;
        if existing >= target_count {
            tracing::debug!("Already have {} articles for {} on {}", existing, company.symbol, date);
            return Ok(0);
        }

        let query = NewsQuery::single_day(&company.name, date, self.page_size);
        let articles = self.provider.search(&query).await?;

        let mut uow = self.db.begin().await?;
        // Re-count inside the unit of work: a concurrent request may have filled the day meanwhile
        let mut count = uow.count_news(company.id, date).await?;
        let mut added = 0usize;

        for article in &articles {
            if count >= target_count {
                break;
            }

            let Some(url) = article.dedup_url() else {
                continue;
            };

            let sentiment = self.scorer.classify_article(article);
            let item = NewsItem::from_article(company.id, date, url, article, sentiment);

            match uow.insert_news(&item).await {
                Ok(()) => {
                    count += 1;
                    added += 1;
                }
                // Already stored, by an earlier run or a concurrent request
                Err(e) if e.is_duplicate() => {
                    tracing::debug!("Skipping duplicate article {} for {} on {}", url, company.symbol, date);
                }
                Err(e) => return Err(e),
            }
        }

        uow.commit().await?;

        tracing::info!(
            "Collected {} news articles for {} on {} ({} new of {} fetched)",
            count,
            company.symbol,
            date,
            added,
            articles.len()
        );
        Ok(added)
    }

    /// Run [`Self::ensure_news`] for every date with the configured quota. A failing
    /// date is logged and skipped; the rest of the range still runs.
    pub async fn ensure_news_range(&self, company: &Company, dates: &[NaiveDate]) -> NewsBackfillReport {
        let mut report = NewsBackfillReport::default();

        for &date in dates {
            report.dates_checked += 1;

            match self.db.count_news(company.id, date).await {
                Ok(existing) if existing >= self.target_count => {
                    report.dates_skipped_full += 1;
                    continue;
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::error!("Error counting news for {} on {}: {}", company.symbol, date, e);
                    report.dates_failed += 1;
                    continue;
                }
            }

            match self.ensure_news(company, date, self.target_count).await {
                Ok(added) => report.articles_added += added,
                Err(e) => {
                    tracing::error!("Error processing news for {} on {}: {}", company.symbol, date, e);
                    report.dates_failed += 1;
                }
            }
        }

        tracing::info!(
            "News backfill for {}: {} dates, {} full, {} failed, {} articles added",
            company.symbol,
            report.dates_checked,
            report.dates_skipped_full,
            report.dates_failed,
            report.articles_added
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;
    use forecast_core::{NewsArticle, SentimentLabel};

    fn fresh_articles(prefix: &str, n: usize) -> Vec<NewsArticle> {
        (0..n)
            .map(|i| article(&format!("https://news.example.com/{}/{}", prefix, i), "Apple shares rally"))
            .collect()
    }

    async fn prefill(db: &ForecastDb, company: &Company, date: NaiveDate, n: usize) {
        let mut uow = db.begin().await.unwrap();
        for i in 0..n {
            let a = article(&format!("https://old.example.com/{}", i), "old");
            let url = a.url.clone().unwrap();
            uow.insert_news(&NewsItem::from_article(company.id, date, &url, &a, SentimentLabel::Negative))
                .await
                .unwrap();
        }
        uow.commit().await.unwrap();
    }

    #[tokio::test]
    async fn test_tops_up_to_target_and_ignores_the_rest() {
        let (db, company) = seeded_db().await;
        let day = date("2024-01-02");
        prefill(&db, &company, day, 85).await;

        let provider = Arc::new(StubNewsProvider::with_articles(day, fresh_articles("fresh", 10)));
        let backfill = NewsBackfill::new(db.clone(), provider.clone(), 90, 100);

        let added = backfill.ensure_news(&company, day, 90).await.unwrap();
        assert_eq!(added, 5);
        assert_eq!(db.count_news(company.id, day).await.unwrap(), 90);

        // Provider order is preserved: the first five fresh articles win
        let urls = db.news_urls(company.id, day).await.unwrap();
        assert!(urls.contains(&"https://news.example.com/fresh/4".to_string()));
        assert!(!urls.contains(&"https://news.example.com/fresh/5".to_string()));
    }

    #[tokio::test]
    async fn test_full_day_is_a_no_op_without_provider_call() {
        let (db, company) = seeded_db().await;
        let day = date("2024-01-02");
        prefill(&db, &company, day, 90).await;

        let provider = Arc::new(StubNewsProvider::with_articles(day, fresh_articles("fresh", 10)));
        let backfill = NewsBackfill::new(db.clone(), provider.clone(), 90, 100);

        assert_eq!(backfill.ensure_news(&company, day, 90).await.unwrap(), 0);
        assert_eq!(provider.calls(), 0);
        assert_eq!(db.count_news(company.id, day).await.unwrap(), 90);
    }

    #[tokio::test]
    async fn test_query_uses_company_name_and_single_day() {
        let (db, company) = seeded_db().await;
        let day = date("2024-01-02");
        let provider = Arc::new(StubNewsProvider::default());
        let backfill = NewsBackfill::new(db, provider.clone(), 90, 100);

        backfill.ensure_news(&company, day, 90).await.unwrap();

        let queries = provider.queries.lock().unwrap();
        assert_eq!(queries.len(), 1);
        assert_eq!(queries[0], NewsQuery::single_day("Apple Inc.", day, 100));
    }

    #[tokio::test]
    async fn test_skips_missing_urls_and_duplicates() {
        let (db, company) = seeded_db().await;
        let day = date("2024-01-02");

        let mut articles = vec![
            article("https://news.example.com/a", "Apple beats"),
            NewsArticle {
                title: Some("no url".to_string()),
                ..Default::default()
            },
            article("", "blank url"),
            article("https://news.example.com/a", "same url again"),
            article("https://news.example.com/b", "Apple misses"),
        ];
        articles[0].description = Some("excellent quarter".to_string());
        let provider = Arc::new(StubNewsProvider::with_articles(day, articles));
        let backfill = NewsBackfill::new(db.clone(), provider, 90, 100);

        let added = backfill.ensure_news(&company, day, 90).await.unwrap();
        assert_eq!(added, 2);

        let urls = db.news_urls(company.id, day).await.unwrap();
        assert_eq!(urls, vec!["https://news.example.com/a", "https://news.example.com/b"]);
    }

    #[tokio::test]
    async fn test_second_run_adds_nothing() {
        let (db, company) = seeded_db().await;
        let day = date("2024-01-02");
        let provider = Arc::new(StubNewsProvider::with_articles(day, fresh_articles("x", 12)));
        let backfill = NewsBackfill::new(db.clone(), provider, 90, 100);

        assert_eq!(backfill.ensure_news(&company, day, 90).await.unwrap(), 12);
        assert_eq!(backfill.ensure_news(&company, day, 90).await.unwrap(), 0);
        assert_eq!(db.count_news(company.id, day).await.unwrap(), 12);
    }

    #[tokio::test]
    async fn test_concurrent_backfills_store_one_row_per_url() {
        let (db, company) = seeded_db().await;
        let day = date("2024-01-02");
        let shared = vec![article("https://news.example.com/shared", "Apple rally")];

        let first = NewsBackfill::new(db.clone(), Arc::new(StubNewsProvider::with_articles(day, shared.clone())), 90, 100);
        let second = NewsBackfill::new(db.clone(), Arc::new(StubNewsProvider::with_articles(day, shared)), 90, 100);

        let (a, b) = tokio::join!(
            first.ensure_news(&company, day, 90),
            second.ensure_news(&company, day, 90),
        );

        assert_eq!(a.unwrap() + b.unwrap(), 1);
        assert_eq!(db.news_urls(company.id, day).await.unwrap(), vec!["https://news.example.com/shared"]);
    }

    #[tokio::test]
    async fn test_overlapping_backfills_on_file_db() {
        let (db, company, _dir) = seeded_file_db().await;
        let day = date("2024-01-02");
        let provider = Arc::new(GatedNewsProvider {
            articles: fresh_articles("shared", 20),
            barrier: tokio::sync::Barrier::new(2),
        });

        let first = NewsBackfill::new(db.clone(), provider.clone(), 90, 100);
        let second = NewsBackfill::new(db.clone(), provider, 90, 100);

        // Both calls pass the pre-count and fetch before either opens its unit of work
        let (a, b) = tokio::join!(
            first.ensure_news(&company, day, 90),
            second.ensure_news(&company, day, 90),
        );
        let (a, b) = (a.unwrap(), b.unwrap());

        assert_eq!(a + b, 20);
        let mut urls = db.news_urls(company.id, day).await.unwrap();
        assert_eq!(urls.len(), 20);
        urls.sort();
        urls.dedup();
        assert_eq!(urls.len(), 20);
    }

    #[tokio::test]
    async fn test_parallel_companies_on_file_db() {
        let (db, apple, _dir) = seeded_file_db().await;
        let msft = db.upsert_company("MSFT", "Microsoft").await.unwrap();
        let day = date("2024-01-02");
        let provider = Arc::new(GatedNewsProvider {
            articles: fresh_articles("wire", 15),
            barrier: tokio::sync::Barrier::new(2),
        });
        let backfill = NewsBackfill::new(db.clone(), provider, 90, 100);

        let (a, b) = tokio::join!(
            backfill.ensure_news(&apple, day, 90),
            backfill.ensure_news(&msft, day, 90),
        );

        assert_eq!(a.unwrap(), 15);
        assert_eq!(b.unwrap(), 15);
        assert_eq!(db.count_news(apple.id, day).await.unwrap(), 15);
        assert_eq!(db.count_news(msft.id, day).await.unwrap(), 15);
    }

    #[tokio::test]
    async fn test_range_skips_failing_dates_and_continues() {
        let (db, company) = seeded_db().await;
        let d1 = date("2024-01-02");
        let d2 = date("2024-01-03");
        let d3 = date("2024-01-04");
        prefill(&db, &company, d3, 90).await;

        let mut provider = StubNewsProvider::with_articles(d1, fresh_articles("d1", 3));
        provider.failing.push(d2);
        let provider = Arc::new(provider);
        let backfill = NewsBackfill::new(db.clone(), provider.clone(), 90, 100);

        let report = backfill.ensure_news_range(&company, &[d1, d2, d3]).await;
        assert_eq!(
            report,
            NewsBackfillReport {
                dates_checked: 3,
                dates_skipped_full: 1,
                dates_failed: 1,
                articles_added: 3,
            }
        );
        assert_eq!(provider.calls(), 2);
        assert_eq!(db.count_news(company.id, d1).await.unwrap(), 3);
        assert_eq!(db.count_news(company.id, d2).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_sentiment_label_persisted() {
        let (db, company) = seeded_db().await;
        let day = date("2024-01-02");
        let provider = Arc::new(StubNewsProvider::with_articles(
            day,
            vec![
                article("https://n.example.com/up", "Apple shares surge on excellent results"),
                article("https://n.example.com/down", "Apple shares plunge after disappointing results"),
            ],
        ));
        let backfill = NewsBackfill::new(db.clone(), provider, 90, 100);
        backfill.ensure_news(&company, day, 90).await.unwrap();

        let mut uow = db.begin().await.unwrap();
        let counts = uow.sentiment_counts(company.id, day).await.unwrap();
        uow.commit().await.unwrap();
        assert_eq!(counts.positive, 1);
        assert_eq!(counts.negative, 1);
    }
}
