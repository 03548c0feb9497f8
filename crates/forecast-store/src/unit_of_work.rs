//! Scoped unit of work: every write the pipeline makes goes through one of
//! these, and nothing is visible to other connections until [`UnitOfWork::commit`].
//! Dropping it without committing rolls back.

use chrono::NaiveDate;
use forecast_core::{ForecastError, NewsItem, PriceRow, SentimentCounts};
use sqlx::{Sqlite, Transaction};

use crate::db_error;

pub struct UnitOfWork {
    tx: Transaction<'static, Sqlite>,
}

impl UnitOfWork {
    pub(crate) fn new(tx: Transaction<'static, Sqlite>) -> Self {
        Self { tx }
    }

    pub async fn commit(self) -> Result<(), ForecastError> {
        self.tx.commit().await.map_err(db_error("commit"))
    }

    pub async fn rollback(self) -> Result<(), ForecastError> {
        self.tx.rollback().await.map_err(db_error("rollback"))
    }

    /// Number of stored news items for (company, date)
    pub async fn count_news(&mut self, company_id: i64, date: NaiveDate) -> Result<i64, ForecastError> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM news WHERE company_id = ? AND date = ?")
            .bind(company_id)
            .bind(date)
            .fetch_one(&mut *self.tx)
            .await
            .map_err(db_error("count news"))
    }

    /// Insert a news item.
    ///
    /// Returns [`ForecastError::DuplicateInsert`] when (company, date, url) already
    /// exists, including rows committed concurrently by another request.
    pub async fn insert_news(&mut self, item: &NewsItem) -> Result<(), ForecastError> {
        let result = sqlx::query(
            r#"
            INSERT INTO news (company_id, date, url, source, author, title, description,
                              url_to_image, published_at, content, sentiment)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(company_id, date, url) DO NOTHING
            "#,
        )
        .bind(item.company_id)
        .bind(item.date)
        .bind(&item.url)
        .bind(&item.source)
        .bind(&item.author)
        .bind(&item.title)
        .bind(&item.description)
        .bind(&item.url_to_image)
        .bind(item.published_at)
        .bind(&item.content)
        .bind(item.sentiment.to_i64())
        .execute(&mut *self.tx)
        .await;

        let duplicate = || ForecastError::DuplicateInsert {
            company_id: item.company_id,
            date: item.date,
            url: item.url.clone(),
        };

        match result {
            Ok(done) if done.rows_affected() == 0 => Err(duplicate()),
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Err(duplicate()),
            Err(e) => Err(ForecastError::storage("insert news", e)),
        }
    }

    /// Insert a price row unless one already exists for (company, date).
    /// Returns whether a row was written; existing rows are never overwritten.
    pub async fn insert_price_row(&mut self, row: &PriceRow) -> Result<bool, ForecastError> {
        let result = sqlx::query(
            r#"
            INSERT INTO stocks (company_id, date, open, high, low, close, adj_close, volume,
                                news_positive_sentiment, news_negative_sentiment)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(company_id, date) DO NOTHING
            "#,
        )
        .bind(row.company_id)
        .bind(row.date)
        .bind(row.open.to_string())
        .bind(row.high.to_string())
        .bind(row.low.to_string())
        .bind(row.close.to_string())
        .bind(row.adj_close.map(|d| d.to_string()))
        .bind(row.volume)
        .bind(row.news_positive_sentiment)
        .bind(row.news_negative_sentiment)
        .execute(&mut *self.tx)
        .await
        .map_err(db_error("insert price row"))?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn sentiment_counts(
        &mut self,
        company_id: i64,
        date: NaiveDate,
    ) -> Result<SentimentCounts, ForecastError> {
        let (positive, negative): (i64, i64) = sqlx::query_as(
            r#"
            SELECT
                COALESCE(SUM(CASE WHEN sentiment = 1 THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN sentiment = -1 THEN 1 ELSE 0 END), 0)
            FROM news
            WHERE company_id = ? AND date = ?
            "#,
        )
        .bind(company_id)
        .bind(date)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(db_error("count sentiment"))?;

        Ok(SentimentCounts { positive, negative })
    }

    /// Overwrite the sentiment counts of an existing price row. Returns whether a row matched.
    pub async fn set_sentiment(
        &mut self,
        company_id: i64,
        date: NaiveDate,
        counts: SentimentCounts,
    ) -> Result<bool, ForecastError> {
        let result = sqlx::query(
            r#"
            UPDATE stocks
            SET news_positive_sentiment = ?, news_negative_sentiment = ?
            WHERE company_id = ? AND date = ?
            "#,
        )
        .bind(counts.positive)
        .bind(counts.negative)
        .bind(company_id)
        .bind(date)
        .execute(&mut *self.tx)
        .await
        .map_err(db_error("update sentiment"))?;

        Ok(result.rows_affected() > 0)
    }
}
