use chrono::NaiveDate;
use forecast_core::{Company, ForecastError, NewsItem, PriceRow, SentimentCounts};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use std::time::Duration;

use crate::db_error;
use crate::records::{CompanyRecord, NewsRecord, PriceRecord};
use crate::unit_of_work::UnitOfWork;

#[derive(Clone)]
pub struct ForecastDb {
    pool: SqlitePool,
}

impl ForecastDb {
    /// Connect and apply the schema.
    pub async fn new(database_url: &str) -> Result<Self, ForecastError> {
        let in_memory = database_url.contains(":memory:");

        let mut options = SqliteConnectOptions::from_str(database_url)
            .map_err(db_error("parse database url"))?
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5));
        if !in_memory {
            // WAL lets concurrent requests read while a backfill commits
            options = options.journal_mode(SqliteJournalMode::Wal);
        }

        // Every in-memory connection is its own database, so keep exactly one.
        let max_connections = if in_memory { 1 } else { 5 };

        let mut pool_options = SqlitePoolOptions::new().max_connections(max_connections);
        if in_memory {
            pool_options = pool_options.idle_timeout(None).max_lifetime(None);
        }

        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(db_error("connect"))?;

        let db = Self { pool };
        db.init_schema().await?;

        Ok(db)
    }

    /// Initialize database schema
    async fn init_schema(&self) -> Result<(), ForecastError> {
        let schema = include_str!("../../../schema.sql");

        // Execute schema (split by statement since sqlx doesn't support multiple statements)
        for statement in schema.split(';') {
            let stmt = statement.trim();
            if !stmt.is_empty() {
                sqlx::query(stmt)
                    .execute(&self.pool)
                    .await
                    .map_err(db_error("apply schema"))?;
            }
        }

        Ok(())
    }

    /// Get the database pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Start a unit of work. Writes become visible only once it is committed.
    ///
    /// Takes the write lock up front (`BEGIN IMMEDIATE`) so concurrent units of work
    /// queue on the busy timeout; a deferred read-then-write upgrade fails with
    /// `database is locked` as soon as another connection has committed.
    pub async fn begin(&self) -> Result<UnitOfWork, ForecastError> {
        let tx = self
            .pool
            .begin_with("BEGIN IMMEDIATE")
            .await
            .map_err(db_error("begin transaction"))?;
        Ok(UnitOfWork::new(tx))
    }

    /// Find a company by ticker symbol
    pub async fn lookup_company(&self, symbol: &str) -> Result<Option<Company>, ForecastError> {
        let record = sqlx::query_as::<_, CompanyRecord>(
            "SELECT id, symbol, name FROM companies WHERE symbol = ?",
        )
        .bind(symbol)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("lookup company"))?;

        Ok(record.map(Company::from))
    }

    /// Register a company, or rename it if the symbol is already known
    pub async fn upsert_company(&self, symbol: &str, name: &str) -> Result<Company, ForecastError> {
        let record = sqlx::query_as::<_, CompanyRecord>(
            r#"
            INSERT INTO companies (symbol, name)
            VALUES (?, ?)
            ON CONFLICT(symbol) DO UPDATE SET name = excluded.name
            RETURNING id, symbol, name
            "#,
        )
        .bind(symbol)
        .bind(name)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("upsert company"))?;

        Ok(record.into())
    }

    /// Number of stored news items for (company, date)
    pub async fn count_news(&self, company_id: i64, date: NaiveDate) -> Result<i64, ForecastError> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM news WHERE company_id = ? AND date = ?")
            .bind(company_id)
            .bind(date)
            .fetch_one(&self.pool)
            .await
            .map_err(db_error("count news"))
    }

    /// Price rows in `[start, end]`, ascending by date
    pub async fn price_rows(
        &self,
        company_id: i64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PriceRow>, ForecastError> {
        let records = sqlx::query_as::<_, PriceRecord>(
            r#"
            SELECT company_id, date, open, high, low, close, adj_close, volume,
                   news_positive_sentiment, news_negative_sentiment
            FROM stocks
            WHERE company_id = ? AND date >= ? AND date <= ?
            ORDER BY date
            "#,
        )
        .bind(company_id)
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("load price rows"))?;

        records.into_iter().map(PriceRow::try_from).collect()
    }

    /// Per-day sentiment counts in `[start, end]`, ascending, only for days that have news
    pub async fn sentiment_by_date(
        &self,
        company_id: i64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<(NaiveDate, SentimentCounts)>, ForecastError> {
        let rows: Vec<(NaiveDate, i64, i64)> = sqlx::query_as(
            r#"
            SELECT
                date,
                SUM(CASE WHEN sentiment = 1 THEN 1 ELSE 0 END),
                SUM(CASE WHEN sentiment = -1 THEN 1 ELSE 0 END)
            FROM news
            WHERE company_id = ? AND date >= ? AND date <= ?
            GROUP BY date
            ORDER BY date
            "#,
        )
        .bind(company_id)
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("aggregate sentiment by date"))?;

        Ok(rows
            .into_iter()
            .map(|(date, positive, negative)| (date, SentimentCounts { positive, negative }))
            .collect())
    }

    pub async fn count_news_between(
        &self,
        company_id: i64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<i64, ForecastError> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM news WHERE company_id = ? AND date >= ? AND date <= ?",
        )
        .bind(company_id)
        .bind(start)
        .bind(end)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("count news in range"))
    }

    /// One page of news in `[start, end]`, newest date first
    pub async fn news_page(
        &self,
        company_id: i64,
        start: NaiveDate,
        end: NaiveDate,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<NewsItem>, ForecastError> {
        let records = sqlx::query_as::<_, NewsRecord>(
            r#"
            SELECT company_id, date, url, source, author, title, description,
                   url_to_image, published_at, content, sentiment
            FROM news
            WHERE company_id = ? AND date >= ? AND date <= ?
            ORDER BY date DESC, id DESC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(company_id)
        .bind(start)
        .bind(end)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("load news page"))?;

        Ok(records.into_iter().map(NewsItem::from).collect())
    }

    /// Every stored news URL for (company, date), in insertion order
    pub async fn news_urls(&self, company_id: i64, date: NaiveDate) -> Result<Vec<String>, ForecastError> {
        sqlx::query_scalar::<_, String>(
            "SELECT url FROM news WHERE company_id = ? AND date = ? ORDER BY id",
        )
        .bind(company_id)
        .bind(date)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("list news urls"))
    }
}
