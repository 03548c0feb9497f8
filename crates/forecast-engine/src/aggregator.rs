use chrono::NaiveDate;
use forecast_core::{Company, ForecastError};
use forecast_store::ForecastDb;

/// Copies per-day news sentiment counts onto the matching price rows.
pub struct SentimentAggregator {
    db: ForecastDb,
}

impl SentimentAggregator {
    pub fn new(db: ForecastDb) -> Self {
        Self { db }
    }

    /// Overwrite positive/negative counts on each date's price row (0 when the day has
    /// no news). Dates without a price row are skipped, never created. Returns the
    /// number of price rows updated.
    pub async fn aggregate_sentiment(&self, company: &Company, dates: &[NaiveDate]) -> Result<usize, ForecastError> {
        let mut uow = self.db.begin().await?;
        let mut updated = 0usize;

        for &date in dates {
            let counts = uow.sentiment_counts(company.id, date).await?;
            if uow.set_sentiment(company.id, date, counts).await? {
                updated += 1;
            }
        }

        uow.commit().await?;
        tracing::debug!("Updated sentiment on {} price rows for {}", updated, company.symbol);
        Ok(updated)
    }
}
