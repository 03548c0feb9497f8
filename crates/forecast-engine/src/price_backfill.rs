use chrono::NaiveDate;
use forecast_core::{Company, ForecastError, MarketDataProvider, PriceRow};
use forecast_store::ForecastDb;
use std::sync::Arc;

/// Inserts missing daily price rows from a market-data provider.
pub struct PriceBackfill {
    db: ForecastDb,
    provider: Arc<dyn MarketDataProvider>,
}

impl PriceBackfill {
    pub fn new(db: ForecastDb, provider: Arc<dyn MarketDataProvider>) -> Self {
        Self { db, provider }
    }

    /// Fetch bars for `[start, end]` and store those without a row yet. Existing rows
    /// are left untouched. Returns the number of rows inserted.
    pub async fn ensure_prices(
        &self,
        company: &Company,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<usize, ForecastError> {
        let bars = self.provider.daily_bars(&company.symbol, start, end).await?;

        let mut uow = self.db.begin().await?;
        let mut inserted = 0usize;
        for bar in &bars {
            if uow.insert_price_row(&PriceRow::from_bar(company.id, bar)).await? {
                inserted += 1;
            }
        }
        uow.commit().await?;

        tracing::info!(
            "Stored {} new price rows for {} between {} and {} ({} bars fetched)",
            inserted,
            company.symbol,
            start,
            end,
            bars.len()
        );
        Ok(inserted)
    }
}
