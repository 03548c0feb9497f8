pub mod db;
pub mod records;
pub mod unit_of_work;

pub use db::ForecastDb;
pub use unit_of_work::UnitOfWork;

use forecast_core::ForecastError;

/// Wrap a sqlx failure with the operation it interrupted.
pub(crate) fn db_error(operation: &str) -> impl FnOnce(sqlx::Error) -> ForecastError + '_ {
    move |e| ForecastError::storage(operation, e)
}
