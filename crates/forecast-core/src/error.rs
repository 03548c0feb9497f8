use chrono::NaiveDate;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ForecastError {
    #[error("Symbol not found: {symbol}")]
    NotFound { symbol: String },

    #[error("{provider} request failed ({operation}): {message}")]
    Provider {
        provider: &'static str,
        operation: String,
        message: String,
    },

    #[error("News item already stored for company {company_id} on {date}: {url}")]
    DuplicateInsert {
        company_id: i64,
        date: NaiveDate,
        url: String,
    },

    #[error("Inference failed for {symbol} at forecast step {step}: {message}")]
    Inference {
        symbol: String,
        step: usize,
        message: String,
    },

    #[error("Flat price history for {symbol}: every close in the window is {price}")]
    DegenerateInput { symbol: String, price: f64 },

    #[error("Insufficient data for {symbol}: need {needed} price rows, have {available}")]
    InsufficientData {
        symbol: String,
        needed: usize,
        available: usize,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Storage error during {operation}: {message}")]
    Storage { operation: String, message: String },
}

impl ForecastError {
    pub fn provider(provider: &'static str, operation: impl Into<String>, message: impl ToString) -> Self {
        ForecastError::Provider {
            provider,
            operation: operation.into(),
            message: message.to_string(),
        }
    }

    pub fn storage(operation: impl Into<String>, message: impl ToString) -> Self {
        ForecastError::Storage {
            operation: operation.into(),
            message: message.to_string(),
        }
    }

    /// Duplicate inserts are absorbed by callers rather than surfaced.
    pub fn is_duplicate(&self) -> bool {
        matches!(self, ForecastError::DuplicateInsert { .. })
    }
}
