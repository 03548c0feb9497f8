//! Backfill, feature assembly and iterative forecasting for the price model.
//!
//! Request flow: [`PriceBackfill`] and [`NewsBackfill`] fill the store,
//! [`SentimentAggregator`] folds news counts onto price rows, [`build_window`]
//! assembles the normalized model input and [`IterativeForecaster`] rolls the
//! model forward. [`ForecastService`] wires the steps together per request.

pub mod aggregator;
pub mod config;
pub mod forecaster;
pub mod news_backfill;
pub mod price_backfill;
pub mod responses;
pub mod service;
pub mod window;

#[cfg(test)]
mod test_support;

pub use aggregator::SentimentAggregator;
pub use config::ForecastConfig;
pub use forecaster::IterativeForecaster;
pub use news_backfill::{NewsBackfill, NewsBackfillReport};
pub use price_backfill::PriceBackfill;
pub use responses::{NewsArticleSummary, NewsArticlesResponse, NewsSentimentResponse, PredictionResponse};
pub use service::ForecastService;
pub use window::build_window;
