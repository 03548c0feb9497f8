use forecast_core::{ForecastError, N_FEATURES};

/// Tunables for the backfill and forecast pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastConfig {
    /// Timesteps in the model input window
    pub sequence_length: usize,
    /// Most recent price rows returned as history; also the set the price range is taken from
    pub history_length: usize,
    /// Number of trading days to predict
    pub forecast_steps: usize,
    /// News items wanted per (company, date) before the provider is skipped
    pub news_target_count: i64,
    /// Provider-side page size for a news search
    pub news_page_size: u32,
    /// Calendar days of news to backfill before a forecast
    pub news_lookback_days: i64,
    /// Calendar days of prices to backfill before a forecast
    pub price_lookback_days: i64,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            sequence_length: 30,
            history_length: 30,
            forecast_steps: 7,
            news_target_count: 90,
            news_page_size: 100,
            news_lookback_days: 30,
            price_lookback_days: 60,
        }
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> Result<T, ForecastError> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ForecastError::InvalidInput(format!("{} must be a number, got '{}'", key, raw))),
        Err(_) => Ok(default),
    }
}

impl ForecastConfig {
    /// Read overrides from the environment, falling back to the defaults.
    pub fn from_env() -> Result<Self, ForecastError> {
        let defaults = Self::default();

        let n_features: usize = env_or("N_FEATURES", N_FEATURES)?;
        if n_features != N_FEATURES {
            return Err(ForecastError::InvalidInput(format!(
                "N_FEATURES={} but the feature layout has {} columns",
                n_features, N_FEATURES
            )));
        }

        let sequence_length = env_or("SEQUENCE_LENGTH", defaults.sequence_length)?;
        let config = Self {
            sequence_length,
            history_length: env_or("HISTORY_LENGTH", defaults.history_length.max(sequence_length))?,
            forecast_steps: env_or("FORECAST_STEPS", defaults.forecast_steps)?,
            news_target_count: env_or("NEWS_TARGET_COUNT", defaults.news_target_count)?,
            news_page_size: env_or("NEWS_PAGE_SIZE", defaults.news_page_size)?,
            news_lookback_days: env_or("LOOKBACK_DAYS", defaults.news_lookback_days)?,
            price_lookback_days: env_or("PRICE_LOOKBACK_DAYS", defaults.price_lookback_days)?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ForecastError> {
        if self.sequence_length == 0 {
            return Err(ForecastError::InvalidInput("SEQUENCE_LENGTH must be positive".into()));
        }
        if self.history_length < self.sequence_length {
            return Err(ForecastError::InvalidInput(format!(
                "HISTORY_LENGTH ({}) must be at least SEQUENCE_LENGTH ({})",
                self.history_length, self.sequence_length
            )));
        }
        if self.news_lookback_days < 1 || self.price_lookback_days < 1 {
            return Err(ForecastError::InvalidInput("lookback windows must be at least one day".into()));
        }
        if self.news_page_size == 0 || self.news_page_size > 100 {
            return Err(ForecastError::InvalidInput("NEWS_PAGE_SIZE must be within 1..=100".into()));
        }
        Ok(())
    }
}
