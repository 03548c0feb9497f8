use chrono::NaiveDate;
use forecast_core::{
    calendar, feature, FeatureVector, FeatureWindow, ForecastError, ForecastPoint, ForecastResult, PriceRange,
    N_FEATURES,
};
use ml_client::InferenceModel;

/// Synthetic high/low offsets applied to each predicted close before it is fed back
const HIGH_FACTOR: f64 = 1.01;
const LOW_FACTOR: f64 = 0.99;

/// Rolls a single-step model forward, feeding each prediction back into the window.
pub struct IterativeForecaster<'a> {
    model: &'a dyn InferenceModel,
}

impl<'a> IterativeForecaster<'a> {
    pub fn new(model: &'a dyn InferenceModel) -> Self {
        Self { model }
    }

    /// Predict `steps` trading days after `last_known_date`.
    ///
    /// Each step de-normalizes the model output, then appends a synthetic feature
    /// vector built from it and drops the oldest step. The first inference failure
    /// aborts the whole forecast.
    pub async fn forecast(
        &self,
        symbol: &str,
        mut window: FeatureWindow,
        range: PriceRange,
        last_known_date: NaiveDate,
        steps: usize,
    ) -> Result<ForecastResult, ForecastError> {
        let mut points = Vec::with_capacity(steps);
        let mut date = last_known_date;

        for step in 1..=steps {
            let value = self.model.predict(&window).await.map_err(|e| ForecastError::Inference {
                symbol: symbol.to_string(),
                step,
                message: e.to_string(),
            })?;

            let price = range.denormalize(value);
            date = calendar::next_trading_day(date);
            points.push(ForecastPoint { date, price });

            let next = next_step(window.last(), range.normalize(price));
            window.shift(next);
        }

        tracing::debug!(
            "Forecast {} steps for {} using {} model",
            points.len(),
            symbol,
            self.model.backend_name()
        );
        Ok(ForecastResult { points })
    }
}

fn next_step(previous: Option<&FeatureVector>, norm: f64) -> FeatureVector {
    let mut next: FeatureVector = [0.0; N_FEATURES];
    next[feature::OPEN] = norm;
    next[feature::HIGH] = norm * HIGH_FACTOR;
    next[feature::LOW] = norm * LOW_FACTOR;
    next[feature::CLOSE] = norm;
    if let Some(prev) = previous {
        next[feature::VOLUME] = prev[feature::VOLUME];
        next[feature::POSITIVE] = prev[feature::POSITIVE];
        next[feature::NEGATIVE] = prev[feature::NEGATIVE];
    }
    next
}
