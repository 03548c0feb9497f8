use forecast_core::{feature, FeatureVector, FeatureWindow, ForecastError, PriceRange, PriceRow, N_FEATURES};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

fn as_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(0.0)
}

/// Build the model input from price rows (ascending by date).
///
/// The price range is the min/max close over every row given; the window holds the
/// most recent `length` rows with OHLC min-max normalized against that range. Volume
/// and sentiment counts are passed through raw, missing sentiment as 0.
pub fn build_window(
    symbol: &str,
    rows: &[PriceRow],
    length: usize,
) -> Result<(FeatureWindow, PriceRange), ForecastError> {
    if length == 0 || rows.len() < length {
        return Err(ForecastError::InsufficientData {
            symbol: symbol.to_string(),
            needed: length,
            available: rows.len(),
        });
    }

    let closes = rows.iter().map(|r| as_f64(r.close));
    let (min, max) = closes.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), c| (lo.min(c), hi.max(c)));

    if max <= min {
        return Err(ForecastError::DegenerateInput {
            symbol: symbol.to_string(),
            price: min,
        });
    }
    let range = PriceRange { min, max };

    let steps = rows[rows.len() - length..]
        .iter()
        .map(|row| {
            let mut step: FeatureVector = [0.0; N_FEATURES];
            step[feature::OPEN] = range.normalize(as_f64(row.open));
            step[feature::HIGH] = range.normalize(as_f64(row.high));
            step[feature::LOW] = range.normalize(as_f64(row.low));
            step[feature::CLOSE] = range.normalize(as_f64(row.close));
            step[feature::VOLUME] = row.volume as f64;
            step[feature::POSITIVE] = row.news_positive_sentiment.unwrap_or(0) as f64;
            step[feature::NEGATIVE] = row.news_negative_sentiment.unwrap_or(0) as f64;
            step
        })
        .collect();

    Ok((FeatureWindow::new(steps), range))
}
