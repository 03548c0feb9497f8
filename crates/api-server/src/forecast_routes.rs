//! Forecast Routes

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use forecast_engine::PredictionResponse;

use crate::{AppError, AppState};

pub fn forecast_routes() -> Router<AppState> {
    Router::new().route("/predict-using-gru/:symbol", get(predict))
}

async fn predict(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> Result<Json<PredictionResponse>, AppError> {
    let response = state.service.predict(&symbol).await?;
    Ok(Json(response))
}
