pub mod error;
pub mod price_predictor;
pub mod provider;

pub use error::{MLError, MLResult};
pub use price_predictor::PricePredictorClient;
pub use provider::{HttpInferenceModel, InferenceModel};

use std::time::Duration;

/// Configuration for the model server
#[derive(Debug, Clone)]
pub struct MLConfig {
    pub model_url: String,
    pub model_name: String,
    pub timeout: Duration,
}

impl Default for MLConfig {
    fn default() -> Self {
        Self {
            model_url: std::env::var("MODEL_URL")
                .unwrap_or_else(|_| "http://localhost:8501".to_string()),
            model_name: std::env::var("MODEL_NAME")
                .unwrap_or_else(|_| "gru_model".to_string()),
            timeout: Duration::from_secs(
                std::env::var("MODEL_TIMEOUT_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(10),
            ),
        }
    }
}
