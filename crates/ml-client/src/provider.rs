use async_trait::async_trait;
use forecast_core::FeatureWindow;

use crate::error::{MLError, MLResult};
use crate::price_predictor::PricePredictorClient;
use crate::MLConfig;

/// Opaque sequence-model boundary: a fixed-shape window in, one normalized scalar out.
///
/// The forecaster only depends on this trait, so tests can substitute a deterministic stub.
#[async_trait]
pub trait InferenceModel: Send + Sync {
    async fn predict(&self, window: &FeatureWindow) -> MLResult<f64>;

    fn backend_name(&self) -> &'static str;
}

/// HTTP-backed implementation talking to a model server.
pub struct HttpInferenceModel {
    client: PricePredictorClient,
    sequence_length: usize,
}

impl HttpInferenceModel {
    pub fn new(client: PricePredictorClient, sequence_length: usize) -> Self {
        Self {
            client,
            sequence_length,
        }
    }

    pub fn from_config(config: &MLConfig, sequence_length: usize) -> Self {
        let client = PricePredictorClient::new(
            config.model_url.clone(),
            config.model_name.clone(),
            config.timeout,
        );
        Self::new(client, sequence_length)
    }

    pub async fn health(&self) -> MLResult<bool> {
        self.client.health().await
    }
}

#[async_trait]
impl InferenceModel for HttpInferenceModel {
    async fn predict(&self, window: &FeatureWindow) -> MLResult<f64> {
        if window.len() != self.sequence_length {
            return Err(MLError::InvalidInput(format!(
                "window has {} timesteps, model expects {}",
                window.len(),
                self.sequence_length
            )));
        }

        let value = self.client.predict(&window.to_tensor()).await?;
        tracing::debug!("Model returned {:.6}", value);
        Ok(value)
    }

    fn backend_name(&self) -> &'static str {
        "http"
    }
}
