use forecast_core::FeatureVector;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use crate::error::{MLError, MLResult};

#[derive(Debug, Clone, Serialize)]
struct PredictionRequest<'a> {
    instances: &'a [Vec<FeatureVector>],
}

#[derive(Debug, Clone, Deserialize)]
struct PredictionResponse {
    predictions: Vec<Vec<f64>>,
}

/// Client for a model server exposing `POST /v1/models/{name}:predict`.
#[derive(Clone)]
pub struct PricePredictorClient {
    client: reqwest::Client,
    base_url: String,
    model_name: String,
}

impl PricePredictorClient {
    pub fn new(base_url: String, model_name: String, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model_name,
        }
    }

    /// Run one forward pass over a `(batch, timesteps, features)` tensor and
    /// return the first output of the first batch entry.
    pub async fn predict(&self, tensor: &[Vec<FeatureVector>]) -> MLResult<f64> {
        let request = PredictionRequest { instances: tensor };

        let response = self
            .client
            .post(format!("{}/v1/models/{}:predict", self.base_url, self.model_name))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            if status == reqwest::StatusCode::SERVICE_UNAVAILABLE {
                return Err(MLError::ModelNotLoaded);
            }
            return Err(MLError::ServiceUnavailable(format!("Status: {}", status)));
        }

        let body = response.text().await?;
        first_output(&body)
    }

    /// Check model availability
    pub async fn health(&self) -> MLResult<bool> {
        let response = self
            .client
            .get(format!("{}/v1/models/{}", self.base_url, self.model_name))
            .send()
            .await?;

        Ok(response.status().is_success())
    }
}

fn first_output(body: &str) -> MLResult<f64> {
    let parsed: PredictionResponse = serde_json::from_str(body)?;
    let value = parsed
        .predictions
        .first()
        .and_then(|row| row.first())
        .copied()
        .ok_or_else(|| MLError::InvalidResponse("empty predictions".to_string()))?;

    if !value.is_finite() {
        return Err(MLError::InvalidResponse(format!("non-finite prediction {}", value)));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_output() {
        let value = first_output(r#"{"predictions": [[0.4213]]}"#).unwrap();
        assert!((value - 0.4213).abs() < 1e-12);
    }

    #[test]
    fn test_empty_predictions_rejected() {
        assert!(matches!(
            first_output(r#"{"predictions": []}"#),
            Err(MLError::InvalidResponse(_))
        ));
        assert!(matches!(
            first_output(r#"{"predictions": [[]]}"#),
            Err(MLError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_malformed_body_rejected() {
        assert!(matches!(
            first_output(r#"{"error": "bad input"}"#),
            Err(MLError::Serialization(_))
        ));
    }

    #[test]
    fn test_request_shape() {
        let tensor = vec![vec![[0.0; forecast_core::N_FEATURES]; 2]];
        let body = serde_json::to_value(PredictionRequest { instances: &tensor }).unwrap();
        let instances = body["instances"].as_array().unwrap();
        assert_eq!(instances.len(), 1);
        assert_eq!(instances[0].as_array().unwrap().len(), 2);
        assert_eq!(instances[0][0].as_array().unwrap().len(), forecast_core::N_FEATURES);
    }
}
