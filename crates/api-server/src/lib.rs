//! HTTP surface for the forecast service.

pub mod forecast_routes;
pub mod news_routes;
pub mod request_id;

use axum::{
    http::{HeaderValue, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use forecast_core::{ForecastError, SystemClock};
use forecast_engine::{ForecastConfig, ForecastService};
use forecast_store::ForecastDb;
use ml_client::{HttpInferenceModel, MLConfig};
use newsapi_client::NewsApiClient;
use polygon_client::PolygonClient;
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};


const DEFAULT_LOG_FILTER: &str = "api_server=info,forecast_engine=info,polygon_client=warn,newsapi_client=warn";

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ForecastService>,
}

/// Handler error; serialized as `{"error": message}`
#[derive(Debug)]
pub struct AppError(pub ForecastError);

impl From<ForecastError> for AppError {
    fn from(err: ForecastError) -> Self {
        Self(err)
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            ForecastError::NotFound { .. } => StatusCode::NOT_FOUND,
            ForecastError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ForecastError::DegenerateInput { .. } | ForecastError::InsufficientData { .. } => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ForecastError::Provider { .. } | ForecastError::Inference { .. } => StatusCode::BAD_GATEWAY,
            ForecastError::Storage { .. } | ForecastError::DuplicateInsert { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self.0);
        } else {
            tracing::warn!("Request rejected: {}", self.0);
        }
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

/// Listener and CORS settings
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub cors_allow_origins: Vec<String>,
}

impl ServerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let port = match std::env::var("API_PORT") {
            Ok(raw) => raw
                .parse()
                .map_err(|_| anyhow::anyhow!("API_PORT must be a port number, got '{}'", raw))?,
            Err(_) => 3000,
        };

        Ok(Self {
            database_url: std::env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite:forecast.db".to_string()),
            host: std::env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port,
            cors_allow_origins: std::env::var("CORS_ALLOW_ORIGINS")
                .unwrap_or_else(|_| "*".to_string())
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
        })
    }

    pub fn cors_layer(&self) -> CorsLayer {
        let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
        if self.cors_allow_origins.is_empty() || self.cors_allow_origins.iter().any(|o| o == "*") {
            return layer.allow_origin(Any);
        }

        let origins: Vec<HeaderValue> = self
            .cors_allow_origins
            .iter()
            .filter_map(|o| match HeaderValue::from_str(o) {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!("Ignoring invalid CORS origin '{}'", o);
                    None
                }
            })
            .collect();
        layer.allow_origin(origins)
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// Routes plus request-id and tracing middleware, without CORS.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(forecast_routes::forecast_routes())
        .merge(news_routes::news_routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(request_id::request_id_middleware))
}

pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json_logs {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

pub async fn run_server() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let server_config = ServerConfig::from_env()?;
    let forecast_config = ForecastConfig::from_env()?;

    let db = ForecastDb::new(&server_config.database_url).await?;
    tracing::info!("Database ready at {}", server_config.database_url);

    let polygon_key = std::env::var("POLYGON_API_KEY").map_err(|_| anyhow::anyhow!("POLYGON_API_KEY must be set"))?;
    let rate_limit = std::env::var("POLYGON_RATE_LIMIT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(500);
    let polygon = PolygonClient::new(polygon_key, rate_limit);

    let news_key = std::env::var("NEWS_API_KEY").map_err(|_| anyhow::anyhow!("NEWS_API_KEY must be set"))?;
    let mut news = NewsApiClient::new(news_key);
    if let Ok(url) = std::env::var("NEWS_API_URL") {
        news = news.with_url(url);
    }

    let ml_config = MLConfig::default();
    let model = HttpInferenceModel::from_config(&ml_config, forecast_config.sequence_length);
    match model.health().await {
        Ok(true) => tracing::info!("Model '{}' is available at {}", ml_config.model_name, ml_config.model_url),
        _ => tracing::warn!(
            "Model '{}' at {} is not reachable yet; forecasts will fail until it is",
            ml_config.model_name,
            ml_config.model_url
        ),
    }

    let service = ForecastService::new(
        db,
        Arc::new(polygon),
        Arc::new(news),
        Arc::new(model),
        Arc::new(SystemClock),
        forecast_config,
    );
    let state = AppState {
        service: Arc::new(service),
    };

    let app = router(state).layer(server_config.cors_layer());

    let addr = format!("{}:{}", server_config.host, server_config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("API server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutting down");
}
