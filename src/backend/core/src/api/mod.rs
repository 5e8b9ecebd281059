//! Admin HTTP surface for the cache engine.
//!
//! # Endpoints
//!
//! - `GET /health` - liveness, never touches the store
//! - `GET /metrics` - Prometheus exposition
//! - `/api/v1/cache/...` - engine operations, see [`v1::v1_router`]
//!
//! Successful responses are wrapped in [`ApiResponse`]; failures are rendered
//! by the `IntoResponse` impl on [`CachetError`](crate::error::CachetError).

mod handlers;
pub mod v1;

use axum::{routing::get, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::cache::{CacheEngine, MaintenanceConfig, MaintenanceScheduler};
use crate::telemetry::MetricsRegistry;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<CacheEngine>,
    pub maintenance: Arc<MaintenanceScheduler>,
    pub metrics: MetricsRegistry,
}

impl AppState {
    pub fn new(
        engine: Arc<CacheEngine>,
        maintenance: Arc<MaintenanceScheduler>,
        metrics: MetricsRegistry,
    ) -> Self {
        Self {
            engine,
            maintenance,
            metrics,
        }
    }

    /// State around an engine with maintenance left unscheduled and metrics
    /// disabled. Used by tests and embedders.
    pub fn for_engine(engine: Arc<CacheEngine>) -> Self {
        let maintenance = Arc::new(MaintenanceScheduler::new(
            engine.clone(),
            MaintenanceConfig::default(),
        ));
        Self::new(engine, maintenance, MetricsRegistry::disabled())
    }
}

/// Build the API router.
///
/// ```rust,ignore
/// let state = AppState::new(engine, scheduler, metrics);
/// let app = build_router(state);
/// ```
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::liveness))
        .route("/metrics", get(handlers::prometheus_metrics))
        .nest(v1::V1_PREFIX, v1::v1_router())
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors)
        .with_state(state)
}

/// Envelope for successful responses.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            error_code: None,
        }
    }

    pub fn error_with_code(message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
            error_code: Some(code.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_response_success() {
        let response = ApiResponse::success("test data");
        assert!(response.success);
        assert_eq!(response.data, Some("test data"));
        assert!(response.error.is_none());
    }

    #[test]
    fn test_api_response_error_omits_data() {
        let response: ApiResponse<()> = ApiResponse::error_with_code("metrics disabled", "NOT_FOUND");
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error_code"], "NOT_FOUND");
        assert!(json.get("data").is_none());
    }
}
