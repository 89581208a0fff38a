//! HTTP route handlers: thin parameter mapping over the core service.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use log::error;
use serde::Deserialize;
use serde_json::json;
use tower_http::cors::CorsLayer;

use highcast_core::{
    CurrentSnapshot, ObservationOverrides, PredictionReport, PredictionService, ServiceError,
    UtcDateTime,
};

/// Query parameters accepted by the prediction endpoint. Every field
/// is optional; missing price fields are fetched or synthesized by the
/// core.
#[derive(Debug, Default, Deserialize)]
pub struct PredictParams {
    pub date: Option<String>,
    pub open_price: Option<f64>,
    pub high_price: Option<f64>,
    pub low_price: Option<f64>,
    pub close_price: Option<f64>,
    pub volume: Option<f64>,
    pub market_cap: Option<f64>,
}

impl PredictParams {
    fn overrides(&self) -> ObservationOverrides {
        ObservationOverrides {
            open: self.open_price,
            high: self.high_price,
            low: self.low_price,
            close: self.close_price,
            volume: self.volume,
            market_cap: self.market_cap,
        }
    }
}

/// Service-error to HTTP-status mapping.
pub struct ApiError(ServiceError);

impl From<ServiceError> for ApiError {
    fn from(error: ServiceError) -> Self {
        Self(error)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            ServiceError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ServiceError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ServiceError::Prediction(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("request failed: {}", self.0);
        }
        (status, Json(json!({ "detail": self.0.to_string() }))).into_response()
    }
}

pub fn router(service: Arc<PredictionService>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health/", get(health))
        .route("/predict/Bitcoin", get(predict))
        .route("/current/Bitcoin", get(current))
        .layer(CorsLayer::permissive())
        .with_state(service)
}

async fn root() -> Json<serde_json::Value> {
    Json(json!({
        "project": "Highcast",
        "description": "Predicts Bitcoin's next-day high price from daily OHLCV and market-cap observations.",
        "endpoints": {
            "/": "Project information",
            "/health/": "Health check",
            "/predict/Bitcoin": "Next-day high prediction",
            "/current/Bitcoin": "Latest market snapshot"
        },
        "predict_parameters": {
            "date": "YYYY-MM-DD, defaults to today",
            "open_price": "optional override",
            "high_price": "optional override",
            "low_price": "optional override",
            "close_price": "optional override",
            "volume": "optional override",
            "market_cap": "optional override"
        },
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": UtcDateTime::now().format_rfc3339()
    }))
}

async fn predict(
    State(service): State<Arc<PredictionService>>,
    Query(params): Query<PredictParams>,
) -> Result<Json<PredictionReport>, ApiError> {
    let report = service
        .predict(params.date.as_deref(), &params.overrides())
        .await?;
    Ok(Json(report))
}

async fn current(
    State(service): State<Arc<PredictionService>>,
) -> Result<Json<CurrentSnapshot>, ApiError> {
    let snapshot = service.current_snapshot().await?;
    Ok(Json(snapshot))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use highcast_core::{
        CoinGeckoSource, KrakenSource, ObservationFetcher, PredictionDispatcher,
        ScriptedHttpClient, TransformRegistry,
    };
    use tower::util::ServiceExt;

    fn offline_service() -> Arc<PredictionService> {
        // Both upstreams fail on every call; predictions still succeed
        // through the synthetic path.
        let ohlcv_client = ScriptedHttpClient::new();
        let cap_client = ScriptedHttpClient::new();
        let fetcher = ObservationFetcher::new(
            Arc::new(KrakenSource::new(Arc::new(ohlcv_client))),
            Arc::new(CoinGeckoSource::new(Arc::new(cap_client))),
        );
        let dispatcher = PredictionDispatcher::new(None, TransformRegistry::with_builtins());
        Arc::new(PredictionService::new(fetcher, dispatcher))
    }

    async fn get_status(path: &str) -> StatusCode {
        let app = router(offline_service());
        let response = app
            .oneshot(
                Request::builder()
                    .uri(path)
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        response.status()
    }

    #[tokio::test]
    async fn root_and_health_respond_ok() {
        assert_eq!(get_status("/").await, StatusCode::OK);
        assert_eq!(get_status("/health/").await, StatusCode::OK);
    }

    #[tokio::test]
    async fn predict_succeeds_with_all_upstreams_down() {
        let status = get_status(
            "/predict/Bitcoin?date=2023-01-01&open_price=30000&high_price=32000&low_price=29000&close_price=31000&volume=20000000&market_cap=600000000000",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn predict_rejects_malformed_date() {
        assert_eq!(
            get_status("/predict/Bitcoin?date=01-01-2023").await,
            StatusCode::BAD_REQUEST
        );
    }

    #[tokio::test]
    async fn current_maps_dead_upstream_to_bad_gateway() {
        assert_eq!(
            get_status("/current/Bitcoin").await,
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn error_statuses_follow_the_taxonomy() {
        use highcast_core::{PipelineError, SourceError, SourceId, ValidationError};

        let client = ApiError(ServiceError::InvalidInput(ValidationError::InvalidDate {
            value: "x".into(),
        }));
        assert_eq!(client.status(), StatusCode::BAD_REQUEST);

        let upstream = ApiError(ServiceError::Upstream(SourceError::unavailable(
            SourceId::Kraken,
            "down",
        )));
        assert_eq!(upstream.status(), StatusCode::BAD_GATEWAY);

        let internal = ApiError(ServiceError::Prediction(PipelineError::EmptyFrame));
        assert_eq!(internal.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
