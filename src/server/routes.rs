//! HTTP API routes
//!
//! Defines all REST API endpoints for the server.

use crate::cache::CacheStats;
use crate::climate::ClimateSummary;
use crate::geo::{TrailCollection, TrailFeature};
use crate::server::state::AppState;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::debug;

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/climate", post(climate_handler))
        .route("/api/climate/batch", post(batch_handler))
        .route("/api/climate/here", get(here_handler))
        .route("/api/status", get(status_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// API error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: String,
    pub code: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (StatusCode::BAD_REQUEST, Json(self)).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError {
            error: rejection.body_text(),
            code: "INVALID_BODY".to_string(),
        }
    }
}

/// Climate summary for a single trail feature
///
/// POST /api/climate
///
/// Geometry problems are not errors here: the summary falls back to the
/// default location. Only a body that is not a JSON object is rejected.
async fn climate_handler(
    State(state): State<Arc<AppState>>,
    body: Result<Json<TrailFeature>, JsonRejection>,
) -> Result<Json<ClimateSummary>, ApiError> {
    let Json(feature) = body?;
    Ok(Json(state.resolver.resolve(&feature).await))
}

/// Batch response
#[derive(Debug, Serialize, Deserialize)]
pub struct BatchResponse {
    pub summaries: Vec<ClimateSummary>,
}

/// Climate summaries for every feature of a collection, in input order
///
/// POST /api/climate/batch
async fn batch_handler(
    State(state): State<Arc<AppState>>,
    body: Result<Json<TrailCollection>, JsonRejection>,
) -> Result<Json<BatchResponse>, ApiError> {
    let Json(collection) = body?;
    debug!(features = collection.features.len(), "batch request");

    let summaries = state.resolver.resolve_collection(&collection.features).await;
    Ok(Json(BatchResponse { summaries }))
}

/// Climate summary for the caller's approximate location
///
/// GET /api/climate/here
async fn here_handler(State(state): State<Arc<AppState>>) -> Json<ClimateSummary> {
    Json(state.resolver.resolve_without_geometry().await)
}

/// Status response
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    /// Server is running
    pub running: bool,
    /// Server version
    pub version: String,
    /// Uptime in seconds
    pub uptime_secs: u64,
    /// Cache counters keyed by store name
    pub caches: BTreeMap<String, CacheStats>,
}

/// Server status endpoint
///
/// GET /api/status
async fn status_handler(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let caches = state
        .resolver
        .cache_stats()
        .into_iter()
        .map(|stats| (stats.name.clone(), stats))
        .collect();

    Json(StatusResponse {
        running: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.uptime_secs(),
        caches,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::climate::{ClimateStatus, FixedClock};
    use crate::config::Config;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use chrono::NaiveDate;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn create_test_state() -> Arc<AppState> {
        let mut config = Config::default();
        config.services.region_url = "http://127.0.0.1:1/area".to_string();
        config.services.observations_url = "http://127.0.0.1:1/data".to_string();
        config.services.ip_location_url = "http://127.0.0.1:1/ip".to_string();
        config.fetch.timeout_ms = 1_000;
        config.fetch.lookup_timeout_ms = 500;

        let clock = Arc::new(FixedClock(NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()));
        Arc::new(AppState::with_clock(config, clock).unwrap())
    }

    fn post_json(uri: &str, body: String) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("Content-Type", "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_status_endpoint() {
        let state = create_test_state();
        let app = create_router(state);

        let response = app
            .oneshot(Request::builder().uri("/api/status").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let status: StatusResponse = serde_json::from_slice(&body).unwrap();

        assert!(status.running);
        assert_eq!(status.version, env!("CARGO_PKG_VERSION"));
        let names: Vec<&str> = status.caches.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["observations", "regions", "summaries"]);
    }

    #[tokio::test]
    async fn test_climate_endpoint() {
        let state = create_test_state();
        let app = create_router(state);

        let request_body = serde_json::json!({
            "type": "Feature",
            "geometry": {
                "type": "MultiLineString",
                "coordinates": [[[-79.96, 39.63, 280.0], [-79.95, 39.64, 290.0]]]
            },
            "properties": {"Name": "Deckers Creek Trail"}
        });

        let response = app
            .oneshot(post_json("/api/climate", request_body.to_string()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let summary: ClimateSummary = serde_json::from_slice(&body).unwrap();

        assert_eq!(summary.trail_name, "Deckers Creek Trail");
        assert_eq!(summary.status, ClimateStatus::SyntheticNoData);
        assert!(summary.temperature.is_ordered());
    }

    #[tokio::test]
    async fn test_climate_endpoint_without_geometry() {
        let state = create_test_state();
        let app = create_router(state);

        let response = app
            .oneshot(post_json("/api/climate", "{}".to_string()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let summary: ClimateSummary = serde_json::from_slice(&body).unwrap();
        assert_eq!(summary.trail_name, "Unnamed Trail");
    }

    #[tokio::test]
    async fn test_climate_endpoint_rejects_malformed_body() {
        let state = create_test_state();
        let app = create_router(state);

        let response = app
            .oneshot(post_json("/api/climate", "not json".to_string()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let err: ApiError = serde_json::from_slice(&body).unwrap();
        assert_eq!(err.code, "INVALID_BODY");
    }

    #[tokio::test]
    async fn test_batch_endpoint_preserves_order() {
        let state = create_test_state();
        let app = create_router(state);

        let request_body = serde_json::json!({
            "type": "FeatureCollection",
            "features": [
                {"properties": {"Name": "North Loop"}},
                {"properties": {}},
                {"properties": {"trailName": "South Loop"}}
            ]
        });

        let response = app
            .oneshot(post_json("/api/climate/batch", request_body.to_string()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let batch: BatchResponse = serde_json::from_slice(&body).unwrap();

        let names: Vec<&str> = batch.summaries.iter().map(|s| s.trail_name.as_str()).collect();
        assert_eq!(names, vec!["North Loop", "Trail 2", "South Loop"]);
    }

    #[tokio::test]
    async fn test_here_endpoint() {
        let state = create_test_state();
        let app = create_router(state);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/climate/here")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let summary: ClimateSummary = serde_json::from_slice(&body).unwrap();
        assert_eq!(summary.trail_name, "ZIP 26505");
        assert!(summary.status.is_synthetic());
    }
}
