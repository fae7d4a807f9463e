// BiasGuard Exporter - HTTP routes
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! HTTP surface for the rendering layer and for scrapers.

use crate::metrics::{encode_metrics, update_health_metrics, update_state_metrics};
use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use biasguard::{
    FeedHealth, HealthStatus, MonitorConfig, PresentationView, SharedHealth, StatePublisher,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

/// Application state shared across handlers.
pub struct AppState {
    pub publisher: Arc<StatePublisher>,
    pub health: SharedHealth,
    pub config: MonitorConfig,
    pub start_time: Instant,
}

/// Build the exporter router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/api/state", get(state_handler))
        .route("/metrics", get(metrics_handler))
        .route("/health", get(health_handler))
        .route("/ready", get(ready_handler))
        .route("/status", get(status_handler))
        .with_state(state)
}

/// Root handler - lists the endpoints.
async fn root_handler() -> Html<&'static str> {
    Html(
        r#"<!DOCTYPE html>
<html>
<head>
    <title>BiasGuard Exporter</title>
</head>
<body>
    <h1>BiasGuard Exporter</h1>
    <p>Federated learning fairness monitor.</p>
    <ul>
        <li><a href="/api/state">/api/state</a> - Presentation state (JSON)</li>
        <li><a href="/metrics">/metrics</a> - Prometheus metrics</li>
        <li><a href="/health">/health</a> - Health check</li>
        <li><a href="/ready">/ready</a> - Readiness check</li>
        <li><a href="/status">/status</a> - Feed status (JSON)</li>
    </ul>
</body>
</html>"#,
    )
}

/// Presentation state for the rendering layer.
async fn state_handler(State(state): State<Arc<AppState>>) -> Json<PresentationView> {
    Json(state.publisher.current().view())
}

/// Metrics handler - returns Prometheus text format.
async fn metrics_handler(State(state): State<Arc<AppState>>) -> Response {
    update_state_metrics(&state.publisher.current());
    update_health_metrics(&state.health.snapshot());

    match encode_metrics() {
        Ok(metrics) => (
            StatusCode::OK,
            [("Content-Type", "text/plain; charset=utf-8")],
            metrics,
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "failed to encode metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, "metrics encoding failed").into_response()
        }
    }
}

/// Health check handler.
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// Ready once the first snapshot has been committed.
async fn ready_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    if state.publisher.current().is_live() {
        (StatusCode::OK, "Ready")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "Connecting")
    }
}

/// Status information response.
#[derive(Serialize)]
struct StatusResponse {
    version: String,
    uptime_secs: u64,
    endpoint: String,
    triggering_node: String,
    bias_threshold: f64,
    status: HealthStatus,
    feed: FeedHealth,
}

/// Status handler - returns JSON status information.
async fn status_handler(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let feed = state.health.snapshot();
    Json(StatusResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        endpoint: state.config.metrics_url(),
        triggering_node: state.config.triggering_node.clone(),
        bias_threshold: state.config.bias_threshold,
        status: feed.status(),
        feed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use biasguard::{AlertRule, Snapshot};
    use tower::ServiceExt;

    fn app_state() -> Arc<AppState> {
        Arc::new(AppState {
            publisher: Arc::new(StatePublisher::default()),
            health: SharedHealth::default(),
            config: MonitorConfig::default(),
            start_time: Instant::now(),
        })
    }

    async fn get_body(state: Arc<AppState>, uri: &str) -> (StatusCode, String) {
        let response = router(state)
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    fn commit_round_two(state: &AppState) {
        state.publisher.apply(
            &Snapshot::new(2, 0.90)
                .with_client("Hospital A", 0.02)
                .with_client("Hospital B", 0.21),
            &AlertRule::default(),
            chrono::Utc::now(),
        );
    }

    #[tokio::test]
    async fn test_ready_before_and_after_first_commit() {
        let state = app_state();
        let (status, body) = get_body(Arc::clone(&state), "/ready").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body, "Connecting");

        commit_round_two(&state);
        let (status, _) = get_body(state, "/ready").await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_state_endpoint() {
        let state = app_state();
        let (_, body) = get_body(Arc::clone(&state), "/api/state").await;
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["phase"], "connecting");

        commit_round_two(&state);
        let (status, body) = get_body(state, "/api/state").await;
        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["phase"], "live");
        assert_eq!(json["round"], 2);
        assert_eq!(json["alert"]["triggered"], true);
        assert_eq!(json["history"][0]["round_label"], "R2");
    }

    #[tokio::test]
    async fn test_status_endpoint() {
        let (status, body) = get_body(app_state(), "/status").await;
        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["endpoint"], "http://127.0.0.1:8000/metrics");
        assert_eq!(json["triggering_node"], "Hospital B");
        assert_eq!(json["status"], "unknown");
        assert_eq!(json["feed"]["phase"], "connecting");
    }

    #[tokio::test]
    async fn test_metrics_endpoint() {
        let (status, body) = get_body(app_state(), "/metrics").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("biasguard_state_version"));
        assert!(body.contains("biasguard_feed_status"));
    }

    #[tokio::test]
    async fn test_health_and_root() {
        let (status, body) = get_body(app_state(), "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "OK");

        let (status, body) = get_body(app_state(), "/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("/api/state"));
    }
}
