//! Integration tests for health check endpoints
//!
//! Tests the health check API routes to ensure proper responses
//! for liveness and readiness probes.

mod common;

use axum::{http::StatusCode, Router};

use common::*;
use dailyjam_api::routes::{health_router, HealthState};
use dailyjam_api::services::HealthService;

/// Health routes mounted the way the server mounts them
fn create_test_app() -> Router {
    let state = HealthState::new(HealthService::new(unreachable_pool()));
    Router::new().nest("/health", health_router(state))
}

#[tokio::test]
async fn test_simple_health_check() {
    let response = get(create_test_app(), "/health").await;

    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&body[..], b"OK");
}

#[tokio::test]
async fn test_liveness_probe() {
    let response = get(create_test_app(), "/health/live").await;

    assert_eq!(response.status(), StatusCode::OK);

    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(content_type.contains("application/json"));

    let json = body_json(response).await;
    assert_eq!(json["status"], "alive");
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn test_readiness_reports_unreachable_database() {
    let response = get(create_test_app(), "/health/ready").await;

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let json = body_json(response).await;
    assert_eq!(json["status"], "unhealthy");
    assert_eq!(json["services"][0]["name"], "database");
    assert_eq!(json["services"][0]["status"], "unhealthy");
    assert!(json["services"][0]["error"].is_string());
}

#[tokio::test]
async fn test_nonexistent_route_returns_404() {
    let response = get(create_test_app(), "/nonexistent").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
