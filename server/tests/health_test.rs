//! HTTP tests for the auxiliary endpoints.

mod helpers;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use helpers::{body_to_json, TestApp};
use textline_server::config::Config;

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn test_health_reports_healthy() {
    let app = TestApp::new();
    let response = app.oneshot(get("/health")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_to_json(response).await;
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["store"], "memory");
    assert_eq!(json["rate_limiting"], true);
}

#[tokio::test]
async fn test_health_reports_invalid_config() {
    let mut config = Config::default_for_test();
    config.generator.api_key = None;
    let app = TestApp::with_config(config);

    let response = app.oneshot(get("/health")).await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let json = body_to_json(response).await;
    assert_eq!(json["status"], "unhealthy");
    assert_eq!(json["error"], "Configuration invalid");
}

#[tokio::test]
async fn test_root_descriptor() {
    let app = TestApp::new();
    let response = app.oneshot(get("/")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_to_json(response).await;
    assert_eq!(json["service"], "textline");
    assert_eq!(json["status"], "running");
    assert!(json["version"].is_string());
}
