//! Failure injection tests: handlers that fail in each category.

use axum::http::StatusCode;
use axum::middleware::from_fn;
use axum::routing::get;
use axum::Router;
use lead_scoring_service::http::middleware::handle_failures;
use lead_scoring_service::http::server::{default_interceptors, with_middleware};
use lead_scoring_service::AppError;
use serde_json::Value;

mod common;

async fn conflict() -> Result<String, AppError> {
    Err(AppError::http(StatusCode::CONFLICT, "Lead already scored"))
}

async fn unavailable() -> Result<String, AppError> {
    Err(AppError::http(StatusCode::SERVICE_UNAVAILABLE, "Model not loaded"))
}

async fn broken() -> Result<String, AppError> {
    let parsed: Result<u32, _> = "not-a-number".parse::<u32>();
    let value = parsed.map_err(AppError::internal)?;
    Ok(value.to_string())
}

async fn panics() -> String {
    let features: Vec<f64> = Vec::new();
    format!("{}", features[3])
}

fn failing_routes() -> Router {
    Router::new()
        .route("/conflict", get(conflict))
        .route("/unavailable", get(unavailable))
        .route("/broken", get(broken))
        .route("/panics", get(panics))
}

async fn fetch(app: &common::TestApp, path: &str) -> (StatusCode, Option<String>, Value) {
    let res = app.client.get(app.url(path)).send().await.unwrap();
    let status = StatusCode::from_u16(res.status().as_u16()).unwrap();
    let id = res
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    (status, id, res.json().await.unwrap())
}

#[tokio::test]
async fn test_explicit_http_failures() {
    let app = common::spawn_router(with_middleware(failing_routes(), default_interceptors())).await;

    let (status, id, body) = fetch(&app, "/conflict").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "http_error");
    assert_eq!(body["message"], "Lead already scored");
    assert_eq!(body["request_id"].as_str(), id.as_deref());

    let (status, _, body) = fetch(&app, "/unavailable").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["message"], "Model not loaded");
}

#[tokio::test]
async fn test_internal_failures_hide_details() {
    let app = common::spawn_router(with_middleware(failing_routes(), default_interceptors())).await;

    for path in ["/broken", "/panics"] {
        let (status, id, body) = fetch(&app, path).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR, "{path}");
        assert_eq!(body["error"], "internal_error");
        assert_eq!(body["message"], "An internal server error occurred");
        assert_eq!(body["request_id"].as_str(), id.as_deref());

        let text = body.to_string();
        assert!(!text.contains("invalid digit"), "{path} leaked details: {text}");
        assert!(!text.contains("index out of bounds"), "{path} leaked details: {text}");
    }
}

#[tokio::test]
async fn test_server_survives_failures() {
    let app = common::spawn_router(with_middleware(failing_routes(), default_interceptors())).await;

    for _ in 0..3 {
        let (status, _, _) = fetch(&app, "/panics").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }
    let (status, _, _) = fetch(&app, "/conflict").await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_request_id_defaults_without_interceptor() {
    let router = failing_routes()
        .fallback(|| async { AppError::not_found() })
        .layer(from_fn(handle_failures));
    let app = common::spawn_router(router).await;

    for path in ["/conflict", "/broken", "/nowhere"] {
        let (_, id, body) = fetch(&app, path).await;
        assert!(id.is_none());
        assert_eq!(body["request_id"], "unknown", "{path}");
    }
}
