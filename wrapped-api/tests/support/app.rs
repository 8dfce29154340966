use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::http::{Request, StatusCode};
use axum::Router;
use tower::ServiceExt;
use wrapped_api::{create_api_router, ApiConfig, AppState};
use wrapped_test_utils::{InMemorySummaryStore, ScriptedSource};

/// Router wired to an in-memory store and a scripted warehouse.
pub struct TestApp {
    pub router: Router,
    pub store: Arc<InMemorySummaryStore>,
    pub source: Arc<ScriptedSource>,
}

pub fn test_app(source: ScriptedSource) -> TestApp {
    let store = Arc::new(InMemorySummaryStore::new());
    let source = Arc::new(source);
    let state = AppState::new(store.clone(), source.clone());
    TestApp {
        router: create_api_router(state, &ApiConfig::default()),
        store,
        source,
    }
}

pub async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Bytes) {
    let response = router
        .clone()
        .oneshot(request)
        .await
        .expect("router is infallible");
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read response body");
    (status, body)
}

pub async fn get(router: &Router, uri: &str) -> (StatusCode, Bytes) {
    let request = Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("Failed to build request");
    send(router, request).await
}

pub async fn get_json(router: &Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let (status, body) = get(router, uri).await;
    let json = serde_json::from_slice(&body).expect("Response body is not JSON");
    (status, json)
}

pub fn summary_uri(address: &str) -> String {
    format!("/v1/wallet/{}/activity-summary", address)
}
