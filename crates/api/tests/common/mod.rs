//! Shared harness for api integration tests.
//!
//! Builds the real application router over a [`MemoryJobStore`], so tests
//! exercise the full middleware stack without PostgreSQL. No workers are
//! spawned: submitted jobs stay `pending`, and tests that need terminal
//! jobs drive the store directly.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, Response, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use boltzq_api::config::ServerConfig;
use boltzq_api::router::build_app_router;
use boltzq_api::state::AppState;
use boltzq_db::store::MemoryJobStore;
use boltzq_worker::dispatcher::{Dispatcher, JobQueue};

/// A running test application.
///
/// Holds the consumer half of the job queue so `Dispatcher::enqueue` keeps
/// succeeding; dropping it would close the queue and turn every submission
/// into a 500.
pub struct TestApp {
    pub app: Router,
    pub store: Arc<MemoryJobStore>,
    _queue: JobQueue,
}

pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
    }
}

/// Build the full application router over an in-memory store.
pub fn build_test_app() -> TestApp {
    let store = Arc::new(MemoryJobStore::new());
    let (dispatcher, queue) = Dispatcher::channel();

    let state = AppState {
        store: Arc::clone(&store) as Arc<dyn boltzq_db::JobStore>,
        dispatcher,
        config: Arc::new(test_config()),
    };

    TestApp {
        app: build_app_router(state),
        store,
        _queue: queue,
    }
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

/// Send a GET request and return the response.
pub async fn get(app: &Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.clone().oneshot(request).await.unwrap()
}

/// Send a POST request with a JSON body and return the response.
pub async fn post_json(app: &Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    app.clone().oneshot(request).await.unwrap()
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Collect a response body as raw bytes.
pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

/// Assert a response is an error with the given status and `code` field.
pub async fn assert_error(response: Response<Body>, status: StatusCode, code: &str) {
    assert_eq!(response.status(), status);
    let json = body_json(response).await;
    assert_eq!(json["code"], code);
    assert!(json["error"].is_string());
}
