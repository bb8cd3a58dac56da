#![allow(dead_code)]

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use todo_server::todo::TodoService;
use todo_server::todo::repository::{InMemoryTodoRepository, TodoRepository};
use todo_server::web::create_app;
use tower::ServiceExt;

/// Test context holding the app and the store behind it.
pub struct TestContext {
    pub app: Router,
    pub repository: Arc<InMemoryTodoRepository>,
}

impl TestContext {
    /// Sends a request to a fresh clone of the app.
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        body: Option<serde_json::Value>,
    ) -> TestResponse {
        send(&self.app, method, uri, body).await
    }

    /// Creates a todo through the API and returns its JSON representation.
    pub async fn create_todo(&self, body: serde_json::Value) -> serde_json::Value {
        let response = self.send(Method::POST, "/api/todos", Some(body)).await;
        assert_eq!(response.status, StatusCode::CREATED);
        response.json()["data"].clone()
    }
}

/// Service-level test context, without the HTTP layer.
pub struct ServiceTestContext {
    pub repository: Arc<InMemoryTodoRepository>,
    pub service: TodoService,
}

fn init_tracing() {
    // Allow multiple calls to init for tests.
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// Sets up an app backed by an empty in-memory store.
pub fn setup() -> TestContext {
    init_tracing();
    let repository = Arc::new(InMemoryTodoRepository::new());
    let app = create_app(repository.clone() as Arc<dyn TodoRepository>);
    TestContext { app, repository }
}

/// Sets up a service backed by an empty in-memory store.
pub fn setup_service() -> ServiceTestContext {
    init_tracing();
    let repository = Arc::new(InMemoryTodoRepository::new());
    let service = TodoService::new(repository.clone());
    ServiceTestContext {
        repository,
        service,
    }
}

/// A buffered HTTP response.
pub struct TestResponse {
    pub status: StatusCode,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl TestResponse {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).expect("response body is not JSON")
    }
}

pub async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    body: Option<serde_json::Value>,
) -> TestResponse {
    let request = match body {
        Some(json) => Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap(),
    };
    send_request(app, request).await
}

pub async fn send_request(app: &Router, request: Request<Body>) -> TestResponse {
    let response = app.clone().oneshot(request).await.unwrap();

    let status = response.status();
    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec();
    TestResponse {
        status,
        content_type,
        body,
    }
}

/// One entry of an error envelope's `details`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ViolationSnapshot {
    pub code: String,
    pub path: Vec<String>,
    pub message: String,
}

/// Error envelope, typed so that snapshots keep the wire field order.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBodySnapshot {
    pub success: bool,
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<ViolationSnapshot>>,
}

/// HTTP error response snapshot for testing endpoints.
#[derive(Debug, Serialize)]
pub struct HttpResponseSnapshot {
    test_context: String,
    status: u16,
    content_type: Option<String>,
    body: ErrorBodySnapshot,
}

impl HttpResponseSnapshot {
    pub fn new(response: &TestResponse, test_context: &str) -> Self {
        Self {
            test_context: test_context.to_string(),
            status: response.status.as_u16(),
            content_type: response.content_type.clone(),
            body: serde_json::from_slice(&response.body)
                .expect("response body is not an error envelope"),
        }
    }
}
