use axum::extract::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use std::any::Any;

use crate::web::api::ApiError;

/// Logs the method and URI of every incoming request.
pub async fn log_request_middleware(request: Request, next: Next) -> Response {
    tracing::info!("{} {}", request.method(), request.uri());
    next.run(request).await
}

/// Turns a panic that escaped a handler into the generic 500 response.
pub fn handle_panic(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else {
        "unknown panic payload".to_string()
    };
    ApiError::Panic(detail).into_response()
}
