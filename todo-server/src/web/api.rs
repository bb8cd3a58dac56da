use std::sync::Arc;

use axum::{
    Json, Router,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Serialize;
use utoipa::{OpenApi, ToSchema};

use crate::todo::api::{TodoListResponse, TodoResponse, TodoState};
use crate::todo::validation::{Violation, ViolationCode};
use crate::todo::{NewTodo, Todo, TodoChanges, TodoServiceError};

pub const VALIDATION_ERROR_MESSAGE: &str = "Validation error";
pub const TODO_NOT_FOUND_MESSAGE: &str = "Todo not found";
pub const ROUTE_NOT_FOUND_MESSAGE: &str = "Route not found";
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

/// JSON envelope for every failed request.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Always `false`
    success: bool,
    /// Short human-readable description
    error: String,
    /// Per-field violations, only present for validation failures
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Vec<Violation>>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
            details: None,
        }
    }

    pub fn with_details(error: impl Into<String>, details: Vec<Violation>) -> Self {
        Self {
            success: false,
            error: error.into(),
            details: Some(details),
        }
    }
}

/// Every way a JSON API request can fail.
///
/// Validation and not-found outcomes are expected and answered as such; anything
/// else collapses into a generic 500 that never reveals its cause.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The request body broke the payload schema.
    #[error("Validation error")]
    Validation(Vec<Violation>),
    /// The targeted todo does not exist.
    #[error("Todo not found")]
    TodoNotFound,
    /// No route matches the request.
    #[error("Route not found")]
    RouteNotFound,
    /// The service layer failed.
    #[error("Service error: {0}")]
    Service(#[from] TodoServiceError),
    /// A handler panicked.
    #[error("Handler panicked: {0}")]
    Panic(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::TodoNotFound | ApiError::RouteNotFound => StatusCode::NOT_FOUND,
            ApiError::Service(_) | ApiError::Panic(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status_code = self.status_code();
        let body = match self {
            ApiError::Validation(violations) => {
                tracing::debug!("Rejected request payload: {:?}", violations);
                ErrorResponse::with_details(VALIDATION_ERROR_MESSAGE, violations)
            }
            ApiError::TodoNotFound => ErrorResponse::new(TODO_NOT_FOUND_MESSAGE),
            ApiError::RouteNotFound => ErrorResponse::new(ROUTE_NOT_FOUND_MESSAGE),
            ApiError::Service(_) | ApiError::Panic(_) => {
                tracing::error!("Unhandled error: {}", self);
                ErrorResponse::new(INTERNAL_ERROR_MESSAGE)
            }
        };
        (status_code, Json(body)).into_response()
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::todo::api::list_todos_handler,
        crate::todo::api::list_completed_todos_handler,
        crate::todo::api::list_pending_todos_handler,
        crate::todo::api::get_todo_handler,
        crate::todo::api::create_todo_handler,
        crate::todo::api::update_todo_handler,
        crate::todo::api::delete_todo_handler,
    ),
    components(schemas(
        Todo,
        NewTodo,
        TodoChanges,
        TodoResponse,
        TodoListResponse,
        ErrorResponse,
        Violation,
        ViolationCode
    )),
    tags((name = "Todos", description = "Todo management"))
)]
pub struct ApiDoc;

#[tracing::instrument]
pub async fn openapi_handler() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Creates the routes for the JSON API endpoints.
pub fn create_api_router(todo_state: Arc<TodoState>) -> Router {
    Router::new()
        .merge(crate::todo::api::create_api_router(todo_state))
        .route("/api-docs/openapi.json", get(openapi_handler))
}
