use crate::todo::validation::{self, Violation};
use crate::todo::{NewTodo, Todo, TodoChanges, TodoService};
use crate::web::api::{ApiError, ErrorResponse};
use axum::{
    Json, Router,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
    routing::get,
};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use utoipa::ToSchema;

#[derive(Clone)]
pub struct TodoState {
    pub service: TodoService,
}

impl TodoState {
    pub fn new(service: TodoService) -> Self {
        Self { service }
    }
}

/// API response wrapping a single todo.
#[derive(Debug, Serialize, ToSchema)]
pub struct TodoResponse {
    success: bool,
    data: Todo,
}

impl TodoResponse {
    fn new(todo: Todo) -> Self {
        Self {
            success: true,
            data: todo,
        }
    }
}

/// API response for listing todos.
#[derive(Debug, Serialize, ToSchema)]
pub struct TodoListResponse {
    success: bool,
    /// List of todos
    data: Vec<Todo>,
    /// Number of todos in `data`
    count: usize,
}

impl TodoListResponse {
    fn new(todos: Vec<Todo>) -> Self {
        Self {
            success: true,
            count: todos.len(),
            data: todos,
        }
    }
}

/// Turns a body that could not be read as JSON into a validation failure.
fn read_payload(payload: Result<Json<Value>, JsonRejection>) -> Result<Value, ApiError> {
    payload.map(|Json(value)| value).map_err(|rejection| {
        ApiError::Validation(vec![Violation::invalid_json(rejection.body_text())])
    })
}

/// An id segment that cannot be decoded was never issued by the store.
fn read_id(path: Result<Path<String>, PathRejection>) -> Result<String, ApiError> {
    path.map(|Path(id)| id).map_err(|rejection| {
        tracing::debug!("Rejected todo id: {}", rejection.body_text());
        ApiError::TodoNotFound
    })
}

/// Handler for GET /api/todos - Returns all todos.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    get,
    path = "/api/todos",
    responses(
        (status = 200, description = "Successfully retrieved todos", body = TodoListResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Todos"
)]
pub async fn list_todos_handler(
    State(state): State<Arc<TodoState>>,
) -> Result<Json<TodoListResponse>, ApiError> {
    let todos = state
        .service
        .get_all_todos()
        .await
        .inspect_err(|err| tracing::error!("Error getting all todos: {}", err))?;
    Ok(Json(TodoListResponse::new(todos)))
}

/// Handler for GET /api/todos/completed
#[tracing::instrument(skip(state))]
#[utoipa::path(
    get,
    path = "/api/todos/completed",
    responses(
        (status = 200, description = "Successfully retrieved completed todos", body = TodoListResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Todos"
)]
pub async fn list_completed_todos_handler(
    State(state): State<Arc<TodoState>>,
) -> Result<Json<TodoListResponse>, ApiError> {
    let todos = state
        .service
        .get_completed_todos()
        .await
        .inspect_err(|err| tracing::error!("Error getting completed todos: {}", err))?;
    Ok(Json(TodoListResponse::new(todos)))
}

/// Handler for GET /api/todos/pending
#[tracing::instrument(skip(state))]
#[utoipa::path(
    get,
    path = "/api/todos/pending",
    responses(
        (status = 200, description = "Successfully retrieved pending todos", body = TodoListResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Todos"
)]
pub async fn list_pending_todos_handler(
    State(state): State<Arc<TodoState>>,
) -> Result<Json<TodoListResponse>, ApiError> {
    let todos = state
        .service
        .get_pending_todos()
        .await
        .inspect_err(|err| tracing::error!("Error getting pending todos: {}", err))?;
    Ok(Json(TodoListResponse::new(todos)))
}

/// Handler for GET /api/todos/{id}
#[tracing::instrument(skip(state, path))]
#[utoipa::path(
    get,
    path = "/api/todos/{id}",
    params(("id" = String, Path, description = "Todo ID")),
    responses(
        (status = 200, description = "Todo found", body = TodoResponse),
        (status = 404, description = "Todo not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Todos"
)]
pub async fn get_todo_handler(
    State(state): State<Arc<TodoState>>,
    path: Result<Path<String>, PathRejection>,
) -> Result<Json<TodoResponse>, ApiError> {
    let id = read_id(path)?;
    let todo = state
        .service
        .get_todo_by_id(&id)
        .await
        .inspect_err(|err| tracing::error!("Error getting todo by id: {}", err))?
        .ok_or(ApiError::TodoNotFound)?;
    Ok(Json(TodoResponse::new(todo)))
}

/// Handler for POST /api/todos
///
/// The payload is validated before the service is called.
#[tracing::instrument(skip(state, payload))]
#[utoipa::path(
    post,
    path = "/api/todos",
    request_body = NewTodo,
    responses(
        (status = 201, description = "Todo created", body = TodoResponse),
        (status = 400, description = "Validation error", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Todos"
)]
pub async fn create_todo_handler(
    State(state): State<Arc<TodoState>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<TodoResponse>), ApiError> {
    let new_todo =
        validation::validate_create(&read_payload(payload)?).map_err(ApiError::Validation)?;
    let todo = state
        .service
        .create_todo(new_todo)
        .await
        .inspect_err(|err| tracing::error!("Error creating todo: {}", err))?;
    Ok((StatusCode::CREATED, Json(TodoResponse::new(todo))))
}

/// Handler for PUT /api/todos/{id}
#[tracing::instrument(skip(state, path, payload))]
#[utoipa::path(
    put,
    path = "/api/todos/{id}",
    params(("id" = String, Path, description = "Todo ID")),
    request_body = TodoChanges,
    responses(
        (status = 200, description = "Todo updated", body = TodoResponse),
        (status = 400, description = "Validation error", body = ErrorResponse),
        (status = 404, description = "Todo not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Todos"
)]
pub async fn update_todo_handler(
    State(state): State<Arc<TodoState>>,
    path: Result<Path<String>, PathRejection>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<TodoResponse>, ApiError> {
    let changes =
        validation::validate_update(&read_payload(payload)?).map_err(ApiError::Validation)?;
    let id = read_id(path)?;
    let todo = state
        .service
        .update_todo(&id, changes)
        .await
        .inspect_err(|err| tracing::error!("Error updating todo: {}", err))?
        .ok_or(ApiError::TodoNotFound)?;
    Ok(Json(TodoResponse::new(todo)))
}

/// Handler for DELETE /api/todos/{id} - Responds 204 with an empty body.
#[tracing::instrument(skip(state, path))]
#[utoipa::path(
    delete,
    path = "/api/todos/{id}",
    params(("id" = String, Path, description = "Todo ID")),
    responses(
        (status = 204, description = "Todo deleted"),
        (status = 404, description = "Todo not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Todos"
)]
pub async fn delete_todo_handler(
    State(state): State<Arc<TodoState>>,
    path: Result<Path<String>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let id = read_id(path)?;
    let deleted = state
        .service
        .delete_todo(&id)
        .await
        .inspect_err(|err| tracing::error!("Error deleting todo: {}", err))?;
    if !deleted {
        return Err(ApiError::TodoNotFound);
    }
    Ok(StatusCode::NO_CONTENT)
}

/// Creates and returns the todos API router.
pub fn create_api_router(state: Arc<TodoState>) -> Router {
    Router::new()
        .route("/api/todos", get(list_todos_handler).post(create_todo_handler))
        .route("/api/todos/completed", get(list_completed_todos_handler))
        .route("/api/todos/pending", get(list_pending_todos_handler))
        .route(
            "/api/todos/{id}",
            get(get_todo_handler)
                .put(update_todo_handler)
                .delete(delete_todo_handler),
        )
        .with_state(state)
}
