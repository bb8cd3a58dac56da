use axum::Json;
use axum::Router;
use axum::middleware::from_fn;
use serde::Serialize;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config;
use crate::todo::TodoService;
use crate::todo::api::TodoState;
use crate::todo::repository::{InMemoryTodoRepository, TodoRepository};

pub mod api;
pub mod middleware;

use api::ApiError;

/// Builds the full application router on top of `repository`.
pub fn create_app(repository: Arc<dyn TodoRepository>) -> Router {
    let todo_state = Arc::new(TodoState::new(TodoService::new(repository)));

    Router::new()
        .route("/health", axum::routing::get(health_check_handler))
        .merge(api::create_api_router(todo_state))
        .fallback(route_not_found_handler)
        .method_not_allowed_fallback(route_not_found_handler)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CatchPanicLayer::custom(middleware::handle_panic))
                .layer(CorsLayer::permissive())
                .layer(from_fn(middleware::log_request_middleware)),
        )
}

#[tracing::instrument(skip(config))]
pub async fn start_web_server(config: config::Config) -> anyhow::Result<()> {
    let server_address = config.server_address();
    let listener = tokio::net::TcpListener::bind(&server_address).await?;
    tracing::info!("Web server running on http://{}", server_address);
    tracing::info!("Todo API available at http://{}/api/todos", server_address);
    tracing::info!("Health check at http://{}/health", server_address);

    let app = create_app(Arc::new(InMemoryTodoRepository::new()));

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("Web server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", err);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!("Failed to listen for SIGTERM: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received");
}

/// Body of the health probe.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: &'static str,
    timestamp: String,
}

#[tracing::instrument]
pub async fn health_check_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "OK",
        timestamp: crate::todo::format_timestamp(&chrono::Utc::now()),
    })
}

pub async fn route_not_found_handler() -> ApiError {
    ApiError::RouteNotFound
}
