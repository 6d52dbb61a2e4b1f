//! HTTP server for the task-list API

use axum::{response::Json, routing::get, Router};
use std::sync::Arc;
use tracing::info;
use utoipa::OpenApi;

use super::docs::ApiDoc;
use super::handlers::TaskApi;
use super::middleware::with_middleware_stack;
use super::routes::{self, AppState};
use crate::config::ServerConfig;
use crate::error::{TaskListError, TaskListResult};

/// HTTP server
pub struct RestApiServer {
    config: ServerConfig,
    state: AppState,
}

impl RestApiServer {
    pub fn new(config: ServerConfig, api: Arc<TaskApi>, table_name: impl Into<String>) -> Self {
        Self {
            config,
            state: AppState {
                api,
                table_name: table_name.into(),
            },
        }
    }

    /// Create the main application router
    pub fn create_router(&self) -> Router {
        let router = Router::new()
            .route("/tasks", get(routes::list_tasks).post(routes::create_task))
            .route(
                "/tasks/:id",
                get(routes::get_task)
                    .put(routes::update_task)
                    .delete(routes::delete_task),
            )
            .route("/health", get(routes::health_check))
            .route("/openapi.json", get(serve_openapi_json))
            .with_state(self.state.clone());

        with_middleware_stack(router, self.config.request_timeout, self.state.clone())
    }

    /// Bind and serve until `shutdown` resolves
    pub async fn serve_with_shutdown<F>(self, shutdown: F) -> TaskListResult<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let address = self.config.socket_addr()?;
        let router = self.create_router();

        let listener = tokio::net::TcpListener::bind(address).await.map_err(|e| {
            TaskListError::configuration("server", format!("Failed to bind to {}: {}", address, e))
        })?;

        info!(
            "Serving table {} on {}",
            self.state.table_name,
            listener.local_addr()?
        );

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| TaskListError::internal(format!("HTTP server error: {}", e)))?;

        info!("HTTP server stopped");
        Ok(())
    }
}

/// Serve OpenAPI specification as JSON
async fn serve_openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
