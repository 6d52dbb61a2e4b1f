//! OpenAPI documentation generation

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

/// Main OpenAPI documentation structure
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Task List API",
        version = "1.0.0",
        description = "Per-user task lists with a bounded number of tasks"
    ),
    paths(
        crate::api::routes::list_tasks,
        crate::api::routes::create_task,
        crate::api::routes::get_task,
        crate::api::routes::update_task,
        crate::api::routes::delete_task,
        crate::api::routes::health_check,
    ),
    components(schemas(
        crate::types::Task,
        crate::api::schemas::CreateTaskRequest,
        crate::api::schemas::UpdateTaskRequest,
        crate::api::schemas::CreateTaskResponse,
        crate::api::schemas::TaskResponse,
        crate::api::schemas::TaskListResponse,
        crate::api::schemas::DeleteTaskResponse,
        crate::api::schemas::ErrorResponse,
        crate::api::schemas::ErrorMessage,
        crate::api::schemas::HealthResponse,
        crate::api::schemas::HealthStatus,
    )),
    modifiers(&BearerAuth),
    tags(
        (name = "tasks", description = "Task management"),
        (name = "health", description = "Health check"),
    )
)]
pub struct ApiDoc;

/// Registers the `bearer_auth` scheme used by the task routes
struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Generate OpenAPI specification as JSON
pub fn generate_openapi_json() -> String {
    ApiDoc::openapi()
        .to_pretty_json()
        .unwrap_or_else(|_| "{}".to_string())
}
