//! HTTP routes
//!
//! Each route turns the axum request into an [`ApiRequest`], runs the
//! operation's pipeline and sends the [`ApiResponse`] back unchanged. The
//! bearer token's claims are decoded into the request context here, which is
//! the part a fronting gateway authorizer does in production.

use axum::{
    body::{Body, Bytes},
    extract::{rejection::PathRejection, Path, Query, State},
    http::{header::HeaderName, HeaderMap, HeaderValue, Method, StatusCode, Uri},
    response::{IntoResponse, Json, Response},
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

use super::auth::{bearer_token, decode_claims};
use super::handlers::{Operation, TaskApi, TASK_ID_PARAMETER};
use super::request::{ApiRequest, ApiResponse, RequestContext};
use super::schemas::{
    CreateTaskRequest, CreateTaskResponse, DeleteTaskResponse, ErrorResponse, HealthResponse,
    HealthStatus, TaskListResponse, TaskResponse, UpdateTaskRequest,
};

/// Header carrying the request id set by the middleware stack.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Application state for the routes
#[derive(Clone)]
pub struct AppState {
    pub api: Arc<TaskApi>,
    pub table_name: String,
}

impl IntoResponse for ApiResponse {
    fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;
        for (name, value) in self.headers {
            if let (Ok(name), Ok(value)) = (
                HeaderName::try_from(name.as_str()),
                HeaderValue::try_from(value.as_str()),
            ) {
                response.headers_mut().insert(name, value);
            }
        }
        response
    }
}

/// The task id path segment, `None` when it could not be extracted
///
/// The handler reports a missing id, so rejections are not answered here.
fn task_id(id: Result<Path<String>, PathRejection>) -> Option<String> {
    match id {
        Ok(Path(id)) => Some(id),
        Err(rejection) => {
            warn!("Unusable task id in path: {}", rejection.body_text());
            None
        }
    }
}

fn api_request(
    method: Method,
    uri: &Uri,
    headers: &HeaderMap,
    task_id: Option<String>,
    query: HashMap<String, String>,
    body: Option<Bytes>,
) -> ApiRequest {
    let mut request = ApiRequest::new(method, uri.path());
    for (name, value) in headers {
        match value.to_str() {
            Ok(value) => {
                request.headers.insert(name.as_str().to_string(), value.to_string());
            }
            Err(_) => warn!("Dropping non-ASCII header {}", name),
        }
    }

    let request_id = headers
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let mut context = RequestContext::new(request_id);
    if let Ok(claims) = bearer_token(&request).and_then(decode_claims) {
        context.claims = claims;
    }

    if let Some(task_id) = task_id {
        request = request.with_path_parameter(TASK_ID_PARAMETER, task_id);
    }
    request.query = query;
    request.body = body.filter(|body| !body.is_empty()).map(|body| body.to_vec());
    request.with_context(context)
}

/// List the caller's tasks
#[utoipa::path(
    get,
    path = "/tasks",
    tag = "tasks",
    responses(
        (status = 200, description = "All tasks ordered by deadline", body = TaskListResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 403, description = "Token lacks the read permissions", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_tasks(
    State(state): State<AppState>,
    Query(query): Query<HashMap<String, String>>,
    uri: Uri,
    headers: HeaderMap,
) -> ApiResponse {
    let request = api_request(Method::GET, &uri, &headers, None, query, None);
    state.api.handle(Operation::ReadAll, request).await
}

/// Create a task
#[utoipa::path(
    post,
    path = "/tasks",
    tag = "tasks",
    request_body = CreateTaskRequest,
    responses(
        (status = 200, description = "Task created", body = CreateTaskResponse),
        (status = 400, description = "Invalid request body", body = ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 402, description = "Task quota reached", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_task(
    State(state): State<AppState>,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResponse {
    let request = api_request(Method::POST, &uri, &headers, None, HashMap::new(), Some(body));
    state.api.handle(Operation::Create, request).await
}

/// Get one task
#[utoipa::path(
    get,
    path = "/tasks/{id}",
    tag = "tasks",
    params(("id" = String, Path, description = "Task id")),
    responses(
        (status = 200, description = "The task", body = TaskResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 404, description = "No such task", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_task(
    State(state): State<AppState>,
    id: Result<Path<String>, PathRejection>,
    uri: Uri,
    headers: HeaderMap,
) -> ApiResponse {
    let request = api_request(Method::GET, &uri, &headers, task_id(id), HashMap::new(), None);
    state.api.handle(Operation::Read, request).await
}

/// Change some fields of a task
#[utoipa::path(
    put,
    path = "/tasks/{id}",
    tag = "tasks",
    params(("id" = String, Path, description = "Task id")),
    request_body = UpdateTaskRequest,
    responses(
        (status = 200, description = "The updated task", body = TaskResponse),
        (status = 400, description = "Invalid request body", body = ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 404, description = "No such task", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_task(
    State(state): State<AppState>,
    id: Result<Path<String>, PathRejection>,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResponse {
    let request = api_request(
        Method::PUT,
        &uri,
        &headers,
        task_id(id),
        HashMap::new(),
        Some(body),
    );
    state.api.handle(Operation::Update, request).await
}

/// Delete a task
#[utoipa::path(
    delete,
    path = "/tasks/{id}",
    tag = "tasks",
    params(("id" = String, Path, description = "Task id")),
    responses(
        (status = 200, description = "Task deleted", body = DeleteTaskResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 404, description = "No such task", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_task(
    State(state): State<AppState>,
    id: Result<Path<String>, PathRejection>,
    uri: Uri,
    headers: HeaderMap,
) -> ApiResponse {
    let request = api_request(Method::DELETE, &uri, &headers, task_id(id), HashMap::new(), None);
    state.api.handle(Operation::Delete, request).await
}

/// Service health
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Store reachable", body = HealthResponse),
        (status = 503, description = "Store unreachable", body = HealthResponse)
    )
)]
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    match state.api.store().ping().await {
        Ok(_) => (
            StatusCode::OK,
            Json(HealthResponse::new(HealthStatus::Healthy, &state.table_name)),
        ),
        Err(e) => {
            warn!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse::new(HealthStatus::Unhealthy, &state.table_name)),
            )
        }
    }
}
