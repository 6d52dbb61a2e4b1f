//! Middleware stack for the HTTP adapter

use axum::{
    extract::State,
    http::header::{CONTENT_LENGTH, CONTENT_TYPE},
    middleware::map_response_with_state,
    response::{IntoResponse, Response},
    Router,
};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use super::routes::AppState;
use crate::error::TaskListError;

/// Wrap `router` with request ids, tracing and the request deadline
///
/// A request still running after `request_timeout` is answered with
/// `408 Request Timeout`. Failures produced by the transport itself (body
/// limit, timeout, unknown route or method) leave through the same error
/// stage as pipeline failures.
pub fn with_middleware_stack(router: Router, request_timeout: Duration, state: AppState) -> Router {
    router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(TimeoutLayer::new(request_timeout))
                .layer(PropagateRequestIdLayer::x_request_id()),
        )
        .layer(map_response_with_state(state, normalize_transport_errors))
}

fn is_json(response: &Response) -> bool {
    response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("application/json"))
}

/// Rewrite error responses not produced by a pipeline into the error body
async fn normalize_transport_errors(State(state): State<AppState>, response: Response) -> Response {
    let status = response.status();
    if !(status.is_client_error() || status.is_server_error()) || is_json(&response) {
        return response;
    }

    let message = status.canonical_reason().unwrap_or("Request failed");
    let err = TaskListError::http(status, message);
    let mut normalized = state.api.normalize(&err).into_response();

    // keeps the request id and `Allow`
    for (name, value) in response.headers() {
        if name != CONTENT_TYPE && name != CONTENT_LENGTH {
            normalized.headers_mut().insert(name.clone(), value.clone());
        }
    }
    normalized
}
