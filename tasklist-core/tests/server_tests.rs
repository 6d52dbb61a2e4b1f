//! HTTP adapter tests driving the axum router directly

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    routing::get,
    Router,
};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tasklist_core::{
    api::{middleware::with_middleware_stack, routes::AppState, RestApiServer, TaskApi},
    config::TaskListConfig,
    error::constructors::{MISSING_TASK_ID, TASK_NOT_FOUND, UNAUTHENTICATED_USER},
    observability::{MemorySink, ObservabilityRecord},
    storage::{
        Item, ItemKey, KeyValueBackend, KvError, KvResult, TaskStore, TransactWriteItem,
        UpdateItem,
    },
};
use tower::ServiceExt;

mod common;
use common::{bearer, memory_store, token, TEST_TABLE};

fn api_over(store: TaskStore, sink: Arc<MemorySink>) -> Arc<TaskApi> {
    let config = TaskListConfig::test(TEST_TABLE);
    Arc::new(TaskApi::new(store, &config, sink))
}

fn router_with_sink(sink: Arc<MemorySink>) -> Router {
    let config = TaskListConfig::test(TEST_TABLE);
    let (_, store) = memory_store(config.storage.max_tasks_per_user);
    RestApiServer::new(config.server.clone(), api_over(store, sink), TEST_TABLE).create_router()
}

fn router() -> Router {
    router_with_sink(Arc::new(MemorySink::new()))
}

/// Backend whose every call fails as if the table were unreachable
struct UnreachableBackend;

fn unreachable(operation: &str) -> KvError {
    KvError::backend(operation, std::io::Error::other("connection refused"))
}

#[async_trait]
impl KeyValueBackend for UnreachableBackend {
    async fn get_item(&self, _key: &ItemKey) -> KvResult<Option<Item>> {
        Err(unreachable("get_item"))
    }

    async fn query(&self, _partition: &str, _sort_prefix: &str) -> KvResult<Vec<Item>> {
        Err(unreachable("query"))
    }

    async fn update_item(&self, _update: UpdateItem) -> KvResult<Item> {
        Err(unreachable("update_item"))
    }

    async fn transact_write(&self, _items: Vec<TransactWriteItem>) -> KvResult<()> {
        Err(unreachable("transact_write"))
    }

    async fn ping(&self) -> KvResult<()> {
        Err(unreachable("ping"))
    }
}

fn assert_error_body(response_type: Option<&header::HeaderValue>, body: &Value, message: &str) {
    assert_eq!(
        response_type.and_then(|value| value.to_str().ok()),
        Some("application/json")
    );
    assert_eq!(body, &json!({"error": {"message": message}}));
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let (status, _, body) = send_full(router, request).await;
    (status, body)
}

/// Status, content type and JSON body of a response
async fn send_full(
    router: &Router,
    request: Request<Body>,
) -> (StatusCode, Option<header::HeaderValue>, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let content_type = response.headers().get(header::CONTENT_TYPE).cloned();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, content_type, body)
}

fn request(method: Method, uri: &str, user: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, bearer(user, &[]));
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

#[tokio::test]
async fn test_crud_over_http() {
    let router = router();

    let (status, body) = send(
        &router,
        request(
            Method::POST,
            "/tasks",
            "alice",
            Some(json!({"summary": "Buy milk", "deadline": "2023-02-08"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let task_id = body["taskId"].as_str().unwrap().to_string();
    let task_uri = format!("/tasks/{}", task_id);

    let (status, body) = send(&router, request(Method::GET, &task_uri, "alice", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["color"], json!("red"));

    let (status, body) = send(
        &router,
        request(Method::PUT, &task_uri, "alice", Some(json!({"description": "oat"}))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["description"], json!("oat"));

    let (status, body) = send(&router, request(Method::GET, "/tasks", "alice", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totalResults"], json!(1));

    let (status, body) = send(&router, request(Method::DELETE, &task_uri, "alice", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({}));

    let (status, body) = send(&router, request(Method::GET, &task_uri, "alice", None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"error": {"message": TASK_NOT_FOUND}}));
}

#[tokio::test]
async fn test_subject_comes_from_token() {
    let router = router();
    let (_, body) = send(
        &router,
        request(
            Method::POST,
            "/tasks",
            "alice",
            Some(json!({"summary": "a", "deadline": "2023-01-01"})),
        ),
    )
    .await;
    let task_uri = format!("/tasks/{}", body["taskId"].as_str().unwrap());

    let (status, _) = send(&router, request(Method::GET, &task_uri, "bob", None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_token_without_subject() {
    let router = router();
    let request = Request::builder()
        .uri("/tasks")
        .header(
            header::AUTHORIZATION,
            format!("Bearer {}", token(&json!({"permissions": []}))),
        )
        .body(Body::empty())
        .unwrap();

    let (status, body) = send(&router, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({"error": {"message": UNAUTHENTICATED_USER}}));
}

#[tokio::test]
async fn test_responses_carry_json_content_type_and_request_id() {
    let router = router();
    let response = router
        .clone()
        .oneshot(request(Method::GET, "/tasks", "alice", None))
        .await
        .unwrap();

    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/json"
    );
}

#[tokio::test]
async fn test_health_and_openapi() {
    let router = router();

    let health = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let (status, body) = send(&router, health).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], json!("healthy"));
    assert_eq!(body["table_name"], json!(TEST_TABLE));

    let openapi = Request::builder().uri("/openapi.json").body(Body::empty()).unwrap();
    let (status, body) = send(&router, openapi).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/tasks/{id}"].is_object());
}

#[tokio::test]
async fn test_non_utf8_body_is_a_json_400() {
    let sink = Arc::new(MemorySink::new());
    let router = router_with_sink(sink.clone());
    let request = Request::builder()
        .method(Method::POST)
        .uri("/tasks")
        .header(header::AUTHORIZATION, bearer("alice", &[]))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(vec![0xff_u8, 0xfe, b'{', b'}']))
        .unwrap();

    let (status, content_type, body) = send_full(&router, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(content_type.unwrap(), "application/json");
    assert!(body["error"]["message"].as_str().unwrap().contains("UTF-8"));
    assert!(matches!(
        sink.errors().as_slice(),
        [ObservabilityRecord::Error { status: 400, .. }]
    ));
}

#[tokio::test]
async fn test_oversized_body_is_a_json_413() {
    let sink = Arc::new(MemorySink::new());
    let router = router_with_sink(sink.clone());
    let request = Request::builder()
        .method(Method::POST)
        .uri("/tasks")
        .header(header::AUTHORIZATION, bearer("alice", &[]))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(vec![b' '; 3 * 1024 * 1024]))
        .unwrap();

    let (status, content_type, body) = send_full(&router, request).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_error_body(content_type.as_ref(), &body, "Payload Too Large");
    assert!(matches!(
        sink.errors().as_slice(),
        [ObservabilityRecord::Error { status: 413, .. }]
    ));
}

#[tokio::test]
async fn test_undecodable_task_id_is_missing_id() {
    let router = router();
    let (status, content_type, body) =
        send_full(&router, request(Method::GET, "/tasks/%FF", "alice", None)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_error_body(content_type.as_ref(), &body, MISSING_TASK_ID);
}

#[tokio::test]
async fn test_unknown_route_and_method_use_error_body() {
    let router = router();

    let (status, content_type, body) =
        send_full(&router, request(Method::GET, "/projects", "alice", None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_error_body(content_type.as_ref(), &body, "Not Found");

    let response = router
        .clone()
        .oneshot(request(Method::PATCH, "/tasks", "alice", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert!(response.headers().contains_key(header::ALLOW));
    assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");
}

#[tokio::test]
async fn test_request_timeout_is_a_json_408() {
    let sink = Arc::new(MemorySink::new());
    let (_, store) = memory_store(2);
    let state = AppState {
        api: api_over(store, sink.clone()),
        table_name: TEST_TABLE.to_string(),
    };
    let slow = Router::new().route(
        "/slow",
        get(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            "late"
        }),
    );
    let router = with_middleware_stack(slow, Duration::from_millis(20), state);

    let request = Request::builder().uri("/slow").body(Body::empty()).unwrap();
    let response = router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);

    let content_type = response.headers().get(header::CONTENT_TYPE).cloned();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_error_body(content_type.as_ref(), &body, "Request Timeout");
    assert_eq!(sink.errors().len(), 1);
}

#[tokio::test]
async fn test_health_reports_unreachable_store() {
    let store = TaskStore::new(Arc::new(UnreachableBackend), 2);
    let config = TaskListConfig::test(TEST_TABLE);
    let router = RestApiServer::new(
        config.server.clone(),
        api_over(store, Arc::new(MemorySink::new())),
        TEST_TABLE,
    )
    .create_router();

    let health = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let (status, body) = send(&router, health).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], json!("unhealthy"));
}

#[tokio::test]
async fn test_health_leaves_no_rows() {
    let config = TaskListConfig::test(TEST_TABLE);
    let (backend, store) = memory_store(2);
    let router = RestApiServer::new(
        config.server.clone(),
        api_over(store, Arc::new(MemorySink::new())),
        TEST_TABLE,
    )
    .create_router();

    let health = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let (status, _) = send(&router, health).await;
    assert_eq!(status, StatusCode::OK);
    assert!(backend.is_empty());
}
