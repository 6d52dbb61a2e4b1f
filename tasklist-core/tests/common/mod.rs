// Common test utilities and helpers for integration tests
#![allow(dead_code)]

use axum::http::Method;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde_json::{json, Value};
use std::sync::Arc;
use tasklist_core::{
    api::{request::SUBJECT_CLAIM, ApiRequest, RequestContext, TaskApi},
    config::TaskListConfig,
    observability::MemorySink,
    storage::{MemoryBackend, RedbBackend, TaskStore},
};
use tempfile::TempDir;

pub const TEST_TABLE: &str = "tasks-test";

/// A store over a fresh in-memory backend
pub fn memory_store(max_tasks: u64) -> (Arc<MemoryBackend>, TaskStore) {
    let backend = Arc::new(MemoryBackend::new());
    (backend.clone(), TaskStore::new(backend, max_tasks))
}

/// A store over a redb file in a temporary directory
///
/// Keep the returned directory alive for as long as the store is used.
pub fn redb_store(max_tasks: u64) -> (TempDir, TaskStore) {
    let dir = TempDir::new().unwrap();
    let backend = RedbBackend::open(&dir.path().join("tasks.redb"), TEST_TABLE).unwrap();
    (dir, TaskStore::new(Arc::new(backend), max_tasks))
}

/// Unsigned JWT-shaped token carrying `claims`
pub fn token(claims: &Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{}.{}.signature", header, payload)
}

/// `Authorization` header value for `user` holding `permissions`
pub fn bearer(user: &str, permissions: &[&str]) -> String {
    format!(
        "Bearer {}",
        token(&json!({"sub": user, "permissions": permissions}))
    )
}

/// The API over an in-memory store, with the sink it reports to
pub fn test_api(config: &TaskListConfig) -> (Arc<MemorySink>, TaskApi) {
    let (_, store) = memory_store(config.storage.max_tasks_per_user);
    let sink = Arc::new(MemorySink::new());
    let api = TaskApi::new(store, config, sink.clone());
    (sink, api)
}

/// A request as the gateway would hand it over for `user`
pub fn authed(method: Method, path: &str, user: &str) -> ApiRequest {
    ApiRequest::new(method, path)
        .with_header("authorization", bearer(user, &[]))
        .with_context(RequestContext::new(uuid::Uuid::new_v4().to_string()).with_claim(SUBJECT_CLAIM, user))
}
