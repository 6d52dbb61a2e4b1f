//! Request pipeline
//!
//! Stages run in a fixed order:
//!
//! ```text
//! normalize headers -> parse body -> AuthGate::before -> Handler::handle
//!     -> validate response -> serialize
//!            \_____________ any failure _____________/
//!                              |
//!                        ErrorNormalizer
//! ```
//!
//! The first failing stage short-circuits to the error stage. The sink sees
//! the inbound request, any error and the final response.

use async_trait::async_trait;
use axum::http::StatusCode;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::Instrument;
use validator::Validate;

use super::auth::AuthGate;
use super::error_normalizer::ErrorNormalizer;
use super::request::{ApiRequest, ApiResponse};
use crate::error::{TaskListError, TaskListResult};
use crate::observability::{request_span, ObservabilityRecord, ObservabilitySink};

/// Successful output of a handler, before validation and serialization
#[derive(Debug, Clone, PartialEq)]
pub struct HandlerResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl HandlerResponse {
    /// 200 response with a serialized body
    pub fn ok<T: Serialize>(body: &T) -> TaskListResult<Self> {
        Ok(Self {
            status: StatusCode::OK,
            body: serde_json::to_value(body)?,
        })
    }
}

/// Business logic of one operation
#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(&self, request: &ApiRequest) -> TaskListResult<HandlerResponse>;
}

/// Typed shape a handler's output must match
#[derive(Clone, Copy)]
pub struct ResponseSchema {
    name: &'static str,
    check: fn(&Value) -> TaskListResult<()>,
}

impl ResponseSchema {
    pub fn of<T: DeserializeOwned + Validate>() -> Self {
        Self {
            name: std::any::type_name::<T>(),
            check: check_schema::<T>,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Fails with an unclassified error when `body` does not match
    pub fn check(&self, body: &Value) -> TaskListResult<()> {
        (self.check)(body)
    }
}

impl std::fmt::Debug for ResponseSchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ResponseSchema").field(&self.name).finish()
    }
}

fn check_schema<T: DeserializeOwned + Validate>(body: &Value) -> TaskListResult<()> {
    let parsed: T = serde_json::from_value(body.clone())
        .map_err(|e| TaskListError::serialization("validate response", e))?;
    parsed.validate().map_err(|e| {
        TaskListError::internal(format!(
            "Response does not match {}: {}",
            std::any::type_name::<T>(),
            e
        ))
    })
}

/// Rewrite a header name into canonical form (`content-type` -> `Content-Type`)
pub fn canonical_header_name(name: &str) -> String {
    name.split('-')
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join("-")
}

fn normalize_headers(request: &mut ApiRequest) {
    let headers = std::mem::take(&mut request.headers);
    request.headers = headers
        .into_iter()
        .map(|(name, value)| (canonical_header_name(&name), value))
        .collect();
}

fn is_json_content_type(value: &str) -> bool {
    let mime = value
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    mime == "application/json" || (mime.starts_with("application/") && mime.ends_with("+json"))
}

/// Parse the raw body as JSON
///
/// An absent or blank body parses to no body. A body that is not UTF-8, is
/// sent with a non-JSON content type or is not valid JSON is rejected.
fn parse_json_body(request: &mut ApiRequest) -> TaskListResult<()> {
    let text = match request.body.as_deref() {
        Some(bytes) => std::str::from_utf8(bytes).map_err(|e| {
            TaskListError::invalid_request(format!("Request body is not valid UTF-8: {}", e))
        })?,
        None => "",
    };

    let raw = text.trim();
    if raw.is_empty() {
        request.json_body = None;
        return Ok(());
    }

    if let Some(content_type) = request.header("Content-Type") {
        if !is_json_content_type(content_type) {
            return Err(TaskListError::invalid_request(format!(
                "Unsupported content type: {}",
                content_type
            )));
        }
    }

    let value = serde_json::from_str(raw).map_err(|e| {
        TaskListError::invalid_request(format!("Request body is not valid JSON: {}", e))
    })?;
    request.json_body = Some(value);
    Ok(())
}

fn request_record(request: &ApiRequest) -> ObservabilityRecord {
    let headers: BTreeMap<&str, &str> = request
        .headers
        .iter()
        .map(|(name, value)| {
            if name.eq_ignore_ascii_case("authorization") {
                (name.as_str(), "[redacted]")
            } else {
                (name.as_str(), value.as_str())
            }
        })
        .collect();

    ObservabilityRecord::Request {
        event: json!({
            "method": request.method.as_str(),
            "path": request.path,
            "headers": headers,
            "pathParameters": request.path_parameters,
            "queryStringParameters": request.query,
            "body": request.body.as_deref().map(String::from_utf8_lossy),
        }),
        context: json!({
            "requestId": request.context.request_id,
            "claims": request.context.claims,
        }),
    }
}

/// One operation's full stage chain
pub struct RequestPipeline {
    name: &'static str,
    handler: Arc<dyn Handler>,
    auth: Option<AuthGate>,
    parse_body: bool,
    response_schema: Option<ResponseSchema>,
    normalizer: ErrorNormalizer,
    sink: Arc<dyn ObservabilitySink>,
}

impl RequestPipeline {
    pub fn new(
        name: &'static str,
        handler: Arc<dyn Handler>,
        normalizer: ErrorNormalizer,
        sink: Arc<dyn ObservabilitySink>,
    ) -> Self {
        Self {
            name,
            handler,
            auth: None,
            parse_body: false,
            response_schema: None,
            normalizer,
            sink,
        }
    }

    pub fn with_auth(mut self, gate: AuthGate) -> Self {
        self.auth = Some(gate);
        self
    }

    pub fn with_body_parsing(mut self) -> Self {
        self.parse_body = true;
        self
    }

    pub fn with_response_schema(mut self, schema: ResponseSchema) -> Self {
        self.response_schema = Some(schema);
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Run the request through every stage; always produces a response
    pub async fn run(&self, request: ApiRequest) -> ApiResponse {
        let span = request_span(
            request.method.as_str(),
            &request.path,
            &request.context.request_id,
        );

        async move {
            let mut request = request;
            self.sink.record(request_record(&request));

            let response = match self.process(&mut request).await {
                Ok(response) => response,
                Err(err) => self.normalizer.normalize(&err, self.sink.as_ref()),
            };

            self.sink.record(ObservabilityRecord::Response {
                status: response.status.as_u16(),
                headers: response.headers.clone(),
                body: response.body.clone(),
            });
            response
        }
        .instrument(span)
        .await
    }

    async fn process(&self, request: &mut ApiRequest) -> TaskListResult<ApiResponse> {
        normalize_headers(request);

        if self.parse_body {
            parse_json_body(request)?;
        }

        if let Some(gate) = &self.auth {
            gate.before(request)?;
        }

        let output = self.handler.handle(request).await?;

        if let Some(schema) = &self.response_schema {
            schema.check(&output.body)?;
        }

        let body = serde_json::to_string(&output.body)?;
        Ok(ApiResponse::json(output.status, body))
    }
}

impl std::fmt::Debug for RequestPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestPipeline")
            .field("name", &self.name)
            .field("auth", &self.auth)
            .field("parse_body", &self.parse_body)
            .field("response_schema", &self.response_schema)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::auth::{PermissionMatch, MISSING_TOKEN};
    use crate::api::schemas::CreateTaskResponse;
    use crate::observability::MemorySink;
    use axum::http::Method;
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;

    /// Records the request it saw and answers with a fixed result
    struct RecordingHandler {
        seen: Mutex<Option<ApiRequest>>,
        result: fn() -> TaskListResult<HandlerResponse>,
    }

    impl RecordingHandler {
        fn new(result: fn() -> TaskListResult<HandlerResponse>) -> Arc<Self> {
            Arc::new(Self {
                seen: Mutex::new(None),
                result,
            })
        }
    }

    #[async_trait]
    impl Handler for RecordingHandler {
        async fn handle(&self, request: &ApiRequest) -> TaskListResult<HandlerResponse> {
            *self.seen.lock() = Some(request.clone());
            (self.result)()
        }
    }

    fn ok_task_id() -> TaskListResult<HandlerResponse> {
        Ok(HandlerResponse {
            status: StatusCode::OK,
            body: json!({"taskId": "8a8f5b53-3bd4-4c58-9d8c-6a5e0b3d5e42"}),
        })
    }

    fn pipeline(recorder: Arc<RecordingHandler>, sink: Arc<MemorySink>) -> RequestPipeline {
        RequestPipeline::new("test", recorder, ErrorNormalizer::default(), sink)
    }

    #[test]
    fn test_canonical_header_name() {
        assert_eq!(canonical_header_name("content-type"), "Content-Type");
        assert_eq!(canonical_header_name("AUTHORIZATION"), "Authorization");
        assert_eq!(canonical_header_name("x-request-id"), "X-Request-Id");
    }

    #[test]
    fn test_json_content_types() {
        assert!(is_json_content_type("application/json"));
        assert!(is_json_content_type("Application/JSON; charset=utf-8"));
        assert!(is_json_content_type("application/vnd.api+json"));
        assert!(!is_json_content_type("text/plain"));
    }

    #[tokio::test]
    async fn test_success_path() {
        let recorder = RecordingHandler::new(ok_task_id);
        let sink = Arc::new(MemorySink::new());
        let request = ApiRequest::new(Method::POST, "/tasks")
            .with_header("content-type", "application/json")
            .with_body(r#"{"summary":"Buy milk"}"#);

        let response = pipeline(recorder.clone(), sink.clone())
            .with_body_parsing()
            .with_response_schema(ResponseSchema::of::<CreateTaskResponse>())
            .run(request)
            .await;

        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.headers["Content-Type"], "application/json");
        assert_eq!(
            response.json_body(),
            json!({"taskId": "8a8f5b53-3bd4-4c58-9d8c-6a5e0b3d5e42"})
        );

        let seen = recorder.seen.lock().clone().unwrap();
        assert_eq!(seen.header("Content-Type"), Some("application/json"));
        assert!(seen.headers.contains_key("Content-Type"));
        assert_eq!(seen.json_body, Some(json!({"summary": "Buy milk"})));

        let records = sink.records();
        assert_eq!(records.len(), 2);
        assert!(matches!(records[1], ObservabilityRecord::Response { status: 200, .. }));
    }

    #[tokio::test]
    async fn test_malformed_body_skips_handler() {
        let recorder = RecordingHandler::new(ok_task_id);
        let sink = Arc::new(MemorySink::new());
        let request = ApiRequest::new(Method::POST, "/tasks").with_body("{not json");

        let response = pipeline(recorder.clone(), sink.clone())
            .with_body_parsing()
            .run(request)
            .await;

        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert!(recorder.seen.lock().is_none());
        assert_eq!(sink.errors().len(), 1);
    }

    #[tokio::test]
    async fn test_non_json_content_type_rejected() {
        let recorder = RecordingHandler::new(ok_task_id);
        let request = ApiRequest::new(Method::POST, "/tasks")
            .with_header("Content-Type", "text/plain")
            .with_body("{}");

        let response = pipeline(recorder, Arc::new(MemorySink::new()))
            .with_body_parsing()
            .run(request)
            .await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_non_utf8_body_is_validation_error() {
        let recorder = RecordingHandler::new(ok_task_id);
        let sink = Arc::new(MemorySink::new());
        let request = ApiRequest::new(Method::POST, "/tasks")
            .with_header("Content-Type", "application/json")
            .with_body(vec![0xff, 0xfe, b'{', b'}']);

        let response = pipeline(recorder.clone(), sink.clone())
            .with_body_parsing()
            .run(request)
            .await;

        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert_eq!(response.headers["Content-Type"], "application/json");
        assert!(response.json_body()["error"]["message"]
            .as_str()
            .unwrap()
            .contains("UTF-8"));
        assert!(recorder.seen.lock().is_none());
        assert!(matches!(
            sink.errors().as_slice(),
            [ObservabilityRecord::Error { status: 400, .. }]
        ));
    }

    #[tokio::test]
    async fn test_body_not_parsed_without_stage() {
        let recorder = RecordingHandler::new(ok_task_id);
        let request = ApiRequest::new(Method::GET, "/tasks").with_body("{not json");

        let response = pipeline(recorder.clone(), Arc::new(MemorySink::new()))
            .run(request)
            .await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(recorder.seen.lock().clone().unwrap().json_body, None);
    }

    #[tokio::test]
    async fn test_auth_runs_before_handler() {
        let recorder = RecordingHandler::new(ok_task_id);
        let response = pipeline(recorder.clone(), Arc::new(MemorySink::new()))
            .with_auth(AuthGate::new(vec![], PermissionMatch::All))
            .run(ApiRequest::new(Method::GET, "/tasks"))
            .await;

        assert_eq!(response.status, StatusCode::UNAUTHORIZED);
        assert_eq!(response.json_body(), json!({"error": {"message": MISSING_TOKEN}}));
        assert!(recorder.seen.lock().is_none());
    }

    #[tokio::test]
    async fn test_response_schema_mismatch_is_internal() {
        fn wrong_shape() -> TaskListResult<HandlerResponse> {
            Ok(HandlerResponse {
                status: StatusCode::OK,
                body: json!({"taskId": "not-a-uuid"}),
            })
        }

        let response = pipeline(RecordingHandler::new(wrong_shape), Arc::new(MemorySink::new()))
            .with_response_schema(ResponseSchema::of::<CreateTaskResponse>())
            .run(ApiRequest::new(Method::POST, "/tasks"))
            .await;

        assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!response.body.contains("not-a-uuid"));
    }

    #[tokio::test]
    async fn test_handler_error_is_normalized_and_recorded() {
        fn fails() -> TaskListResult<HandlerResponse> {
            Err(TaskListError::internal("connection string postgres://secret"))
        }

        let sink = Arc::new(MemorySink::new());
        let response = pipeline(RecordingHandler::new(fails), sink.clone())
            .run(ApiRequest::new(Method::GET, "/tasks"))
            .await;

        assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!response.body.contains("secret"));

        let records = sink.records();
        assert_eq!(records.len(), 3);
        assert!(matches!(records[0], ObservabilityRecord::Request { .. }));
        assert!(matches!(records[1], ObservabilityRecord::Error { status: 500, .. }));
        assert!(matches!(records[2], ObservabilityRecord::Response { status: 500, .. }));
    }

    #[tokio::test]
    async fn test_authorization_header_is_redacted_in_records() {
        let sink = Arc::new(MemorySink::new());
        let request = ApiRequest::new(Method::GET, "/tasks").with_header("Authorization", "Bearer abc.def.ghi");
        pipeline(RecordingHandler::new(ok_task_id), sink.clone()).run(request).await;

        let recorded = serde_json::to_string(&sink.records()[0]).unwrap();
        assert!(!recorded.contains("abc.def.ghi"));
    }
}
