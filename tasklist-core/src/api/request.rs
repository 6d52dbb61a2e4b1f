//! Request and response envelopes passed through the pipeline

use axum::http::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use validator::Validate;

use crate::error::constructors::UNAUTHENTICATED_USER;
use crate::error::{TaskListError, TaskListResult};

/// Claim holding the acting user's identifier.
pub const SUBJECT_CLAIM: &str = "sub";

/// Request metadata attached by the upstream identity layer
///
/// Claims placed here are already verified and are not re-checked.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub request_id: String,
    pub claims: Map<String, Value>,
}

impl RequestContext {
    pub fn new(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            claims: Map::new(),
        }
    }

    pub fn with_claim(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.claims.insert(name.into(), value.into());
        self
    }

    /// The acting user, taken from the subject claim
    ///
    /// Fails with `Unauthenticated` when the claim is missing, not a string
    /// or empty.
    pub fn subject(&self) -> TaskListResult<&str> {
        self.claims
            .get(SUBJECT_CLAIM)
            .and_then(Value::as_str)
            .filter(|subject| !subject.is_empty())
            .ok_or_else(|| TaskListError::unauthenticated(UNAUTHENTICATED_USER))
    }
}

/// An inbound request as seen by the pipeline
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub headers: BTreeMap<String, String>,
    pub path_parameters: HashMap<String, String>,
    pub query: HashMap<String, String>,
    /// Raw body bytes as received; decoded by the body parsing stage
    pub body: Option<Vec<u8>>,
    /// Body after the parsing stage, `None` when absent or not parsed
    pub json_body: Option<Value>,
    pub context: RequestContext,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: BTreeMap::new(),
            path_parameters: HashMap::new(),
            query: HashMap::new(),
            body: None,
            json_body: None,
            context: RequestContext::default(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_path_parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.path_parameters.insert(name.into(), value.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_context(mut self, context: RequestContext) -> Self {
        self.context = context;
        self
    }

    /// Header value looked up case-insensitively
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Non-empty path parameter
    pub fn path_parameter(&self, name: &str) -> Option<&str> {
        self.path_parameters
            .get(name)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    /// Deserialize and validate the parsed body
    ///
    /// A missing body is treated as an empty JSON object so that required
    /// fields are reported by name.
    pub fn parse_body<T: DeserializeOwned + Validate>(&self) -> TaskListResult<T> {
        let value = self
            .json_body
            .clone()
            .unwrap_or_else(|| Value::Object(Map::new()));
        let parsed: T = serde_json::from_value(value)
            .map_err(|e| TaskListError::invalid_request(format!("Invalid request body: {}", e)))?;
        parsed.validate()?;
        Ok(parsed)
    }
}

/// A finished response ready for the transport
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

impl ApiResponse {
    /// JSON response with the content type set
    pub fn json(status: StatusCode, body: String) -> Self {
        let mut headers = BTreeMap::new();
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        Self {
            status,
            headers,
            body,
        }
    }

    /// The body parsed back into JSON, `Value::Null` when it is not JSON
    pub fn json_body(&self) -> Value {
        serde_json::from_str(&self.body).unwrap_or(Value::Null)
    }
}
