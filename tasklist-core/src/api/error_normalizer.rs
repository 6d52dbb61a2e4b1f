//! Terminal error stage
//!
//! Every failure raised anywhere in a pipeline ends here and leaves as
//! `{"error": {"message": ...}}` with the classified status. Messages of
//! unclassified errors, and of classified 5xx errors not marked as exposed,
//! are replaced by the fallback message.

use axum::http::StatusCode;
use tracing::{debug, error};

use super::request::ApiResponse;
use super::schemas::ErrorResponse;
use crate::error::TaskListError;
use crate::observability::{ObservabilityRecord, ObservabilitySink};

/// Message sent in place of internal error details.
pub const DEFAULT_FALLBACK_MESSAGE: &str = "An unexpected error occurred";

#[derive(Debug, Clone)]
pub struct ErrorNormalizer {
    fallback_message: String,
}

impl Default for ErrorNormalizer {
    fn default() -> Self {
        Self::new(DEFAULT_FALLBACK_MESSAGE)
    }
}

impl ErrorNormalizer {
    pub fn new(fallback_message: impl Into<String>) -> Self {
        Self {
            fallback_message: fallback_message.into(),
        }
    }

    pub fn fallback_message(&self) -> &str {
        &self.fallback_message
    }

    /// Status and client-visible message for an error
    pub fn classify(&self, err: &TaskListError) -> (StatusCode, String) {
        match err.classification() {
            Some(class) if class.is_exposed() => (class.status, err.to_string()),
            Some(class) => (class.status, self.fallback_message.clone()),
            None => (
                StatusCode::INTERNAL_SERVER_ERROR,
                self.fallback_message.clone(),
            ),
        }
    }

    /// Turn an error into the final response, recording the error first
    pub fn normalize(&self, err: &TaskListError, sink: &dyn ObservabilitySink) -> ApiResponse {
        let (status, message) = self.classify(err);
        let causes = err.chain();

        if status.is_server_error() {
            error!("Request failed with {}: {}", status, causes.join(": "));
        } else {
            debug!("Request rejected with {}: {}", status, causes.join(": "));
        }

        sink.record(ObservabilityRecord::Error {
            status: status.as_u16(),
            message: err.to_string(),
            causes,
        });

        let body = serde_json::to_string(&ErrorResponse::new(message))
            .unwrap_or_else(|_| String::from("{}"));
        ApiResponse::json(status, body)
    }
}
