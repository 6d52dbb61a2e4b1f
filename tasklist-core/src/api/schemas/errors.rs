//! Error response schema shared by every endpoint

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

/// Body of every failed request: `{"error": {"message": ...}}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema, Validate)]
#[serde(deny_unknown_fields)]
pub struct ErrorResponse {
    #[validate]
    pub error: ErrorMessage,
}

/// Client-facing error message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema, Validate)]
#[serde(deny_unknown_fields)]
pub struct ErrorMessage {
    /// Human-readable message, the fallback message for internal errors
    #[validate(length(min = 1))]
    pub message: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: ErrorMessage {
                message: message.into(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_error_body_shape() {
        let body = serde_json::to_value(ErrorResponse::new("Unable to get task ID")).unwrap();
        assert_eq!(body, json!({"error": {"message": "Unable to get task ID"}}));
    }
}
