//! Constructor methods for TaskListError
//!
//! Factory methods for the structured variants so call sites stay short and
//! the client-facing messages live in one place.

use axum::http::StatusCode;

use super::types::TaskListError;

/// Message for a request whose upstream subject claim is unusable.
pub const UNAUTHENTICATED_USER: &str = "Unable to authenticate user";
/// Message for a request without a task id path parameter.
pub const MISSING_TASK_ID: &str = "Unable to get task ID";
/// Message for a read of a task the user does not have.
pub const TASK_NOT_FOUND: &str = "No task item exists with that ID";
/// Message for an update or delete of a task the user does not have.
pub const NO_TASK_WITH_ID: &str = "There is no task item with that ID";
/// Message for a create rejected by the per-user quota.
pub const QUOTA_REACHED: &str = "You have reached the maximum number of task items";

impl TaskListError {
    /// Create a validation error, optionally naming the offending field
    ///
    /// # Examples
    /// ```rust
    /// use tasklist_core::error::TaskListError;
    ///
    /// let err = TaskListError::validation("summary", "Task summary cannot be empty");
    /// assert_eq!(err.status().as_u16(), 400);
    /// ```
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        TaskListError::Validation {
            field: Some(field.into()),
            message: message.into(),
        }
    }

    /// Create a validation error that is not tied to a single field
    pub fn invalid_request(message: impl Into<String>) -> Self {
        TaskListError::Validation {
            field: None,
            message: message.into(),
        }
    }

    /// Create an authentication error without a cause
    pub fn unauthenticated(message: impl Into<String>) -> Self {
        TaskListError::Unauthenticated {
            message: message.into(),
            source: None,
        }
    }

    /// Create an authentication error wrapping the underlying cause
    pub fn unauthenticated_with<E: std::error::Error + Send + Sync + 'static>(
        message: impl Into<String>,
        source: E,
    ) -> Self {
        TaskListError::Unauthenticated {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create an authorization error wrapping the underlying cause
    pub fn forbidden_with<E: std::error::Error + Send + Sync + 'static>(
        message: impl Into<String>,
        source: E,
    ) -> Self {
        TaskListError::Forbidden {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        TaskListError::NotFound {
            message: message.into(),
        }
    }

    /// Create a quota error for a user that already owns `limit` items
    pub fn quota_exceeded(limit: u64) -> Self {
        TaskListError::QuotaExceeded {
            message: QUOTA_REACHED.to_string(),
            limit,
            source: None,
        }
    }

    /// Create an explicitly classified error
    ///
    /// Messages of classified errors below 500 are always shown to the
    /// client; 5xx messages only when `expose` is set.
    pub fn http(status: StatusCode, message: impl Into<String>) -> Self {
        TaskListError::Http {
            status,
            message: message.into(),
            expose: false,
            source: None,
        }
    }

    /// Mark an explicitly classified error as safe to show to the client
    pub fn exposed(self) -> Self {
        match self {
            TaskListError::Http {
                status,
                message,
                source,
                ..
            } => TaskListError::Http {
                status,
                message,
                expose: true,
                source,
            },
            other => other,
        }
    }

    /// Create a Storage error with a boxed source
    pub fn storage<E: std::error::Error + Send + Sync + 'static>(
        operation: impl Into<String>,
        source: E,
    ) -> Self {
        TaskListError::Storage {
            operation: operation.into(),
            source: Box::new(source),
        }
    }

    /// Create a Serialization error with a boxed source
    pub fn serialization<E: std::error::Error + Send + Sync + 'static>(
        operation: impl Into<String>,
        source: E,
    ) -> Self {
        TaskListError::Serialization {
            operation: operation.into(),
            source: Box::new(source),
        }
    }

    pub fn malformed_record(message: impl Into<String>) -> Self {
        TaskListError::MalformedRecord {
            message: message.into(),
        }
    }

    /// Create a configuration error with component and message
    pub fn configuration(component: impl Into<String>, message: impl Into<String>) -> Self {
        TaskListError::Configuration {
            component: component.into(),
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        TaskListError::Internal {
            message: message.into(),
        }
    }
}
