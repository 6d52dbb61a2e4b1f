//! Core error types for the task-list service
//!
//! This module contains the [`TaskListError`] enum, the status classification
//! attached to domain errors and the associated result aliases.

use axum::http::StatusCode;
use thiserror::Error;

type BoxedSource = Box<dyn std::error::Error + Send + Sync>;

/// Explicit status classification carried by domain errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorClass {
    pub status: StatusCode,
    /// Surface the message to the client even for a 5xx status.
    pub expose: bool,
}

impl ErrorClass {
    pub const fn new(status: StatusCode) -> Self {
        Self {
            status,
            expose: false,
        }
    }

    /// Whether the error's own message may be shown to the client.
    pub fn is_exposed(&self) -> bool {
        self.status.as_u16() < 500 || self.expose
    }
}

/// Error type for task-list operations
///
/// Classified variants (validation, authentication, authorization, missing
/// items, quota) hold the client-facing message in their `Display` output.
/// The remaining variants describe internal faults and are never shown to the
/// client.
#[derive(Error, Debug)]
pub enum TaskListError {
    // Classified domain errors
    #[error("{message}")]
    Validation {
        field: Option<String>,
        message: String,
    },

    #[error("{message}")]
    Unauthenticated {
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },

    #[error("{message}")]
    Forbidden {
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },

    #[error("{message}")]
    NotFound { message: String },

    #[error("{message}")]
    QuotaExceeded {
        message: String,
        limit: u64,
        #[source]
        source: Option<BoxedSource>,
    },

    /// Arbitrary classified failure with an explicit status code.
    #[error("{message}")]
    Http {
        status: StatusCode,
        message: String,
        expose: bool,
        #[source]
        source: Option<BoxedSource>,
    },

    // Storage errors
    #[error("Storage operation '{operation}' failed")]
    Storage {
        operation: String,
        #[source]
        source: BoxedSource,
    },

    #[error("Malformed record: {message}")]
    MalformedRecord { message: String },

    // Serialization errors
    #[error("Serialization operation '{operation}' failed")]
    Serialization {
        operation: String,
        #[source]
        source: BoxedSource,
    },

    // Configuration errors
    #[error("Configuration error in {component}: {message}")]
    Configuration { component: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] Box<std::io::Error>),

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl TaskListError {
    /// Status classification of this error, `None` for unclassified faults.
    pub fn classification(&self) -> Option<ErrorClass> {
        match self {
            TaskListError::Validation { .. } => Some(ErrorClass::new(StatusCode::BAD_REQUEST)),
            TaskListError::Unauthenticated { .. } => {
                Some(ErrorClass::new(StatusCode::UNAUTHORIZED))
            }
            TaskListError::Forbidden { .. } => Some(ErrorClass::new(StatusCode::FORBIDDEN)),
            TaskListError::NotFound { .. } => Some(ErrorClass::new(StatusCode::NOT_FOUND)),
            TaskListError::QuotaExceeded { .. } => {
                Some(ErrorClass::new(StatusCode::PAYMENT_REQUIRED))
            }
            TaskListError::Http { status, expose, .. } => Some(ErrorClass {
                status: *status,
                expose: *expose,
            }),
            TaskListError::Storage { .. }
            | TaskListError::MalformedRecord { .. }
            | TaskListError::Serialization { .. }
            | TaskListError::Configuration { .. }
            | TaskListError::Io(_)
            | TaskListError::Internal { .. } => None,
        }
    }

    /// Status code this error normalizes to.
    pub fn status(&self) -> StatusCode {
        self.classification()
            .map(|class| class.status)
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// Chain of source error messages, outermost first.
    pub fn chain(&self) -> Vec<String> {
        let mut messages = vec![self.to_string()];
        let mut current = std::error::Error::source(self);
        while let Some(source) = current {
            messages.push(source.to_string());
            current = source.source();
        }
        messages
    }
}

pub type TaskListResult<T> = std::result::Result<T, TaskListError>;
