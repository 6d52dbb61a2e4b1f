//! Error conversion implementations for TaskListError
//!
//! From implementations for the external error types that cross into the
//! service. Backend failures convert to unclassified storage errors here;
//! call sites that give a condition failure a domain meaning translate it
//! before reaching for `?`.

use super::types::TaskListError;
use crate::storage::backend::KvError;

// Storage error conversions
impl From<redb::DatabaseError> for TaskListError {
    fn from(err: redb::DatabaseError) -> Self {
        TaskListError::storage("open database", err)
    }
}

impl From<redb::TransactionError> for TaskListError {
    fn from(err: redb::TransactionError) -> Self {
        TaskListError::storage("begin transaction", err)
    }
}

impl From<redb::TableError> for TaskListError {
    fn from(err: redb::TableError) -> Self {
        TaskListError::storage("open table", err)
    }
}

impl From<redb::StorageError> for TaskListError {
    fn from(err: redb::StorageError) -> Self {
        TaskListError::storage("storage_operation", err)
    }
}

impl From<redb::CommitError> for TaskListError {
    fn from(err: redb::CommitError) -> Self {
        TaskListError::storage("commit", err)
    }
}

impl From<KvError> for TaskListError {
    fn from(err: KvError) -> Self {
        TaskListError::storage("key-value backend", err)
    }
}

// Serialization error conversions
impl From<bincode::Error> for TaskListError {
    fn from(err: bincode::Error) -> Self {
        TaskListError::serialization("bincode", err)
    }
}

impl From<serde_json::Error> for TaskListError {
    fn from(err: serde_json::Error) -> Self {
        TaskListError::serialization("json", err)
    }
}

// Validation error conversions
impl From<validator::ValidationErrors> for TaskListError {
    fn from(err: validator::ValidationErrors) -> Self {
        let mut fields: Vec<_> = err.field_errors().into_iter().collect();
        fields.sort_by_key(|(field, _)| *field);

        match fields.first() {
            Some((field, errors)) => {
                let message = errors
                    .iter()
                    .find_map(|error| error.message.as_ref().map(|m| m.to_string()))
                    .unwrap_or_else(|| format!("Invalid value for {}", field));
                TaskListError::Validation {
                    // struct-level rules are reported under "__all__"
                    field: Some(field.to_string()).filter(|field| field != "__all__"),
                    message,
                }
            }
            None => TaskListError::invalid_request(err.to_string()),
        }
    }
}

// System error conversions
impl From<std::io::Error> for TaskListError {
    fn from(err: std::io::Error) -> Self {
        TaskListError::Io(Box::new(err))
    }
}

impl From<toml::de::Error> for TaskListError {
    fn from(err: toml::de::Error) -> Self {
        TaskListError::configuration("config_file", err.to_string())
    }
}

impl From<std::net::AddrParseError> for TaskListError {
    fn from(err: std::net::AddrParseError) -> Self {
        TaskListError::configuration(
            "network_address",
            format!("Invalid network address: {}", err),
        )
    }
}

// Async/Task error conversions
impl From<tokio::task::JoinError> for TaskListError {
    fn from(err: tokio::task::JoinError) -> Self {
        if err.is_cancelled() {
            TaskListError::internal("Task was cancelled")
        } else if err.is_panic() {
            TaskListError::internal("Task panicked")
        } else {
            TaskListError::internal(format!("Task failed: {}", err))
        }
    }
}
