//! Core of the task-list service
//!
//! Users own a bounded number of tasks. The crate contains the storage layer
//! that keeps tasks and a per-user counter consistent, the request pipeline
//! that authenticates, parses and validates requests, and an HTTP adapter
//! serving the operations.
//!
//! ```text
//! storage::codec       Task <-> stored row
//! storage::task_store  CRUD plus the atomic quota counter
//! error                TaskListError and its status classification
//! api::auth            bearer token gate
//! api::pipeline        stage ordering and the terminal error stage
//! api::handlers        Create, Read, ReadAll, Update, Delete
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod observability;
pub mod storage;
pub mod types;

pub use error::{TaskListError, TaskListResult};
pub use types::{Task, TaskField, TaskUpdate};
