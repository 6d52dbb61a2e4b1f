//! Default configuration values
//!
//! This module centralizes all default values to make them easy to find and modify.

use std::time::Duration;

// Storage defaults
pub const DEFAULT_DATA_DIR: &str = "./data";
pub const DEFAULT_MAX_TASKS_PER_USER: u64 = crate::storage::DEFAULT_MAX_TASKS;

// Server defaults
pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:3000";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(29);

// Environment variables
pub const ENV_TABLE_NAME: &str = "TASK_TABLE_NAME";
pub const ENV_DATA_DIR: &str = "TASKLIST_DATA_DIR";
pub const ENV_MAX_TASKS: &str = "TASKLIST_MAX_TASKS";
pub const ENV_BIND_ADDRESS: &str = "TASKLIST_BIND";
pub const ENV_FALLBACK_MESSAGE: &str = "TASKLIST_FALLBACK_MESSAGE";
