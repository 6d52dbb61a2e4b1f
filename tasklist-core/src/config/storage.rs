//! Storage configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::defaults::*;
use crate::error::{TaskListError, TaskListResult};

/// Which key-value backend holds the table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Embedded redb file under `data_dir`
    #[default]
    Redb,
    /// In-process map, lost on exit
    Memory,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Table holding task and counter rows; required
    pub table_name: String,

    /// Data directory path
    pub data_dir: PathBuf,

    /// Quota of tasks per user
    pub max_tasks_per_user: u64,

    pub backend: BackendKind,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            table_name: String::new(),
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            max_tasks_per_user: DEFAULT_MAX_TASKS_PER_USER,
            backend: BackendKind::default(),
        }
    }
}

impl StorageConfig {
    /// Apply overrides from an environment lookup
    pub fn apply_env<F>(&mut self, lookup: F) -> TaskListResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(name) = lookup(ENV_TABLE_NAME) {
            self.table_name = name;
        }

        if let Some(dir) = lookup(ENV_DATA_DIR) {
            self.data_dir = PathBuf::from(dir);
        }

        if let Some(max) = lookup(ENV_MAX_TASKS) {
            self.max_tasks_per_user = max.parse().map_err(|_| {
                TaskListError::configuration("storage", format!("Invalid {}: {}", ENV_MAX_TASKS, max))
            })?;
        }

        Ok(())
    }

    /// Path of the redb database file
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("tasks.redb")
    }

    pub fn validate(&self) -> TaskListResult<()> {
        if self.table_name.trim().is_empty() {
            return Err(TaskListError::configuration(
                "storage",
                format!("table_name is required (set {})", ENV_TABLE_NAME),
            ));
        }

        if self.max_tasks_per_user == 0 {
            return Err(TaskListError::configuration(
                "storage",
                "max_tasks_per_user must be greater than 0",
            ));
        }

        Ok(())
    }
}
