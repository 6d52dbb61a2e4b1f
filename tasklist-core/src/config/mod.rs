//! Configuration for the task-list service
//!
//! Configuration is read from an optional TOML file, then overridden from
//! environment variables, then validated. The table name has no default:
//! starting without one fails with a configuration error.
//!
//! ```toml
//! [storage]
//! table_name = "tasks"
//! max_tasks_per_user = 2
//!
//! [auth]
//! write_permissions = ["tasks:write"]
//!
//! [server]
//! bind_address = "0.0.0.0:3000"
//! request_timeout = "29s"
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::api::error_normalizer::DEFAULT_FALLBACK_MESSAGE;
use crate::error::{TaskListError, TaskListResult};

pub mod auth;
pub mod defaults;
pub mod server;
pub mod storage;

pub use auth::AuthConfig;
pub use defaults::*;
pub use server::ServerConfig;
pub use storage::{BackendKind, StorageConfig};

/// Client-facing error settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ErrorsConfig {
    /// Message sent in place of internal error details
    pub fallback_message: String,
}

impl Default for ErrorsConfig {
    fn default() -> Self {
        Self {
            fallback_message: DEFAULT_FALLBACK_MESSAGE.to_string(),
        }
    }
}

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskListConfig {
    pub storage: StorageConfig,
    pub auth: AuthConfig,
    pub errors: ErrorsConfig,
    pub server: ServerConfig,
}

impl TaskListConfig {
    /// Parse configuration from TOML text
    pub fn from_toml(text: &str) -> TaskListResult<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> TaskListResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            TaskListError::configuration(
                "file",
                format!("Failed to read {}: {}", path.display(), e),
            )
        })?;
        Self::from_toml(&text)
    }

    /// Apply overrides from an environment lookup
    pub fn apply_env<F>(&mut self, lookup: F) -> TaskListResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        self.storage.apply_env(&lookup)?;
        self.server.apply_env(&lookup);

        if let Some(message) = lookup(ENV_FALLBACK_MESSAGE) {
            self.errors.fallback_message = message;
        }

        Ok(())
    }

    /// File (if any), then process environment, then validation
    pub fn load(path: Option<&Path>) -> TaskListResult<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> TaskListResult<()> {
        self.storage.validate()?;
        self.server.validate()?;

        if self.errors.fallback_message.is_empty() {
            return Err(TaskListError::configuration(
                "errors",
                "fallback_message must not be empty",
            ));
        }

        Ok(())
    }

    /// In-memory configuration for tests and local runs
    pub fn test(table_name: impl Into<String>) -> Self {
        let mut config = Self::default();
        config.storage.table_name = table_name.into();
        config.storage.backend = BackendKind::Memory;
        config.server.bind_address = "127.0.0.1:0".to_string();
        config
    }
}
