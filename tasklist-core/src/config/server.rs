//! HTTP server configuration

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;

use super::defaults::*;
use crate::error::{TaskListError, TaskListResult};

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address for the HTTP server
    pub bind_address: String,

    /// Deadline for a single request
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl ServerConfig {
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(bind) = lookup(ENV_BIND_ADDRESS) {
            self.bind_address = bind;
        }
    }

    pub fn socket_addr(&self) -> TaskListResult<SocketAddr> {
        Ok(self.bind_address.parse()?)
    }

    pub fn validate(&self) -> TaskListResult<()> {
        self.socket_addr()?;

        if self.request_timeout.is_zero() {
            return Err(TaskListError::configuration(
                "server",
                "request_timeout must be greater than 0",
            ));
        }

        Ok(())
    }
}
