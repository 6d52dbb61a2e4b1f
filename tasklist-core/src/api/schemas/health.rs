//! Health check API schemas

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Overall service health status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    /// The store could not be reached
    Unhealthy,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: HealthStatus,

    /// Timestamp of health check (ISO 8601)
    pub timestamp: chrono::DateTime<chrono::Utc>,

    /// Application version
    pub version: String,

    /// Name of the table tasks are stored in
    pub table_name: String,
}

impl HealthResponse {
    pub fn new(status: HealthStatus, table_name: impl Into<String>) -> Self {
        Self {
            status,
            timestamp: chrono::Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            table_name: table_name.into(),
        }
    }
}
