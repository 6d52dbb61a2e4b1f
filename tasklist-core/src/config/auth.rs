//! Authentication configuration

use serde::{Deserialize, Serialize};

use crate::api::auth::PermissionMatch;

/// Authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Run the bearer token gate in every pipeline
    pub enabled: bool,

    /// Permissions required by read and list
    pub read_permissions: Vec<String>,

    /// Permissions required by create, update and delete
    pub write_permissions: Vec<String>,

    pub permission_match: PermissionMatch,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            read_permissions: Vec::new(),
            write_permissions: Vec::new(),
            permission_match: PermissionMatch::All,
        }
    }
}
