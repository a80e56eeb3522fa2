use serde::{Deserialize, Serialize};

use crate::application::credentials::RemoteAuth;

/// What to import and from where
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MigrateOptions {
    pub clone_addr: String,
    pub auth_username: String,
    #[serde(skip_serializing)]
    pub auth_password: String,
    #[serde(skip_serializing)]
    pub auth_token: String,
    pub repo_name: String,

    pub wiki: bool,
    pub issues: bool,
    pub milestones: bool,
    pub labels: bool,
    /// Set when releases are imported from the source; tag reconciliation is
    /// skipped in that case.
    pub releases: bool,
    pub comments: bool,
    pub pull_requests: bool,

    pub lfs: bool,
    /// Explicit large-file endpoint; discovered from `clone_addr` when empty
    pub lfs_endpoint: String,

    pub mirror: bool,
    /// Go-style duration (`"8h"`, `"10m30s"`); empty means the configured default
    pub mirror_interval: String,
}

impl MigrateOptions {
    pub fn new(clone_addr: impl Into<String>, repo_name: impl Into<String>) -> Self {
        Self {
            clone_addr: clone_addr.into(),
            repo_name: repo_name.into(),
            ..Self::default()
        }
    }

    pub fn auth(&self) -> RemoteAuth {
        RemoteAuth {
            username: self.auth_username.clone(),
            password: self.auth_password.clone(),
            token: self.auth_token.clone(),
        }
    }
}
