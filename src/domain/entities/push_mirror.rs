use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::{PushMirrorId, RepoId};

/// Push-mirror configuration of a repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushMirrorConfig {
    pub id: PushMirrorId,
    pub repo_id: RepoId,
    /// Name of the git remote registered in the repository's config
    pub remote_name: String,
    pub remote_username: String,
    #[serde(skip_serializing)]
    pub remote_password: String,
    /// Zero disables scheduled syncing
    pub interval: Duration,
    pub created_at: DateTime<Utc>,
    pub last_update: Option<DateTime<Utc>>,
    pub last_error: String,
}

impl PushMirrorConfig {
    pub fn new(
        id: PushMirrorId,
        repo_id: RepoId,
        remote_name: impl Into<String>,
        interval: Duration,
    ) -> Self {
        Self {
            id,
            repo_id,
            remote_name: remote_name.into(),
            remote_username: String::new(),
            remote_password: String::new(),
            interval,
            created_at: Utc::now(),
            last_update: None,
            last_error: String::new(),
        }
    }

    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.remote_username = username.into();
        self.remote_password = password.into();
        self
    }

    /// Last successful or failed sync, with "never" mapped to the epoch so
    /// never-synced mirrors sort as the stalest.
    pub fn last_update_or_epoch(&self) -> DateTime<Utc> {
        self.last_update.unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
    }

    /// `interval != 0 && last_update + interval <= now`
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        if self.interval.is_zero() {
            return false;
        }
        match chrono::Duration::from_std(self.interval) {
            Ok(interval) => self.last_update_or_epoch() + interval <= now,
            Err(_) => false,
        }
    }

    pub fn record_outcome(&mut self, error: Option<String>, now: DateTime<Utc>) {
        self.last_error = error.unwrap_or_default();
        self.last_update = Some(now);
    }
}
