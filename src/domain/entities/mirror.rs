use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::{MirrorInterval, RepoId};

/// Pull-mirror configuration, one-to-one with a mirrored repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MirrorConfig {
    pub repo_id: RepoId,
    pub interval: Duration,
    /// `None` when the interval is zero (manual syncing only)
    pub next_update: Option<DateTime<Utc>>,
    pub enable_prune: bool,
    pub remote_username: String,
    #[serde(skip_serializing)]
    pub remote_password: String,
    pub lfs_enabled: bool,
    pub lfs_endpoint: Option<String>,
    pub last_error: String,
    pub updated_at: Option<DateTime<Utc>>,
}

impl MirrorConfig {
    pub fn new(repo_id: RepoId, interval: MirrorInterval, now: DateTime<Utc>) -> Self {
        let mut config = Self {
            repo_id,
            interval: Duration::ZERO,
            next_update: None,
            enable_prune: true,
            remote_username: String::new(),
            remote_password: String::new(),
            lfs_enabled: false,
            lfs_endpoint: None,
            last_error: String::new(),
            updated_at: None,
        };
        config.set_interval(interval, now);
        config
    }

    pub fn set_interval(&mut self, interval: MirrorInterval, now: DateTime<Utc>) {
        self.interval = interval.as_duration();
        self.schedule_next_update(now);
    }

    /// Recompute the next-due time from `now`
    pub fn schedule_next_update(&mut self, now: DateTime<Utc>) {
        self.next_update = match MirrorInterval::from_duration(self.interval) {
            MirrorInterval::Manual => None,
            MirrorInterval::Every(d) => chrono::Duration::from_std(d).ok().map(|d| now + d),
        };
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        !self.interval.is_zero() && self.next_update.is_some_and(|next| next <= now)
    }
}
