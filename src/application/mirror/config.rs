use std::path::PathBuf;
use std::time::Duration;

/// Settings shared by the pull and push syncers
#[derive(Debug, Clone)]
pub struct MirrorSyncConfig {
    /// Directory holding `<owner>/<name>.git` stores
    pub repo_root: PathBuf,
    /// Timeout for a single fetch or push
    pub mirror_timeout: Duration,
    /// Global large-file switch
    pub lfs_enabled: bool,
}

impl Default for MirrorSyncConfig {
    fn default() -> Self {
        Self {
            repo_root: PathBuf::from("data/repositories"),
            mirror_timeout: Duration::from_secs(8 * 60),
            lfs_enabled: true,
        }
    }
}

/// Configuration for the mirror scheduler loop
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// How often due mirrors are collected
    pub poll_interval: Duration,
    /// Syncs running at the same time
    pub max_concurrent_syncs: usize,
    /// Maximum mirrors of each direction picked up per pass
    pub batch_limit: i64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(60),
            max_concurrent_syncs: 5,
            batch_limit: 50,
        }
    }
}
