use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::{Pointer, RepoId};

/// Records that a large-file object is present for a repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LfsMetaObject {
    pub repo_id: RepoId,
    pub pointer: Pointer,
    pub created_at: DateTime<Utc>,
}

impl LfsMetaObject {
    pub fn new(repo_id: RepoId, pointer: Pointer) -> Self {
        Self {
            repo_id,
            pointer,
            created_at: Utc::now(),
        }
    }
}
