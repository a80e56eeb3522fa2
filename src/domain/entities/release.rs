use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::{ReleaseId, RepoId, UserId};

/// Release or bare tag known to the platform
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseTagRecord {
    /// `None` until persisted
    pub id: Option<ReleaseId>,
    pub repo_id: RepoId,
    pub tag_name: String,
    pub lower_tag_name: String,
    pub sha1: String,
    pub num_commits: u64,
    pub is_draft: bool,
    /// Tag without release notes, created by tag synchronisation
    pub is_tag: bool,
    pub publisher_id: Option<UserId>,
    pub created_at: DateTime<Utc>,
}

impl ReleaseTagRecord {
    /// Tag-only record for a tag discovered in the object store
    pub fn tag(repo_id: RepoId, tag_name: impl Into<String>, sha1: impl Into<String>) -> Self {
        let tag_name = tag_name.into();
        Self {
            id: None,
            repo_id,
            lower_tag_name: tag_name.to_lowercase(),
            tag_name,
            sha1: sha1.into(),
            num_commits: 0,
            is_draft: false,
            is_tag: true,
            publisher_id: None,
            created_at: DateTime::<Utc>::UNIX_EPOCH + chrono::Duration::seconds(1),
        }
    }

    /// Turn a release whose tag disappeared into a draft
    pub fn demote_to_draft(&mut self) {
        self.is_draft = true;
        self.num_commits = 0;
        self.sha1.clear();
    }

    /// Copy the tag facts from a freshly resolved record, keeping identity
    /// and release metadata.
    pub fn refresh_from_tag(&mut self, fresh: &ReleaseTagRecord) {
        self.tag_name = fresh.tag_name.clone();
        self.lower_tag_name = fresh.lower_tag_name.clone();
        self.sha1 = fresh.sha1.clone();
        self.num_commits = fresh.num_commits;
        self.created_at = fresh.created_at;
        self.is_draft = false;
        if self.is_tag && fresh.publisher_id.is_some() {
            self.publisher_id = fresh.publisher_id;
        }
    }
}
