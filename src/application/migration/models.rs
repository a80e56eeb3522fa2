//! Plain data read from an import source and handed to the platform sink.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoInfo {
    pub name: String,
    pub owner: String,
    pub description: String,
    pub original_url: String,
    pub clone_url: String,
    pub default_branch: String,
    pub is_private: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Milestone {
    pub title: String,
    pub description: String,
    pub deadline: Option<DateTime<Utc>>,
    pub created: DateTime<Utc>,
    pub updated: Option<DateTime<Utc>>,
    pub closed: Option<DateTime<Utc>>,
    pub state: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    pub name: String,
    pub color: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseAsset {
    pub name: String,
    pub content_type: Option<String>,
    pub size: Option<u64>,
    pub download_count: Option<u64>,
    pub download_url: Option<String>,
    pub created: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    pub tag_name: String,
    pub target_commitish: String,
    pub name: String,
    pub body: String,
    pub draft: bool,
    pub prerelease: bool,
    pub publisher_name: String,
    pub publisher_email: String,
    pub created: DateTime<Utc>,
    pub published: DateTime<Utc>,
    pub assets: Vec<ReleaseAsset>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reaction {
    pub user_name: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub number: i64,
    pub poster_name: String,
    pub title: String,
    pub content: String,
    pub milestone: Option<String>,
    pub state: String,
    pub is_locked: bool,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    pub closed: Option<DateTime<Utc>>,
    pub labels: Vec<Label>,
    pub reactions: Vec<Reaction>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub issue_index: i64,
    pub poster_name: String,
    pub content: String,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    pub reactions: Vec<Reaction>,
}

/// Identifies an issue or pull request on both sides of the import
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IssueContext {
    pub local_id: i64,
    pub foreign_id: i64,
}

/// Comment listing request. `context: None` asks for repository-wide comments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommentQuery {
    pub context: Option<IssueContext>,
    pub page: u32,
    pub per_page: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestBranch {
    pub ref_name: String,
    pub sha: String,
    pub repo_name: String,
    pub owner_name: String,
    pub clone_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequest {
    pub number: i64,
    pub title: String,
    pub poster_name: String,
    pub content: String,
    pub milestone: Option<String>,
    pub state: String,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    pub closed: Option<DateTime<Utc>>,
    pub labels: Vec<Label>,
    pub merged: bool,
    pub merged_time: Option<DateTime<Utc>>,
    pub merge_commit_sha: Option<String>,
    pub head: PullRequestBranch,
    pub base: PullRequestBranch,
    pub patch_url: String,
    pub is_locked: bool,
}

impl PullRequest {
    pub fn context(&self) -> IssueContext {
        IssueContext {
            local_id: self.number,
            foreign_id: self.number,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewComment {
    pub tree_path: String,
    pub diff_hunk: String,
    pub line: i64,
    pub commit_id: String,
    pub poster_name: String,
    pub content: String,
    pub created: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub issue_index: i64,
    pub reviewer_name: String,
    pub official: bool,
    pub commit_id: String,
    pub content: String,
    pub state: String,
    pub created: DateTime<Utc>,
    pub comments: Vec<ReviewComment>,
}
