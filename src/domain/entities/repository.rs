use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::errors::DomainError;
use crate::domain::value_objects::{RepoId, UserId};

/// Owner of a repository as far as this engine needs to know it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
    pub id: UserId,
    pub name: String,
}

impl Owner {
    pub fn new(id: UserId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// Hosted repository entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    pub id: RepoId,
    pub owner_id: UserId,
    pub owner_name: String,
    pub name: String,
    pub description: String,
    pub default_branch: String,
    pub topics: Vec<String>,
    pub is_empty: bool,
    pub is_mirror: bool,
    pub has_wiki: bool,
    pub size_bytes: u64,
}

impl Repository {
    /// Draft of a repository that is about to be migrated.
    pub fn draft(id: RepoId, owner: &Owner, name: impl Into<String>) -> Result<Self, DomainError> {
        let name = name.into();
        validate_path_segment(&owner.name)?;
        validate_path_segment(&name)?;

        Ok(Self {
            id,
            owner_id: owner.id,
            owner_name: owner.name.clone(),
            name,
            description: String::new(),
            default_branch: String::new(),
            topics: Vec::new(),
            is_empty: true,
            is_mirror: false,
            has_wiki: false,
            size_bytes: 0,
        })
    }

    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner_name, self.name)
    }

    /// Canonical location of the main object store: `{root}/{owner}/{name}.git`
    pub fn repo_path(&self, root: &Path) -> PathBuf {
        root.join(self.owner_name.to_lowercase())
            .join(format!("{}.git", self.name.to_lowercase()))
    }

    /// Canonical location of the wiki object store: `{root}/{owner}/{name}.wiki.git`
    pub fn wiki_path(&self, root: &Path) -> PathBuf {
        root.join(self.owner_name.to_lowercase())
            .join(format!("{}.wiki.git", self.name.to_lowercase()))
    }
}

impl std::fmt::Display for Repository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}[{}]", self.full_name(), self.id)
    }
}

fn validate_path_segment(segment: &str) -> Result<(), DomainError> {
    if segment.is_empty()
        || segment == "."
        || segment == ".."
        || segment.contains(['/', '\\', '\0'])
    {
        return Err(DomainError::InvalidRepositoryName(segment.to_string()));
    }
    Ok(())
}
