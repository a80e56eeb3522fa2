use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, trace, warn};

use crate::application::errors::TagSyncError;
use crate::application::ports::{ReleaseQuery, ReleaseRepository, UserRepository, VcsClient};
use crate::domain::entities::{ReleaseTagRecord, Repository};

/// Page size used when walking persisted releases
pub const RELEASE_PAGE_SIZE: u32 = 50;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TagSyncReport {
    /// Tag-only records whose tag moved or vanished
    pub deleted: usize,
    /// Releases whose tag moved or vanished, turned into drafts
    pub demoted: usize,
    /// Tags stored as new records or refreshed onto existing ones
    pub added: usize,
}

/// Keeps release/tag records in line with the tags of a repository.
pub struct TagReconciler {
    vcs: Arc<dyn VcsClient>,
    releases: Arc<dyn ReleaseRepository>,
    users: Arc<dyn UserRepository>,
}

impl TagReconciler {
    pub fn new(
        vcs: Arc<dyn VcsClient>,
        releases: Arc<dyn ReleaseRepository>,
        users: Arc<dyn UserRepository>,
    ) -> Self {
        Self {
            vcs,
            releases,
            users,
        }
    }

    /// Drop records whose tag moved or vanished, then add a record for every
    /// live tag not already represented (compared case-insensitively).
    pub async fn sync_releases_with_tags(
        &self,
        repo: &Repository,
        repo_path: &Path,
    ) -> Result<TagSyncReport, TagSyncError> {
        let mut report = TagSyncReport::default();
        let mut seen: HashSet<String> = HashSet::new();

        // Collect every page before touching anything so deletions cannot
        // shift later pages.
        let records = self.all_records(repo).await?;

        for record in records.into_iter().filter(|r| !r.is_draft) {
            let live = match self.vcs.tag_commit_id(repo_path, &record.tag_name).await {
                Ok(commit_id) => Some(commit_id),
                Err(e) if e.is_not_exist() => None,
                Err(source) => {
                    return Err(TagSyncError::TagCommit {
                        tag: record.tag_name.clone(),
                        source,
                    })
                }
            };

            if live.as_deref() == Some(record.sha1.as_str()) {
                seen.insert(record.tag_name.to_lowercase());
                continue;
            }

            debug!(
                "Tag {} of {} moved or was removed; dropping record",
                record.tag_name,
                repo.full_name()
            );
            self.push_update_delete_tag(record, &mut report).await?;
        }

        let tags = self
            .vcs
            .list_tags(repo_path)
            .await
            .map_err(TagSyncError::ListTags)?;

        for tag in tags {
            if seen.contains(&tag.to_lowercase()) {
                continue;
            }
            self.push_update_add_tag(repo, repo_path, &tag).await?;
            report.added += 1;
        }

        Ok(report)
    }

    async fn all_records(&self, repo: &Repository) -> Result<Vec<ReleaseTagRecord>, TagSyncError> {
        let mut records = Vec::new();
        for page in 1.. {
            let query = ReleaseQuery {
                include_drafts: true,
                include_tags: true,
                page,
                page_size: RELEASE_PAGE_SIZE,
            };
            let batch = self
                .releases
                .list_by_repo(repo.id, query)
                .await
                .map_err(TagSyncError::ListReleases)?;
            if batch.is_empty() {
                break;
            }
            let last_page = batch.len() < RELEASE_PAGE_SIZE as usize;
            records.extend(batch);
            if last_page {
                break;
            }
        }
        Ok(records)
    }

    /// Tag-only records are deleted; releases keep their notes as drafts.
    async fn push_update_delete_tag(
        &self,
        mut record: ReleaseTagRecord,
        report: &mut TagSyncReport,
    ) -> Result<(), TagSyncError> {
        let Some(id) = record.id else {
            return Ok(());
        };

        if record.is_tag {
            self.releases.delete_by_id(id).await?;
            report.deleted += 1;
        } else {
            record.demote_to_draft();
            self.releases.update(&record).await?;
            report.demoted += 1;
        }
        Ok(())
    }

    /// Resolve a live tag into a record and store it.
    pub async fn push_update_add_tag(
        &self,
        repo: &Repository,
        repo_path: &Path,
        tag_name: &str,
    ) -> Result<(), TagSyncError> {
        let info = self
            .vcs
            .tag_info(repo_path, tag_name)
            .await
            .map_err(|source| TagSyncError::TagInfo {
                tag: tag_name.to_string(),
                source,
            })?;

        let mut record = ReleaseTagRecord::tag(repo.id, tag_name, info.commit_id.clone());

        if let Some(signer) = info.signer() {
            record.created_at = signer.when;
            record.publisher_id = match self.users.find_id_by_email(&signer.email).await {
                Ok(user) => user,
                Err(e) => {
                    warn!("Could not resolve publisher of tag {}: {}", tag_name, e);
                    None
                }
            };
        }

        record.num_commits = self
            .vcs
            .commits_count(repo_path, &info.commit_id)
            .await
            .map_err(|source| TagSyncError::CommitsCount {
                tag: tag_name.to_string(),
                source,
            })?;

        self.save_or_update_tag(record).await
    }

    /// Upsert by lower tag name so a tag never has two records.
    async fn save_or_update_tag(&self, fresh: ReleaseTagRecord) -> Result<(), TagSyncError> {
        match self
            .releases
            .find_by_tag_name(fresh.repo_id, &fresh.lower_tag_name)
            .await?
        {
            None => {
                trace!("Inserting tag record {}", fresh.tag_name);
                self.releases.insert(&fresh).await?;
            }
            Some(mut existing) => {
                trace!("Refreshing tag record {}", fresh.tag_name);
                existing.refresh_from_tag(&fresh);
                self.releases.update(&existing).await?;
            }
        }
        Ok(())
    }
}
