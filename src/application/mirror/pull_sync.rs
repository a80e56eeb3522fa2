use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::config::MirrorSyncConfig;
use super::fault::{run_guarded, strip_exit_status};
use crate::application::credentials::{sanitize_url_error, url_with_credentials, CredentialInjector};
use crate::application::errors::MirrorSyncError;
use crate::application::lfs::{determine_endpoint, ObjectTransferPipeline};
use crate::application::ports::{
    FetchOptions, LfsClientFactory, MirrorRepository, RepoRepository, VcsClient,
};
use crate::application::tags::TagReconciler;
use crate::domain::entities::{MirrorConfig, Repository};
use crate::domain::value_objects::RepoId;

const ORIGIN: &str = "origin";

/// Fetches upstream changes into a pull-mirrored repository.
pub struct PullMirrorSyncer {
    vcs: Arc<dyn VcsClient>,
    credentials: CredentialInjector,
    mirrors: Arc<dyn MirrorRepository>,
    repos: Arc<dyn RepoRepository>,
    tags: Arc<TagReconciler>,
    transfer: Arc<ObjectTransferPipeline>,
    lfs_clients: Arc<dyn LfsClientFactory>,
    config: MirrorSyncConfig,
}

impl PullMirrorSyncer {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        vcs: Arc<dyn VcsClient>,
        credentials: CredentialInjector,
        mirrors: Arc<dyn MirrorRepository>,
        repos: Arc<dyn RepoRepository>,
        tags: Arc<TagReconciler>,
        transfer: Arc<ObjectTransferPipeline>,
        lfs_clients: Arc<dyn LfsClientFactory>,
        config: MirrorSyncConfig,
    ) -> Self {
        Self {
            vcs,
            credentials,
            mirrors,
            repos,
            tags,
            transfer,
            lfs_clients,
            config,
        }
    }

    /// Update the mirror from its origin and record the outcome.
    ///
    /// The next update is scheduled whether or not the fetch succeeded, so a
    /// broken upstream is retried once per interval.
    pub async fn sync_pull_mirror(&self, cancel: &CancellationToken, repo_id: RepoId) -> bool {
        let mut mirror = match self.mirrors.find_by_repo_id(repo_id).await {
            Ok(Some(mirror)) => mirror,
            Ok(None) => {
                error!(repo_id = %repo_id, "Pull mirror not found");
                return false;
            }
            Err(e) => {
                error!(repo_id = %repo_id, "Failed to load pull mirror: {}", e);
                return false;
            }
        };

        let scope = cancel.child_token();
        let result = run_guarded(self.run_pull_sync(&scope, &mirror)).await;
        scope.cancel();

        let now = Utc::now();
        mirror.last_error = match &result {
            Ok(()) => String::new(),
            Err(e) => {
                let message = strip_exit_status(&e.to_string());
                error!(repo_id = %repo_id, "Pull mirror sync failed: {}", message);
                message
            }
        };
        mirror.updated_at = Some(now);
        mirror.schedule_next_update(now);

        if let Err(e) = self.mirrors.update(&mirror).await {
            error!(repo_id = %repo_id, "Failed to persist pull mirror outcome: {}", e);
            return false;
        }

        result.is_ok()
    }

    async fn run_pull_sync(
        &self,
        cancel: &CancellationToken,
        mirror: &MirrorConfig,
    ) -> Result<(), MirrorSyncError> {
        let repo = self
            .repos
            .find_by_id(mirror.repo_id)
            .await?
            .ok_or_else(|| MirrorSyncError::RepositoryNotFound(mirror.repo_id.to_string()))?;
        let repo_path = repo.repo_path(&self.config.repo_root);

        let remote_addr = self.fetch(mirror, &repo_path).await?;

        match self.tags.sync_releases_with_tags(&repo, &repo_path).await {
            Ok(report) => debug!(repo = %repo, ?report, "Tags reconciled"),
            Err(e) => error!(repo = %repo, "Failed to synchronize tags to releases: {}", e),
        }

        if mirror.lfs_enabled && self.config.lfs_enabled {
            self.fetch_lfs_objects(cancel, mirror, &repo, &repo_path, &remote_addr)
                .await;
        }

        match self.vcs.repository_size(&repo_path).await {
            Ok(size) => {
                if let Err(e) = self.repos.update_size(repo.id, size).await {
                    error!(repo = %repo, "Failed to update size: {}", e);
                }
            }
            Err(e) => error!(repo = %repo, "Failed to compute size: {}", e),
        }

        let wiki_path = repo.wiki_path(&self.config.repo_root);
        if repo.has_wiki && tokio::fs::try_exists(&wiki_path).await.unwrap_or(false) {
            self.fetch(mirror, &wiki_path).await?;
        }

        info!(repo = %repo, "Pull mirror synced");
        Ok(())
    }

    /// `git remote update` against origin; returns the origin address
    async fn fetch(&self, mirror: &MirrorConfig, path: &Path) -> Result<String, MirrorSyncError> {
        let remote_addr = self.vcs.remote_address(path, ORIGIN).await.map_err(|e| {
            error!(path = %path.display(), "Unable to read origin address: {}", e);
            MirrorSyncError::RemoteAddress
        })?;

        let opts = FetchOptions {
            remote: ORIGIN.to_string(),
            prune: mirror.enable_prune,
            timeout: self.config.mirror_timeout,
            args: self
                .credentials
                .helper_args(&mirror.remote_username, &mirror.remote_password),
        };
        self.vcs.remote_update(path, &opts).await.map_err(|e| {
            MirrorSyncError::Git(strip_exit_status(&sanitize_url_error(
                &e.to_string(),
                &remote_addr,
            )))
        })?;

        Ok(remote_addr)
    }

    async fn fetch_lfs_objects(
        &self,
        cancel: &CancellationToken,
        mirror: &MirrorConfig,
        repo: &Repository,
        repo_path: &Path,
        remote_addr: &str,
    ) {
        let base = url_with_credentials(
            remote_addr,
            &mirror.remote_username,
            &mirror.remote_password,
        );
        let Some(endpoint) = determine_endpoint(&base, mirror.lfs_endpoint.as_deref()) else {
            warn!(repo = %repo, "No large-file endpoint could be derived");
            return;
        };

        let client = match self.lfs_clients.create(endpoint) {
            Ok(client) => client,
            Err(e) => {
                error!(repo = %repo, "Failed to create large-file client: {}", sanitize_url_error(&e.to_string(), &base));
                return;
            }
        };

        match self
            .transfer
            .download(cancel, repo.id, repo_path, client.as_ref())
            .await
        {
            Ok(report) => debug!(repo = %repo, "Large-file download: {}", report.summary()),
            Err(e) => error!(
                repo = %repo,
                "Failed to fetch large-file objects: {}",
                sanitize_url_error(&e.to_string(), &base)
            ),
        }
    }
}
