use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use super::config::MirrorSyncConfig;
use super::fault::{run_guarded, strip_exit_status};
use crate::application::credentials::{
    format_clone_url, sanitize_url_error, url_with_credentials, CredentialInjector, RemoteAuth,
};
use crate::application::errors::MirrorSyncError;
use crate::application::lfs::{determine_endpoint, ObjectTransferPipeline};
use crate::application::ports::{
    LfsClientFactory, PushMirrorRepository, PushOptions, RepoRepository, VcsClient, VcsError,
};
use crate::domain::entities::{PushMirrorConfig, Repository};
use crate::domain::value_objects::PushMirrorId;

const PUSH_REFSPECS: [&str; 2] = ["+refs/heads/*:refs/heads/*", "+refs/tags/*:refs/tags/*"];

/// Pushes a repository (and its wiki) to a push-mirror remote.
pub struct PushMirrorSyncer {
    vcs: Arc<dyn VcsClient>,
    credentials: CredentialInjector,
    push_mirrors: Arc<dyn PushMirrorRepository>,
    repos: Arc<dyn RepoRepository>,
    transfer: Arc<ObjectTransferPipeline>,
    lfs_clients: Arc<dyn LfsClientFactory>,
    config: MirrorSyncConfig,
}

impl PushMirrorSyncer {
    pub fn new(
        vcs: Arc<dyn VcsClient>,
        credentials: CredentialInjector,
        push_mirrors: Arc<dyn PushMirrorRepository>,
        repos: Arc<dyn RepoRepository>,
        transfer: Arc<ObjectTransferPipeline>,
        lfs_clients: Arc<dyn LfsClientFactory>,
        config: MirrorSyncConfig,
    ) -> Self {
        Self {
            vcs,
            credentials,
            push_mirrors,
            repos,
            transfer,
            lfs_clients,
            config,
        }
    }

    /// Push everything to the mirror's remote and record the outcome.
    ///
    /// Returns `false` on any failure, including a panic inside the push.
    /// `last_update` and `last_error` are persisted either way.
    pub async fn sync_push_mirror(&self, cancel: &CancellationToken, id: PushMirrorId) -> bool {
        let mut mirror = match self.push_mirrors.find_by_id(id).await {
            Ok(Some(mirror)) => mirror,
            Ok(None) => {
                error!(mirror = %id, "Push mirror not found");
                return false;
            }
            Err(e) => {
                error!(mirror = %id, "Failed to load push mirror: {}", e);
                return false;
            }
        };
        mirror.last_error.clear();

        let scope = cancel.child_token();
        let result = run_guarded(self.run_push_sync(&scope, &mirror)).await;
        scope.cancel();

        let last_error = match &result {
            Ok(()) => None,
            Err(e) => {
                let message = strip_exit_status(&e.to_string());
                error!(mirror = %id, remote = %mirror.remote_name, "Push mirror sync failed: {}", message);
                Some(message)
            }
        };

        mirror.record_outcome(last_error, Utc::now());
        if let Err(e) = self.push_mirrors.update(&mirror).await {
            error!(mirror = %id, "Failed to persist push mirror outcome: {}", e);
            return false;
        }

        result.is_ok()
    }

    async fn run_push_sync(
        &self,
        cancel: &CancellationToken,
        mirror: &PushMirrorConfig,
    ) -> Result<(), MirrorSyncError> {
        let repo = self.load_repo(mirror).await?;

        self.perform_push(cancel, mirror, &repo.repo_path(&self.config.repo_root))
            .await?;

        if repo.has_wiki {
            let wiki_path = repo.wiki_path(&self.config.repo_root);
            if self
                .vcs
                .remote_address(&wiki_path, &mirror.remote_name)
                .await
                .is_ok()
            {
                self.perform_push(cancel, mirror, &wiki_path).await?;
            } else {
                debug!(repo = %repo, "Wiki has no push-mirror remote, skipping");
            }
        }

        info!(repo = %repo, remote = %mirror.remote_name, "Push mirror synced");
        Ok(())
    }

    async fn perform_push(
        &self,
        cancel: &CancellationToken,
        mirror: &PushMirrorConfig,
        path: &Path,
    ) -> Result<(), MirrorSyncError> {
        let remote_addr = self
            .vcs
            .remote_address(path, &mirror.remote_name)
            .await
            .map_err(|e| {
                error!(path = %path.display(), remote = %mirror.remote_name, "Unable to read remote address: {}", e);
                MirrorSyncError::RemoteAddress
            })?;

        if self.config.lfs_enabled {
            trace!(path = %path.display(), "Pushing large-file objects");
            self.push_lfs_objects(cancel, mirror, path, &remote_addr)
                .await?;
        }

        let opts = PushOptions {
            remote: mirror.remote_name.clone(),
            force: true,
            mirror: true,
            timeout: self.config.mirror_timeout,
            args: self
                .credentials
                .helper_args(&mirror.remote_username, &mirror.remote_password),
        };
        self.vcs.push(path, &opts).await.map_err(|e| {
            MirrorSyncError::Git(sanitize_url_error(&e.to_string(), &remote_addr))
        })
    }

    async fn push_lfs_objects(
        &self,
        cancel: &CancellationToken,
        mirror: &PushMirrorConfig,
        path: &Path,
        remote_addr: &str,
    ) -> Result<(), MirrorSyncError> {
        let base = url_with_credentials(
            remote_addr,
            &mirror.remote_username,
            &mirror.remote_password,
        );
        let sanitize = |message: String| MirrorSyncError::Transfer(sanitize_url_error(&message, &base));

        let endpoint = determine_endpoint(&base, None)
            .ok_or_else(|| sanitize(format!("no large-file endpoint for {base}")))?;
        let client = self
            .lfs_clients
            .create(endpoint)
            .map_err(|e| sanitize(e.to_string()))?;

        let report = self
            .transfer
            .upload(cancel, path, client.as_ref())
            .await
            .map_err(|e| sanitize(e.to_string()))?;
        debug!(path = %path.display(), "Large-file upload: {}", report.summary());
        Ok(())
    }

    /// Register the mirror's remote on the repository, and on its wiki when
    /// a wiki exists next to `address`. Only the username of `address` is
    /// written to the git config.
    pub async fn add_push_mirror_remote(
        &self,
        mirror: &PushMirrorConfig,
        address: &str,
    ) -> Result<(), MirrorSyncError> {
        let repo = self.load_repo(mirror).await?;
        let auth = RemoteAuth {
            username: mirror.remote_username.clone(),
            password: mirror.remote_password.clone(),
            token: String::new(),
        };
        let remote = format_clone_url(&auth, address)?;

        self.add_remote_and_config(mirror, &remote.url, &repo.repo_path(&self.config.repo_root))
            .await?;

        if repo.has_wiki {
            if let Some(wiki_url) = self
                .credentials
                .wiki_remote_url(self.vcs.as_ref(), &remote.url, &remote.username, &remote.password)
                .await
            {
                self.add_remote_and_config(
                    mirror,
                    &wiki_url,
                    &repo.wiki_path(&self.config.repo_root),
                )
                .await?;
            }
        }
        Ok(())
    }

    async fn add_remote_and_config(
        &self,
        mirror: &PushMirrorConfig,
        address: &str,
        path: &Path,
    ) -> Result<(), MirrorSyncError> {
        let git_err = |e: VcsError| {
            MirrorSyncError::Git(strip_exit_status(&sanitize_url_error(&e.to_string(), address)))
        };

        self.vcs
            .add_remote(path, &mirror.remote_name, address, true)
            .await
            .map_err(git_err)?;

        let key = format!("remote.{}.push", mirror.remote_name);
        for refspec in PUSH_REFSPECS {
            self.vcs
                .add_config(path, &key, refspec)
                .await
                .map_err(git_err)?;
        }
        Ok(())
    }

    /// Unregister the mirror's remote. A missing wiki remote only warns.
    pub async fn remove_push_mirror_remote(
        &self,
        mirror: &PushMirrorConfig,
    ) -> Result<(), MirrorSyncError> {
        let repo = self.load_repo(mirror).await?;

        self.vcs
            .remove_remote(&repo.repo_path(&self.config.repo_root), &mirror.remote_name)
            .await
            .map_err(|e| MirrorSyncError::Git(strip_exit_status(&e.to_string())))?;

        if repo.has_wiki {
            if let Err(e) = self
                .vcs
                .remove_remote(&repo.wiki_path(&self.config.repo_root), &mirror.remote_name)
                .await
            {
                warn!(mirror = %mirror.id, "Wiki remote could not be removed: {}", e);
            }
        }
        Ok(())
    }

    async fn load_repo(&self, mirror: &PushMirrorConfig) -> Result<Repository, MirrorSyncError> {
        self.repos
            .find_by_id(mirror.repo_id)
            .await?
            .ok_or_else(|| MirrorSyncError::RepositoryNotFound(mirror.repo_id.to_string()))
    }
}
