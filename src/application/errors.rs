//! Error types returned by the synchronisation use cases.

use std::path::PathBuf;

use thiserror::Error;

use crate::application::credentials::RemoteAddressError;
use crate::application::migration::import_source::ImportSourceError;
use crate::application::ports::{LfsError, RepositoryError, ScanError, StorageError, VcsError};
use crate::domain::errors::DomainError;

/// Fatal migration failures. Anything not listed here is logged and the
/// import continues.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("Invalid migration request: {0}")]
    Domain(#[from] DomainError),

    #[error("Failed to remove {path}: {source}")]
    RemovePath {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Clone: {0}")]
    Clone(String),

    #[error("update-server-info: {0}")]
    UpdateServerInfo(String),

    #[error("Inspecting imported repository: {0}")]
    Inspect(#[source] VcsError),

    #[error("Finalizing import: {0}")]
    Cleanup(#[source] VcsError),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("Import source: {0}")]
    Source(#[from] ImportSourceError),

    #[error("Migration cancelled")]
    Cancelled,
}

/// Failures that abort a large-file transfer run
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("Large-file endpoint: {0}")]
    Lfs(#[from] LfsError),

    #[error("Pointer scan: {0}")]
    Scan(#[from] ScanError),

    #[error("Content store: {0}")]
    Storage(#[from] StorageError),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("Invalid endpoint: {0}")]
    Endpoint(String),
}

#[derive(Debug, Error)]
pub enum TagSyncError {
    #[error("Listing releases: {0}")]
    ListReleases(#[source] RepositoryError),

    #[error("Resolving tag {tag}: {source}")]
    TagCommit {
        tag: String,
        #[source]
        source: VcsError,
    },

    #[error("Listing tags: {0}")]
    ListTags(#[source] VcsError),

    #[error("Reading tag {tag}: {source}")]
    TagInfo {
        tag: String,
        #[source]
        source: VcsError,
    },

    #[error("Counting commits for {tag}: {source}")]
    CommitsCount {
        tag: String,
        #[source]
        source: VcsError,
    },

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Mirror sync failures; the message is what ends up in `last_error`
#[derive(Debug, Error)]
pub enum MirrorSyncError {
    #[error("Mirror {0} not found")]
    NotFound(String),

    #[error("Repository {0} not found")]
    RepositoryNotFound(String),

    /// Never carries the remote address
    #[error("Unexpected error")]
    RemoteAddress,

    #[error("Invalid remote address: {0}")]
    InvalidAddress(#[from] RemoteAddressError),

    #[error("{0}")]
    Git(String),

    #[error("{0}")]
    Transfer(String),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("Sync panicked: {0}")]
    Panicked(String),
}
