mod content_store;
mod lfs_client;
mod lfs_meta_repository;
mod migration_sink;
mod mirror_repository;
mod pointer_scanner;
mod release_repository;
mod repo_repository;
mod vcs;

pub use content_store::{BlobReader, ContentStore, StorageError};
pub use lfs_client::{DownloadSink, LfsClient, LfsClientFactory, LfsError, UploadSource};
pub use lfs_meta_repository::LfsMetaRepository;
pub use migration_sink::MigrationSink;
pub use mirror_repository::{MirrorRepository, PushMirrorRepository};
pub use pointer_scanner::{PointerScan, PointerScanner, ScanError};
pub use release_repository::{ReleaseQuery, ReleaseRepository};
pub use repo_repository::{RepoRepository, RepositoryError, UserRepository};
pub use vcs::{
    CloneOptions, FetchOptions, PushOptions, Signature, TagInfo, VcsClient, VcsError,
};

#[cfg(test)]
pub use content_store::MockContentStore;
#[cfg(test)]
pub use lfs_meta_repository::MockLfsMetaRepository;
#[cfg(test)]
pub use migration_sink::MockMigrationSink;
#[cfg(test)]
pub use mirror_repository::{MockMirrorRepository, MockPushMirrorRepository};
#[cfg(test)]
pub use release_repository::MockReleaseRepository;
#[cfg(test)]
pub use repo_repository::{MockRepoRepository, MockUserRepository};
#[cfg(test)]
pub use vcs::MockVcsClient;
