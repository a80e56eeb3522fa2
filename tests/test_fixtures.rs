//! Shared fixtures for integration tests: real filesystem adapters with
//! in-memory stand-ins for the database and the git object scan.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tempfile::TempDir;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use mirror_sync::application::lfs::{ObjectTransferPipeline, TransferConfig};
use mirror_sync::application::ports::{
    ContentStore, LfsMetaRepository, PointerScan, PointerScanner, RepositoryError,
};
use mirror_sync::domain::entities::LfsMetaObject;
use mirror_sync::domain::value_objects::{Oid, Pointer, PointerBlob, RepoId};
use mirror_sync::infrastructure::storage::LocalContentStore;

pub fn pointer_for(content: &[u8]) -> Pointer {
    let oid = Oid::from_hex(hex::encode(Sha256::digest(content))).unwrap();
    Pointer::new(oid, content.len() as u64)
}

/// Place `content` in a local git-lfs object directory
pub fn write_lfs_object(git_dir: &Path, pointer: &Pointer, content: &[u8]) {
    let hex = pointer.oid.as_hex();
    let dir = git_dir.join("lfs/objects").join(&hex[0..2]).join(&hex[2..4]);
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join(hex), content).unwrap();
}

pub fn lfs_object_path(git_dir: &Path, pointer: &Pointer) -> PathBuf {
    let hex = pointer.oid.as_hex();
    git_dir.join("lfs/objects").join(&hex[0..2]).join(&hex[2..4]).join(hex)
}

/// Scanner that reports a fixed list of pointers, whatever the path
pub struct FixedScanner {
    pointers: Vec<Pointer>,
}

impl FixedScanner {
    pub fn new(pointers: Vec<Pointer>) -> Self {
        Self { pointers }
    }
}

impl PointerScanner for FixedScanner {
    fn scan(&self, _repo_path: &Path, cancel: CancellationToken) -> PointerScan {
        let (tx, receiver) = mpsc::channel(4);
        let pointers = self.pointers.clone();
        let handle = tokio::spawn(async move {
            for (i, pointer) in pointers.into_iter().enumerate() {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    sent = tx.send(PointerBlob::new(pointer, format!("blob{i}"))) => {
                        if sent.is_err() {
                            break;
                        }
                    }
                }
            }
            Ok(())
        });
        PointerScan { receiver, handle }
    }
}

#[derive(Default)]
pub struct MemoryMetaRepository {
    records: Mutex<HashMap<(RepoId, Oid), LfsMetaObject>>,
}

impl MemoryMetaRepository {
    pub fn contains(&self, repo_id: RepoId, oid: &Oid) -> bool {
        self.records
            .lock()
            .unwrap()
            .contains_key(&(repo_id, oid.clone()))
    }
}

#[async_trait]
impl LfsMetaRepository for MemoryMetaRepository {
    async fn find_by_oid(
        &self,
        repo_id: RepoId,
        oid: &Oid,
    ) -> Result<Option<LfsMetaObject>, RepositoryError> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .get(&(repo_id, oid.clone()))
            .cloned())
    }

    async fn create(&self, meta: &LfsMetaObject) -> Result<bool, RepositoryError> {
        let mut records = self.records.lock().unwrap();
        let key = (meta.repo_id, meta.pointer.oid.clone());
        if records.contains_key(&key) {
            return Ok(false);
        }
        records.insert(key, meta.clone());
        Ok(true)
    }

    async fn remove_by_oid(&self, repo_id: RepoId, oid: &Oid) -> Result<u64, RepositoryError> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .remove(&(repo_id, oid.clone()))
            .map_or(0, |_| 1))
    }

    async fn count_by_repo(&self, repo_id: RepoId) -> Result<u64, RepositoryError> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .keys()
            .filter(|(r, _)| *r == repo_id)
            .count() as u64)
    }
}

/// A content store on disk plus a pipeline over it
pub struct TransferEnvironment {
    _dir: TempDir,
    pub store: Arc<LocalContentStore>,
    pub meta: Arc<MemoryMetaRepository>,
    pub repo_path: PathBuf,
}

impl TransferEnvironment {
    pub async fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(LocalContentStore::with_durability(
            dir.path().join("lfs"),
            false,
        ));
        store.init().await.unwrap();
        let repo_path = dir.path().join("acme/project.git");
        std::fs::create_dir_all(&repo_path).unwrap();

        Self {
            _dir: dir,
            store,
            meta: Arc::new(MemoryMetaRepository::default()),
            repo_path,
        }
    }

    pub fn pipeline(&self, pointers: Vec<Pointer>, config: TransferConfig) -> ObjectTransferPipeline {
        let store: Arc<dyn ContentStore> = self.store.clone();
        ObjectTransferPipeline::new(
            store,
            self.meta.clone(),
            Arc::new(FixedScanner::new(pointers)),
            config,
        )
    }
}
