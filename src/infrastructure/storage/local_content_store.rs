use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashSet;
use std::path::PathBuf;
use tokio::fs::{self, File};
use tokio::io::BufReader;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::application::ports::{BlobReader, ContentStore, StorageError};
use crate::domain::value_objects::Pointer;
use crate::infrastructure::storage::{ContentHasher, PathBuilder};

/// Content-addressed large-file store on the local filesystem.
///
/// Content is streamed to a temp file, checked against the pointer and then
/// renamed into place, so readers never observe a partial object.
pub struct LocalContentStore {
    path_builder: PathBuilder,
    durable_writes: bool,
    /// Fan-out directories already created by this process
    created_dirs: RwLock<HashSet<PathBuf>>,
}

impl LocalContentStore {
    pub fn new(root: PathBuf) -> Self {
        Self::with_durability(root, true)
    }

    pub fn with_durability(root: PathBuf, durable_writes: bool) -> Self {
        Self {
            path_builder: PathBuilder::new(root),
            durable_writes,
            created_dirs: RwLock::new(HashSet::new()),
        }
    }

    /// Create the root and temp directories
    pub async fn init(&self) -> Result<(), StorageError> {
        fs::create_dir_all(self.path_builder.root().join("tmp")).await?;
        Ok(())
    }

    async fn ensure_parent(&self, path: &std::path::Path) -> Result<(), StorageError> {
        let Some(parent) = path.parent() else {
            return Ok(());
        };
        if self.created_dirs.read().contains(parent) {
            return Ok(());
        }
        fs::create_dir_all(parent).await?;
        self.created_dirs.write().insert(parent.to_path_buf());
        Ok(())
    }
}

#[async_trait]
impl ContentStore for LocalContentStore {
    async fn exists(&self, pointer: &Pointer) -> Result<bool, StorageError> {
        match fs::metadata(self.path_builder.object_path(pointer)).await {
            Ok(meta) => Ok(meta.len() == pointer.size),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    async fn get(&self, pointer: &Pointer) -> Result<BlobReader, StorageError> {
        let path = self.path_builder.object_path(pointer);
        let file = File::open(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StorageError::NotFound(pointer.to_string())
            } else {
                StorageError::Io(e)
            }
        })?;
        Ok(Box::pin(BufReader::new(file)))
    }

    async fn put(&self, pointer: &Pointer, reader: BlobReader) -> Result<(), StorageError> {
        let temp_path = self.path_builder.temp_path(Uuid::new_v4());
        self.ensure_parent(&temp_path).await?;

        debug!("Writing large-file object {} to {:?}", pointer, temp_path);
        let written =
            ContentHasher::copy_verified(&temp_path, reader, pointer, self.durable_writes).await;
        if let Err(e) = written {
            warn!("Rejected large-file object {}: {}", pointer, e);
            let _ = fs::remove_file(&temp_path).await;
            return Err(e);
        }

        let final_path = self.path_builder.object_path(pointer);
        if let Err(e) = self.ensure_parent(&final_path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e);
        }

        if fs::metadata(&final_path).await.is_ok() {
            debug!("Large-file object {} already stored", pointer);
            let _ = fs::remove_file(&temp_path).await;
            return Ok(());
        }

        if let Err(e) = fs::rename(&temp_path, &final_path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(StorageError::Io(e));
        }

        if self.durable_writes {
            if let Some(parent) = final_path.parent() {
                match File::open(parent).await {
                    Ok(dir) => {
                        if let Err(e) = dir.sync_all().await {
                            warn!("Failed to sync directory after rename: {}", e);
                        }
                    }
                    Err(e) => warn!("Failed to open directory for sync: {}", e),
                }
            }
        }

        Ok(())
    }
}
