use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio_util::sync::CancellationToken;
use tracing::warn;
use uuid::Uuid;

use crate::application::ports::{BlobReader, DownloadSink, LfsClient, LfsError, UploadSource};
use crate::domain::value_objects::Pointer;

/// Large-file client for a `file://` endpoint: objects live under
/// `<git dir>/lfs/objects/aa/bb/<oid>` of a repository on this machine.
pub struct FilesystemLfsClient {
    objects_dir: PathBuf,
    batch_size: usize,
}

impl FilesystemLfsClient {
    pub fn new(git_dir: impl AsRef<Path>, batch_size: usize) -> Self {
        Self {
            objects_dir: git_dir.as_ref().join("lfs").join("objects"),
            batch_size: batch_size.max(1),
        }
    }

    fn object_path(&self, pointer: &Pointer) -> PathBuf {
        let hex = pointer.oid.as_hex();
        self.objects_dir.join(&hex[0..2]).join(&hex[2..4]).join(hex)
    }

    async fn open(&self, pointer: &Pointer) -> Result<BlobReader, LfsError> {
        match fs::File::open(self.object_path(pointer)).await {
            Ok(file) => Ok(Box::pin(file)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(LfsError::Object {
                oid: pointer.oid.to_string(),
                code: 404,
                message: "Object does not exist".to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    async fn is_present(&self, pointer: &Pointer) -> bool {
        fs::metadata(self.object_path(pointer))
            .await
            .is_ok_and(|meta| meta.len() == pointer.size)
    }

    async fn store(&self, pointer: &Pointer, mut reader: BlobReader) -> Result<(), LfsError> {
        let target = self.object_path(pointer);
        let parent = target
            .parent()
            .ok_or_else(|| LfsError::Protocol(format!("no parent for {}", target.display())))?;
        fs::create_dir_all(parent).await?;

        let temp = parent.join(format!(".{}.tmp", Uuid::new_v4()));
        let mut file = fs::File::create(&temp).await?;
        let copied = tokio::io::copy(&mut reader, &mut file).await;
        drop(file);
        match copied {
            Ok(written) if written == pointer.size => {
                fs::rename(&temp, &target).await?;
                Ok(())
            }
            Ok(written) => {
                let _ = fs::remove_file(&temp).await;
                Err(LfsError::Protocol(format!(
                    "object {} is {} bytes, expected {}",
                    pointer.oid, written, pointer.size
                )))
            }
            Err(e) => {
                let _ = fs::remove_file(&temp).await;
                Err(e.into())
            }
        }
    }
}

#[async_trait]
impl LfsClient for FilesystemLfsClient {
    fn batch_size(&self) -> usize {
        self.batch_size
    }

    async fn download(
        &self,
        cancel: &CancellationToken,
        objects: &[Pointer],
        sink: &dyn DownloadSink,
    ) -> Result<(), LfsError> {
        for pointer in objects {
            if cancel.is_cancelled() {
                return Err(LfsError::Cancelled);
            }
            let content = self.open(pointer).await;
            let _ = sink.receive(pointer, content).await;
        }
        Ok(())
    }

    async fn upload(
        &self,
        cancel: &CancellationToken,
        objects: &[Pointer],
        source: &dyn UploadSource,
    ) -> Result<(), LfsError> {
        for pointer in objects {
            if cancel.is_cancelled() {
                return Err(LfsError::Cancelled);
            }
            if self.is_present(pointer).await {
                continue;
            }
            let Ok(reader) = source.open(pointer, None).await else {
                continue;
            };
            let outcome = self.store(pointer, reader).await;
            if let Err(e) = &outcome {
                warn!("Storing large-file object {} failed: {}", pointer, e);
            }
            source.finished(pointer, outcome).await;
        }
        Ok(())
    }
}
