use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use url::Url;

use super::content_store::BlobReader;
use super::StorageError;
use crate::domain::value_objects::Pointer;

#[derive(Debug, Error)]
pub enum LfsError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// The remote rejected one object; siblings are unaffected
    #[error("Object {oid} failed ({code}): {message}")]
    Object {
        oid: String,
        code: i64,
        message: String,
    },

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Metadata error: {0}")]
    Metadata(String),

    #[error("Cancelled")]
    Cancelled,
}

/// Receives each downloaded object.
#[async_trait]
pub trait DownloadSink: Send + Sync {
    /// `content` is the object's body, or the error the remote reported for
    /// it. An `Err` returned here fails only this object.
    async fn receive(
        &self,
        pointer: &Pointer,
        content: Result<BlobReader, LfsError>,
    ) -> Result<(), LfsError>;
}

/// Supplies the content of each object the remote asks for.
#[async_trait]
pub trait UploadSource: Send + Sync {
    /// `object_error` is set when the remote refused the object; the source
    /// records it and returns it back. An `Err` fails only this object.
    async fn open(
        &self,
        pointer: &Pointer,
        object_error: Option<LfsError>,
    ) -> Result<BlobReader, LfsError>;

    /// Outcome of sending an object whose `open` succeeded. Called once per
    /// opened object.
    async fn finished(&self, pointer: &Pointer, outcome: Result<(), LfsError>);
}

/// Port for a large-file remote endpoint.
///
/// Per-object faults go through the sink/source and never abort the call;
/// an `Err` from `download`/`upload` means the batch request itself failed.
#[async_trait]
pub trait LfsClient: Send + Sync {
    /// Maximum number of pointers per request
    fn batch_size(&self) -> usize;

    async fn download(
        &self,
        cancel: &CancellationToken,
        objects: &[Pointer],
        sink: &dyn DownloadSink,
    ) -> Result<(), LfsError>;

    async fn upload(
        &self,
        cancel: &CancellationToken,
        objects: &[Pointer],
        source: &dyn UploadSource,
    ) -> Result<(), LfsError>;
}

/// Builds a client for a discovered endpoint
pub trait LfsClientFactory: Send + Sync {
    fn create(&self, endpoint: Url) -> Result<Arc<dyn LfsClient>, LfsError>;
}
