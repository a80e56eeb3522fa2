use async_trait::async_trait;
#[cfg(test)]
use mockall::{automock, predicate::*};
use std::pin::Pin;
use thiserror::Error;
use tokio::io::AsyncRead;

use crate::domain::value_objects::Pointer;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Hash mismatch: expected {expected}, got {actual}")]
    HashMismatch { expected: String, actual: String },

    #[error("Size mismatch for {oid}: expected {expected} bytes, got {actual}")]
    SizeMismatch {
        oid: String,
        expected: u64,
        actual: u64,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Type alias for async reader
pub type BlobReader = Pin<Box<dyn AsyncRead + Send>>;

/// Port for the content-addressed large-file store.
///
/// Objects are keyed by pointer (oid + size). Writes of the same pointer are
/// idempotent, so concurrent writers need no coordination.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Check if the object is present
    async fn exists(&self, pointer: &Pointer) -> Result<bool, StorageError>;

    /// Open the object for reading
    async fn get(&self, pointer: &Pointer) -> Result<BlobReader, StorageError>;

    /// Store the object, verifying content against the pointer's hash and size
    async fn put(&self, pointer: &Pointer, reader: BlobReader) -> Result<(), StorageError>;
}
