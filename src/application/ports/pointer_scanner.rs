use std::path::Path;

use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::domain::value_objects::PointerBlob;

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Scanner process failed: {0}")]
    Process(String),

    #[error("Malformed scanner output: {0}")]
    Parse(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A running scan: pointers arrive on `receiver` (bounded, so the producer
/// waits for the consumer) and the terminal result on `handle`.
pub struct PointerScan {
    pub receiver: mpsc::Receiver<PointerBlob>,
    pub handle: JoinHandle<Result<(), ScanError>>,
}

impl PointerScan {
    /// Wait for the producer and return its terminal error, if any
    pub async fn finish(self) -> Result<(), ScanError> {
        drop(self.receiver);
        match self.handle.await {
            Ok(result) => result,
            Err(e) => Err(ScanError::Process(format!("scanner task aborted: {e}"))),
        }
    }
}

/// Port that walks a repository's object graph for pointer files
pub trait PointerScanner: Send + Sync {
    /// Spawn the producer. It stops early when `cancel` fires or the
    /// receiver is dropped.
    fn scan(&self, repo_path: &Path, cancel: CancellationToken) -> PointerScan;
}
