use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::application::errors::TransferError;
use crate::application::ports::{
    BlobReader, ContentStore, DownloadSink, LfsClient, LfsError, LfsMetaRepository,
    PointerScanner, UploadSource,
};
use crate::domain::entities::LfsMetaObject;
use crate::domain::value_objects::{Oid, Pointer, PointerBlob, RepoId};

/// Limits applied to large-file transfers
#[derive(Debug, Clone, Default)]
pub struct TransferConfig {
    /// Objects larger than this are never downloaded. Zero means unlimited.
    pub max_file_size: u64,
}

impl TransferConfig {
    fn is_oversized(&self, pointer: &Pointer) -> bool {
        self.max_file_size > 0 && pointer.size > self.max_file_size
    }
}

/// Outcome of one transfer run
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TransferReport {
    /// Pointers received from the scanner
    pub scanned: usize,
    /// Download: the repository already had a record
    pub already_linked: usize,
    /// Download: content was in the store, only the record was created
    pub linked_from_store: usize,
    /// Download: larger than the configured maximum
    pub skipped_oversized: usize,
    /// Upload: content not in the local store
    pub skipped_missing: usize,
    /// Objects fetched and stored, or accepted by the remote
    pub transferred: usize,
    /// Per-object failures; never abort the run
    pub failed: usize,
    pub cancelled: bool,
}

impl TransferReport {
    pub fn summary(&self) -> String {
        format!(
            "{} scanned, {} transferred, {} failed, {} already linked, {} linked from store, {} oversized, {} missing{}",
            self.scanned,
            self.transferred,
            self.failed,
            self.already_linked,
            self.linked_from_store,
            self.skipped_oversized,
            self.skipped_missing,
            if self.cancelled { " (cancelled)" } else { "" }
        )
    }
}

#[derive(Clone, Copy)]
enum Direction {
    Download(RepoId),
    Upload,
}

/// Moves large-file objects between the local content store and a remote
/// endpoint.
///
/// A scanner task streams pointers over a bounded channel; pointers are
/// filtered, grouped into batches of the client's batch size and sent one
/// request per batch. Per-object faults are counted in the report. A failed
/// batch request aborts the run unless `cancel` has fired, in which case the
/// run ends cleanly with `cancelled` set.
pub struct ObjectTransferPipeline {
    content_store: Arc<dyn ContentStore>,
    meta_repo: Arc<dyn LfsMetaRepository>,
    scanner: Arc<dyn PointerScanner>,
    config: TransferConfig,
}

impl ObjectTransferPipeline {
    pub fn new(
        content_store: Arc<dyn ContentStore>,
        meta_repo: Arc<dyn LfsMetaRepository>,
        scanner: Arc<dyn PointerScanner>,
        config: TransferConfig,
    ) -> Self {
        Self {
            content_store,
            meta_repo,
            scanner,
            config,
        }
    }

    /// Fetch every object referenced by `repo_path` that `repo_id` does not
    /// have yet.
    pub async fn download(
        &self,
        cancel: &CancellationToken,
        repo_id: RepoId,
        repo_path: &Path,
        client: &dyn LfsClient,
    ) -> Result<TransferReport, TransferError> {
        self.run(cancel, Direction::Download(repo_id), repo_path, client)
            .await
    }

    /// Push every locally stored object referenced by `repo_path`.
    pub async fn upload(
        &self,
        cancel: &CancellationToken,
        repo_path: &Path,
        client: &dyn LfsClient,
    ) -> Result<TransferReport, TransferError> {
        self.run(cancel, Direction::Upload, repo_path, client).await
    }

    async fn run(
        &self,
        cancel: &CancellationToken,
        direction: Direction,
        repo_path: &Path,
        client: &dyn LfsClient,
    ) -> Result<TransferReport, TransferError> {
        let scan_cancel = cancel.child_token();
        let mut scan = self.scanner.scan(repo_path, scan_cancel.clone());
        let mut report = TransferReport::default();

        let consumed = self
            .consume(cancel, direction, &mut scan.receiver, client, &mut report)
            .await;

        // Stop the producer if the consumer bailed out early.
        scan_cancel.cancel();
        let scanned = scan.finish().await;

        if cancel.is_cancelled() {
            report.cancelled = true;
        }
        consumed?;

        if let Err(e) = scanned {
            if !report.cancelled {
                error!("Error enumerating large-file objects in {}: {}", repo_path.display(), e);
                return Err(e.into());
            }
        }

        debug!("Large-file transfer for {}: {}", repo_path.display(), report.summary());
        Ok(report)
    }

    async fn consume(
        &self,
        cancel: &CancellationToken,
        direction: Direction,
        receiver: &mut mpsc::Receiver<PointerBlob>,
        client: &dyn LfsClient,
        report: &mut TransferReport,
    ) -> Result<(), TransferError> {
        let batch_size = client.batch_size().max(1);
        let mut batch: Vec<Pointer> = Vec::with_capacity(batch_size);
        let mut pending: HashSet<Oid> = HashSet::new();

        loop {
            let blob = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(()),
                next = receiver.recv() => match next {
                    Some(blob) => blob,
                    None => break,
                },
            };
            report.scanned += 1;

            let pointer = blob.pointer;
            if pending.contains(&pointer.oid) {
                continue;
            }

            let enqueue = match direction {
                Direction::Download(repo_id) => {
                    self.admit_download(repo_id, &pointer, report).await?
                }
                Direction::Upload => self.admit_upload(&pointer, report).await?,
            };
            if !enqueue {
                continue;
            }

            pending.insert(pointer.oid.clone());
            batch.push(pointer);
            if batch.len() >= batch_size {
                self.flush(cancel, direction, &batch, client, report).await?;
                batch.clear();
                pending.clear();
                if report.cancelled {
                    return Ok(());
                }
            }
        }

        if !batch.is_empty() {
            self.flush(cancel, direction, &batch, client, report).await?;
        }
        Ok(())
    }

    /// Decide whether a pointer needs a network fetch
    async fn admit_download(
        &self,
        repo_id: RepoId,
        pointer: &Pointer,
        report: &mut TransferReport,
    ) -> Result<bool, TransferError> {
        if self.meta_repo.find_by_oid(repo_id, &pointer.oid).await?.is_some() {
            trace!("Skipping already linked large-file object {}", pointer);
            report.already_linked += 1;
            return Ok(false);
        }

        if self.content_store.exists(pointer).await? {
            trace!("Large-file object {} already stored; linking", pointer);
            self.meta_repo
                .create(&LfsMetaObject::new(repo_id, pointer.clone()))
                .await?;
            report.linked_from_store += 1;
            return Ok(false);
        }

        if self.config.is_oversized(pointer) {
            info!(
                "Large-file object {} not downloaded: size {} exceeds maximum {}",
                pointer, pointer.size, self.config.max_file_size
            );
            report.skipped_oversized += 1;
            return Ok(false);
        }

        Ok(true)
    }

    async fn admit_upload(
        &self,
        pointer: &Pointer,
        report: &mut TransferReport,
    ) -> Result<bool, TransferError> {
        if !self.content_store.exists(pointer).await? {
            trace!("Skipping missing large-file object {}", pointer);
            report.skipped_missing += 1;
            return Ok(false);
        }
        Ok(true)
    }

    async fn flush(
        &self,
        cancel: &CancellationToken,
        direction: Direction,
        batch: &[Pointer],
        client: &dyn LfsClient,
        report: &mut TransferReport,
    ) -> Result<(), TransferError> {
        let counters = ObjectCounters::default();

        let result = match direction {
            Direction::Download(repo_id) => {
                let sink = StoreSink {
                    repo_id,
                    content_store: self.content_store.as_ref(),
                    meta_repo: self.meta_repo.as_ref(),
                    counters: &counters,
                };
                client.download(cancel, batch, &sink).await
            }
            Direction::Upload => {
                let source = StoreSource {
                    content_store: self.content_store.as_ref(),
                    counters: &counters,
                };
                client.upload(cancel, batch, &source).await
            }
        };

        report.transferred += counters.transferred.load(Ordering::Relaxed);
        report.failed += counters.failed.load(Ordering::Relaxed);

        match result {
            Ok(()) => Ok(()),
            Err(e) if cancel.is_cancelled() => {
                debug!("Batch of {} interrupted by cancellation: {}", batch.len(), e);
                report.cancelled = true;
                Ok(())
            }
            Err(e) => {
                error!("Large-file batch of {} objects failed: {}", batch.len(), e);
                Err(e.into())
            }
        }
    }
}

#[derive(Default)]
struct ObjectCounters {
    transferred: AtomicUsize,
    failed: AtomicUsize,
}

impl ObjectCounters {
    fn fail(&self, err: LfsError) -> LfsError {
        self.failed.fetch_add(1, Ordering::Relaxed);
        err
    }
}

/// Writes downloaded content into the store and links it to the repository.
/// The record is created first and removed again if the write fails.
struct StoreSink<'a> {
    repo_id: RepoId,
    content_store: &'a dyn ContentStore,
    meta_repo: &'a dyn LfsMetaRepository,
    counters: &'a ObjectCounters,
}

#[async_trait]
impl DownloadSink for StoreSink<'_> {
    async fn receive(
        &self,
        pointer: &Pointer,
        content: Result<BlobReader, LfsError>,
    ) -> Result<(), LfsError> {
        let reader = match content {
            Ok(reader) => reader,
            Err(e) => {
                warn!("Remote could not provide large-file object {}: {}", pointer, e);
                return Err(self.counters.fail(e));
            }
        };

        let created = match self
            .meta_repo
            .create(&LfsMetaObject::new(self.repo_id, pointer.clone()))
            .await
        {
            Ok(created) => created,
            Err(e) => {
                error!("Error creating large-file record {}: {}", pointer, e);
                return Err(self.counters.fail(LfsError::Metadata(e.to_string())));
            }
        };

        if let Err(e) = self.content_store.put(pointer, reader).await {
            error!("Error storing content for large-file object {}: {}", pointer, e);
            if created {
                if let Err(e2) = self.meta_repo.remove_by_oid(self.repo_id, &pointer.oid).await {
                    error!("Error removing large-file record {}: {}", pointer, e2);
                }
            }
            return Err(self.counters.fail(e.into()));
        }

        self.counters.transferred.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

/// Opens stored content for objects the remote asks for. An object counts as
/// transferred once the client reports it sent.
struct StoreSource<'a> {
    content_store: &'a dyn ContentStore,
    counters: &'a ObjectCounters,
}

#[async_trait]
impl UploadSource for StoreSource<'_> {
    async fn open(
        &self,
        pointer: &Pointer,
        object_error: Option<LfsError>,
    ) -> Result<BlobReader, LfsError> {
        if let Some(e) = object_error {
            warn!("Remote refused large-file object {}: {}", pointer, e);
            return Err(self.counters.fail(e));
        }

        self.content_store.get(pointer).await.map_err(|e| {
            error!("Error reading large-file object {}: {}", pointer, e);
            self.counters.fail(e.into())
        })
    }

    async fn finished(&self, pointer: &Pointer, outcome: Result<(), LfsError>) {
        match outcome {
            Ok(()) => {
                self.counters.transferred.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                error!("Error sending large-file object {}: {}", pointer, e);
                self.counters.fail(e);
            }
        }
    }
}
