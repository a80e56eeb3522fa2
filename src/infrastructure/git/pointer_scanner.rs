use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::application::ports::{PointerScan, PointerScanner, ScanError};
use crate::domain::value_objects::{Pointer, PointerBlob, BLOB_SIZE_CUTOFF};

/// Finds pointer files among all blobs of a repository.
///
/// `git cat-file --batch-check` lists every object; blobs small enough to be
/// pointers are read back through `git cat-file --batch` and parsed. Results
/// go through a bounded channel, so scanning never runs far ahead of the
/// transfer.
pub struct GitPointerScanner {
    git_binary: PathBuf,
    queue_capacity: usize,
}

impl GitPointerScanner {
    pub fn new(queue_capacity: usize) -> Self {
        Self {
            git_binary: PathBuf::from("git"),
            queue_capacity: queue_capacity.max(1),
        }
    }
}

impl PointerScanner for GitPointerScanner {
    fn scan(&self, repo_path: &Path, cancel: CancellationToken) -> PointerScan {
        let (tx, receiver) = mpsc::channel(self.queue_capacity);
        let git = self.git_binary.clone();
        let repo = repo_path.to_path_buf();

        let handle = tokio::spawn(async move { produce(&git, &repo, tx, cancel).await });

        PointerScan { receiver, handle }
    }
}

async fn produce(
    git: &Path,
    repo: &Path,
    tx: mpsc::Sender<PointerBlob>,
    cancel: CancellationToken,
) -> Result<(), ScanError> {
    let candidates = small_blobs(git, repo).await?;
    debug!(
        "{} candidate pointer blobs in {}",
        candidates.len(),
        repo.display()
    );
    if candidates.is_empty() {
        return Ok(());
    }

    let mut child = Command::new(git)
        .args(["cat-file", "--batch"])
        .current_dir(repo)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn()?;
    let mut stdin = child
        .stdin
        .take()
        .ok_or_else(|| ScanError::Process("cat-file stdin unavailable".into()))?;
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| ScanError::Process("cat-file stdout unavailable".into()))?;

    let ids = candidates.clone();
    let writer = tokio::spawn(async move {
        for id in ids {
            stdin.write_all(id.as_bytes()).await?;
            stdin.write_all(b"\n").await?;
        }
        stdin.shutdown().await
    });

    let mut reader = BufReader::new(stdout);
    for _ in 0..candidates.len() {
        let mut header = String::new();
        let read = tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            read = reader.read_line(&mut header) => read?,
        };
        if read == 0 {
            return Err(ScanError::Parse("cat-file output ended early".into()));
        }

        let Some((blob_id, size)) = parse_batch_header(&header)? else {
            trace!("Skipping missing object: {}", header.trim_end());
            continue;
        };

        let mut content = vec![0u8; size + 1];
        reader.read_exact(&mut content).await?;
        content.pop();

        let Some(pointer) = Pointer::parse(&content) else {
            continue;
        };
        tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            sent = tx.send(PointerBlob::new(pointer, blob_id)) => {
                if sent.is_err() {
                    // Consumer went away; nothing left to do.
                    return Ok(());
                }
            }
        }
    }

    match writer.await {
        Ok(result) => result?,
        Err(e) => return Err(ScanError::Process(format!("cat-file writer failed: {e}"))),
    }
    let status = child.wait().await?;
    if !status.success() {
        return Err(ScanError::Process(format!("git cat-file --batch: {status}")));
    }
    Ok(())
}

/// Ids of every blob smaller than the pointer size cutoff
async fn small_blobs(git: &Path, repo: &Path) -> Result<Vec<String>, ScanError> {
    let output = Command::new(git)
        .args([
            "cat-file",
            "--batch-all-objects",
            "--batch-check=%(objecttype) %(objectname) %(objectsize)",
        ])
        .current_dir(repo)
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .output()
        .await?;
    if !output.status.success() {
        return Err(ScanError::Process(format!(
            "git cat-file --batch-check: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }
    parse_batch_check(&String::from_utf8_lossy(&output.stdout))
}

fn parse_batch_check(output: &str) -> Result<Vec<String>, ScanError> {
    let mut blobs = Vec::new();
    for line in output.lines().filter(|l| !l.is_empty()) {
        let mut parts = line.split(' ');
        let (Some(kind), Some(id), Some(size)) = (parts.next(), parts.next(), parts.next()) else {
            return Err(ScanError::Parse(line.to_string()));
        };
        let size: u64 = size
            .parse()
            .map_err(|_| ScanError::Parse(line.to_string()))?;
        if kind == "blob" && size < BLOB_SIZE_CUTOFF {
            blobs.push(id.to_string());
        }
    }
    Ok(blobs)
}

/// `<id> <type> <size>`; `None` for `<id> missing`
fn parse_batch_header(header: &str) -> Result<Option<(String, usize)>, ScanError> {
    let parts: Vec<&str> = header.trim_end().split(' ').collect();
    match parts.as_slice() {
        [_, "missing"] => Ok(None),
        [id, _, size] => size
            .parse()
            .map(|size| Some((id.to_string(), size)))
            .map_err(|_| ScanError::Parse(header.trim_end().to_string())),
        _ => Err(ScanError::Parse(header.trim_end().to_string())),
    }
}
