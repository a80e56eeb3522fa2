use sha2::{Digest, Sha256};
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt, BufWriter};

use crate::application::ports::StorageError;
use crate::domain::value_objects::Pointer;

const BUFFER_SIZE: usize = 256 * 1024;

/// Copies large-file content to disk while checking it against its pointer.
pub struct ContentHasher;

impl ContentHasher {
    /// Stream `reader` into `dest_path`, hashing as it goes.
    ///
    /// Fails with `SizeMismatch` as soon as more bytes arrive than the
    /// pointer declares, or at the end when fewer did. Fails with
    /// `HashMismatch` when the SHA-256 differs from the pointer's oid. The
    /// caller owns `dest_path` and removes it on error.
    pub async fn copy_verified(
        dest_path: &Path,
        mut reader: impl AsyncRead + Unpin,
        expected: &Pointer,
        durable: bool,
    ) -> Result<u64, StorageError> {
        let mut file = BufWriter::with_capacity(BUFFER_SIZE * 2, File::create(dest_path).await?);
        let mut hasher = Sha256::new();
        let mut written = 0u64;
        let mut buffer = vec![0u8; BUFFER_SIZE];

        loop {
            let n = reader.read(&mut buffer).await?;
            if n == 0 {
                break;
            }
            written += n as u64;
            if written > expected.size {
                return Err(Self::size_mismatch(expected, written));
            }
            hasher.update(&buffer[..n]);
            file.write_all(&buffer[..n]).await?;
        }

        if written != expected.size {
            return Err(Self::size_mismatch(expected, written));
        }

        let actual = hex::encode(hasher.finalize());
        if actual != expected.oid.as_hex() {
            return Err(StorageError::HashMismatch {
                expected: expected.oid.to_string(),
                actual,
            });
        }

        file.flush().await?;
        if durable {
            file.get_mut().sync_all().await?;
        }
        Ok(written)
    }

    fn size_mismatch(expected: &Pointer, actual: u64) -> StorageError {
        StorageError::SizeMismatch {
            oid: expected.oid.to_string(),
            expected: expected.size,
            actual,
        }
    }
}
