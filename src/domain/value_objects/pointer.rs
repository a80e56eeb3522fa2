use serde::{Deserialize, Serialize};

use super::Oid;

/// First line of every LFS pointer file.
pub const POINTER_VERSION_LINE: &str = "version https://git-lfs.github.com/spec/v1";

/// Pointer files are tiny; blobs above this size are never inspected.
pub const BLOB_SIZE_CUTOFF: u64 = 1024;

/// Reference to one large-file object: content hash + declared size.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Pointer {
    pub oid: Oid,
    pub size: u64,
}

impl Pointer {
    pub fn new(oid: Oid, size: u64) -> Self {
        Self { oid, size }
    }

    /// Parse the text of a pointer file. Returns `None` for anything that is
    /// not a well-formed v1 pointer.
    pub fn parse(content: &[u8]) -> Option<Self> {
        if content.len() as u64 > BLOB_SIZE_CUTOFF {
            return None;
        }
        let text = std::str::from_utf8(content).ok()?;
        let mut lines = text.lines();

        if lines.next()? != POINTER_VERSION_LINE {
            return None;
        }

        let mut oid = None;
        let mut size = None;
        for line in lines {
            let Some((key, value)) = line.split_once(' ') else {
                continue;
            };
            match key {
                "oid" => {
                    let hex = value.strip_prefix("sha256:")?;
                    oid = Some(Oid::from_hex(hex).ok()?);
                }
                "size" => size = Some(value.parse::<u64>().ok()?),
                _ => {}
            }
        }

        Some(Self::new(oid?, size?))
    }

    /// Canonical pointer file text.
    pub fn to_text(&self) -> String {
        format!(
            "{}\noid sha256:{}\nsize {}\n",
            POINTER_VERSION_LINE, self.oid, self.size
        )
    }

    pub fn relative_path(&self) -> String {
        self.oid.relative_path()
    }
}

impl std::fmt::Display for Pointer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.oid, self.size)
    }
}

/// A pointer found in the object graph, with the blob it was read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PointerBlob {
    pub pointer: Pointer,
    pub blob_id: String,
}

impl PointerBlob {
    pub fn new(pointer: Pointer, blob_id: impl Into<String>) -> Self {
        Self {
            pointer,
            blob_id: blob_id.into(),
        }
    }
}
