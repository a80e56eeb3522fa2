use std::path::{Path, PathBuf};

use crate::domain::value_objects::Pointer;

/// Lays out the content store on disk
pub struct PathBuilder {
    root: PathBuf,
}

impl PathBuilder {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Temp upload path: /root/tmp/{uuid}
    pub fn temp_path(&self, id: uuid::Uuid) -> PathBuf {
        self.root.join("tmp").join(id.to_string())
    }

    /// Final object path: /root/{ab}/{cd}/{rest of oid}
    pub fn object_path(&self, pointer: &Pointer) -> PathBuf {
        self.root.join(pointer.relative_path())
    }
}
