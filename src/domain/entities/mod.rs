mod lfs_meta_object;
mod mirror;
mod push_mirror;
mod release;
mod repository;

pub use lfs_meta_object::LfsMetaObject;
pub use mirror::MirrorConfig;
pub use push_mirror::PushMirrorConfig;
pub use release::ReleaseTagRecord;
pub use repository::{Owner, Repository};
