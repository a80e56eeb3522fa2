mod ids;
mod mirror_interval;
mod oid;
mod pointer;

pub use ids::{PushMirrorId, ReleaseId, RepoId, UserId};
pub use mirror_interval::{parse_duration, MirrorInterval};
pub use oid::Oid;
pub use pointer::{Pointer, PointerBlob, BLOB_SIZE_CUTOFF, POINTER_VERSION_LINE};
