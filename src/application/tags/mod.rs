pub mod reconciler;

pub use reconciler::{TagReconciler, TagSyncReport, RELEASE_PAGE_SIZE};
