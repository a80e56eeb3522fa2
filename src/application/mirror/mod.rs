pub mod batch_processor;
pub mod config;
pub mod fault;
pub mod pull_sync;
pub mod push_sync;
pub mod results;
pub mod scheduler;

pub use batch_processor::{BatchConfig, BatchItemResult, BatchProcessor};
pub use config::{MirrorSyncConfig, SchedulerConfig};
pub use fault::{run_guarded, strip_exit_status};
pub use pull_sync::PullMirrorSyncer;
pub use push_sync::PushMirrorSyncer;
pub use results::{SyncPassReport, SyncStatistics};
pub use scheduler::{MirrorScheduler, SyncTarget};
