pub mod import_source;
pub mod models;
pub mod options;
pub mod orchestrator;

pub use import_source::{ImportSource, ImportSourceError, NullImportSource, Page};
pub use options::MigrateOptions;
pub use orchestrator::{MigrationConfig, MigrationOrchestrator, MigrationReport, IMPORT_PAGE_SIZE};
