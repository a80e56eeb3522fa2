//! # mirror_sync - Repository and large-file object synchronization
//!
//! Imports remote git repositories, keeps pull and push mirrors up to date
//! and moves large-file objects between remote endpoints and a local
//! content-addressed store.
//!
//! ## Architecture Layers
//!
//! - **Domain**: entities and value objects (pointers, mirror configs, tag records)
//! - **Application**: ports plus the import, transfer, tag and mirror use cases
//! - **Infrastructure**: git CLI, LFS HTTP client, content store and Postgres adapters
//!
//! ## Example Usage
//!
//! ```no_run
//! use mirror_sync::{application::builder::ApplicationBuilder, Config};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let services = ApplicationBuilder::new(Config::from_env())
//!     .with_database(true)
//!     .await?
//!     .with_infrastructure()
//!     .await?
//!     .build()?;
//! let cancel = tokio_util::sync::CancellationToken::new();
//! let report = services.scheduler.run_once(&cancel).await;
//! println!("{} pull mirrors synced", report.pull_synced);
//! # Ok(())
//! # }
//! ```

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use application::ports;
pub use config::Config;
pub use domain::errors as domain_errors;
pub use domain::{entities, value_objects};
