pub mod endpoint;
pub mod pipeline;

pub use endpoint::determine_endpoint;
pub use pipeline::{ObjectTransferPipeline, TransferConfig, TransferReport};
