mod content_hasher;
mod local_content_store;
mod path_builder;

pub use content_hasher::ContentHasher;
pub use local_content_store::LocalContentStore;
pub use path_builder::PathBuilder;
