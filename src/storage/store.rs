//! Stores.
//!
//! - [`MemoryStore`]: an in-memory store, useful for tests and transient runs.
//! - [`FilesystemStore`]: a directory tree, one file per key.

mod filesystem_store;
mod memory_store;

pub use filesystem_store::{FilesystemStore, FilesystemStoreCreateError};
pub use memory_store::MemoryStore;
