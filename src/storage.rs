//! Storage ([stores](store) and [storage adapters](storage_adapter)).
//!
//! A [store] is a key/value system holding the hierarchy of an ingestion run: node metadata and array fragments.
//! For example: a directory tree on a filesystem or an in-memory map.
//!
//! A [storage adapter](storage_adapter) wraps a store and has the same interface, e.g. to log every store call.
//!
//! This module defines the abstract store interfaces and functions for the node level store operations (create, erase, discover).
//!
//! ### Key layout
//! ```text
//! <node>/node.json                          node metadata (array or group)
//! <array>/__fragments/<seq>/__commit        fragment commit marker, written last
//! <array>/__fragments/<seq>/d/<dimension>   sparse fragment coordinates
//! <array>/__fragments/<seq>/a/<attribute>   sparse fragment values
//! <array>/__fragments/<seq>/a/<attribute>/c/<i>/<j>  dense fragment tiles
//! ```

pub mod storage_adapter;
mod storage_sync;
pub mod store;
mod store_key;
mod store_prefix;

use std::sync::Arc;

use thiserror::Error;

use crate::node::{NodeNameError, NodePath, NodePathError};

pub use store_key::{StoreKey, StoreKeyError, StoreKeys};
pub use store_prefix::{StorePrefix, StorePrefixError, StorePrefixes};

pub(crate) use self::storage_sync::retrieve_node_metadata;
pub use self::storage_sync::{
    create_array, create_group, discover_children, erase_node, get_child_nodes, node_exists,
    ListableStorageTraits, ReadableListableStorageTraits, ReadableStorageTraits,
    ReadableWritableListableStorageTraits, ReadableWritableStorageTraits, WritableStorageTraits,
};

/// Bytes held by a store value.
pub type Bytes = Vec<u8>;

/// An alias for bytes which may or may not be available.
///
/// When a value is read from a store, it returns `MaybeBytes` which is [`None`] if the key is not available.
pub type MaybeBytes = Option<Bytes>;

/// [`Arc`] wrapped readable storage.
pub type ReadableStorage = Arc<dyn ReadableStorageTraits>;

/// [`Arc`] wrapped writable storage.
pub type WritableStorage = Arc<dyn WritableStorageTraits>;

/// [`Arc`] wrapped listable storage.
pub type ListableStorage = Arc<dyn ListableStorageTraits>;

/// [`Arc`] wrapped readable, writable, and listable storage.
pub type ReadableWritableListableStorage = Arc<dyn ReadableWritableListableStorageTraits>;

/// The name of the node metadata key.
pub const NODE_METADATA_KEY: &str = "node.json";

/// The name of the prefix holding the fragments of an array.
pub const FRAGMENTS_PREFIX: &str = "__fragments";

/// The name of the key that marks a fragment as committed.
pub const FRAGMENT_COMMIT_KEY: &str = "__commit";

/// [`StoreKeys`] and [`StorePrefixes`].
#[derive(Clone, Eq, PartialEq, Hash, Debug, Default)]
pub struct StoreKeysPrefixes {
    keys: StoreKeys,
    prefixes: StorePrefixes,
}

impl StoreKeysPrefixes {
    /// Create a new [`StoreKeysPrefixes`].
    #[must_use]
    pub fn new(keys: StoreKeys, prefixes: StorePrefixes) -> Self {
        Self { keys, prefixes }
    }

    /// Returns the keys.
    #[must_use]
    pub const fn keys(&self) -> &StoreKeys {
        &self.keys
    }

    /// Returns the prefixes.
    #[must_use]
    pub const fn prefixes(&self) -> &StorePrefixes {
        &self.prefixes
    }
}

/// A storage error.
#[derive(Debug, Error)]
pub enum StorageError {
    /// A write operation was attempted on a read only store.
    #[error("a write operation was attempted on a read only store")]
    ReadOnly,
    /// An IO error.
    #[error(transparent)]
    IOError(#[from] std::io::Error),
    /// An error parsing the metadata for a key.
    #[error("error parsing metadata for {0}: {1}")]
    InvalidMetadata(StoreKey, String),
    /// An invalid store prefix.
    #[error("invalid store prefix {0}")]
    StorePrefixError(#[from] StorePrefixError),
    /// An invalid store key.
    #[error("invalid store key {0}")]
    InvalidStoreKey(#[from] StoreKeyError),
    /// An invalid node path.
    #[error("invalid node path {0}")]
    NodePathError(#[from] NodePathError),
    /// An invalid node name.
    #[error("invalid node name {0}")]
    NodeNameError(#[from] NodeNameError),
    /// Any other error.
    #[error("{0}")]
    Other(String),
}

impl From<&str> for StorageError {
    fn from(err: &str) -> Self {
        Self::Other(err.to_string())
    }
}

impl From<String> for StorageError {
    fn from(err: String) -> Self {
        Self::Other(err)
    }
}

/// Return the store prefix of a node.
#[must_use]
pub fn node_prefix(path: &NodePath) -> StorePrefix {
    let path = path.as_str();
    if path.eq("/") {
        StorePrefix::root()
    } else {
        let path = path.strip_prefix('/').unwrap_or(path);
        unsafe { StorePrefix::new_unchecked(format!("{path}/")) }
    }
}

/// Return the metadata key (`node.json`) given a node path.
#[must_use]
pub fn meta_key(path: &NodePath) -> StoreKey {
    unsafe {
        StoreKey::new_unchecked(format!("{}{NODE_METADATA_KEY}", node_prefix(path).as_str()))
    }
}

/// Return the prefix holding all fragments of the array at `path`.
#[must_use]
pub fn fragments_prefix(path: &NodePath) -> StorePrefix {
    unsafe {
        StorePrefix::new_unchecked(format!("{}{FRAGMENTS_PREFIX}/", node_prefix(path).as_str()))
    }
}

/// Return the prefix of fragment `sequence` of the array at `path`.
#[must_use]
pub fn fragment_prefix(path: &NodePath, sequence: u64) -> StorePrefix {
    unsafe {
        StorePrefix::new_unchecked(format!(
            "{}{sequence:010}/",
            fragments_prefix(path).as_str()
        ))
    }
}

/// Return the key of `name` within a fragment prefix.
///
/// # Errors
/// Returns [`StoreKeyError`] if `name` produces an invalid key.
pub fn fragment_key(fragment: &StorePrefix, name: &str) -> Result<StoreKey, StoreKeyError> {
    StoreKey::new(format!("{}{name}", fragment.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_for_nodes() {
        let root = NodePath::root();
        assert_eq!(meta_key(&root).as_str(), "node.json");
        let array: NodePath = "/gsf1234/stats".try_into().unwrap();
        assert_eq!(meta_key(&array).as_str(), "gsf1234/stats/node.json");
        assert_eq!(
            fragments_prefix(&array).as_str(),
            "gsf1234/stats/__fragments/"
        );
        assert_eq!(
            fragment_prefix(&array, 7).as_str(),
            "gsf1234/stats/__fragments/0000000007/"
        );
        assert_eq!(
            fragment_key(&fragment_prefix(&array, 7), "a/pvalue")
                .unwrap()
                .as_str(),
            "gsf1234/stats/__fragments/0000000007/a/pvalue"
        );
    }
}
