//! Groups.
//!
//! A group is a node in a hierarchy.
//! It has no schema, only optional user attributes, and may have child nodes (groups or [`arrays`](crate::array)).
//! An ingestion run is a root group holding one group per study.
//!
//! Use [`GroupBuilder`] to setup a new group, or use [`Group::open`] to read an existing group.
//!
//! Group metadata is stored in a `node.json` key beside the group's children. For example:
//! ```json
//! {
//!     "node_type": "group",
//!     "attributes": {
//!         "spam": "ham",
//!         "eggs": 42
//!     }
//! }
//! ```

mod group_builder;
mod group_metadata;

use std::sync::Arc;

use derive_more::Display;
use thiserror::Error;

use crate::{
    node::{Node, NodeMetadata, NodePath, NodePathError},
    storage::{
        create_group, discover_children, get_child_nodes, node_exists, retrieve_node_metadata,
        ListableStorageTraits, ReadableStorageTraits, ReadableWritableListableStorageTraits,
        StorageError, WritableStorageTraits,
    },
};

pub use self::{group_builder::GroupBuilder, group_metadata::GroupMetadata};

/// A group.
#[derive(Clone, Debug, Display)]
#[display("group at {path} with metadata {metadata}")]
pub struct Group<TStorage: ?Sized> {
    /// The storage.
    storage: Arc<TStorage>,
    /// The path of the group in the store.
    path: NodePath,
    /// The metadata.
    metadata: GroupMetadata,
}

impl<TStorage: ?Sized> Group<TStorage> {
    /// Create a group in `storage` at `path` with `metadata`.
    /// This does **not** write to the store, use [`store_metadata`](Group<WritableStorageTraits>::store_metadata) to write `metadata` to `storage`.
    ///
    /// # Errors
    ///
    /// Returns [`GroupCreateError`] if the path is invalid.
    pub fn new_with_metadata(
        storage: Arc<TStorage>,
        path: &str,
        metadata: GroupMetadata,
    ) -> Result<Self, GroupCreateError> {
        let path = NodePath::new(path)?;
        Ok(Self {
            storage,
            path,
            metadata,
        })
    }

    /// Get path.
    #[must_use]
    pub fn path(&self) -> &NodePath {
        &self.path
    }

    /// Get attributes.
    #[must_use]
    pub fn attributes(&self) -> &serde_json::Map<String, serde_json::Value> {
        &self.metadata.attributes
    }

    /// Mutably borrow the group attributes.
    #[must_use]
    pub fn attributes_mut(&mut self) -> &mut serde_json::Map<String, serde_json::Value> {
        &mut self.metadata.attributes
    }

    /// Get metadata.
    #[must_use]
    pub fn metadata(&self) -> &GroupMetadata {
        &self.metadata
    }

    /// Get the underlying storage.
    #[must_use]
    pub fn storage(&self) -> Arc<TStorage> {
        self.storage.clone()
    }
}

impl<TStorage: ?Sized + ReadableStorageTraits + ListableStorageTraits> Group<TStorage> {
    /// Open an existing group in `storage` at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`GroupCreateError`] if there is a storage error, no metadata at `path`, or the node at `path` is an array.
    pub fn open(storage: Arc<TStorage>, path: &str) -> Result<Self, GroupCreateError> {
        let node_path: NodePath = path.try_into()?;
        match retrieve_node_metadata(&*storage, &node_path)? {
            Some(NodeMetadata::Group(metadata)) => Ok(Self {
                storage,
                path: node_path,
                metadata,
            }),
            Some(NodeMetadata::Array(_)) => Err(GroupCreateError::NotAGroup(node_path)),
            None => Err(GroupCreateError::MissingMetadata(node_path)),
        }
    }

    /// Return the paths of the child nodes of the group.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if there is an underlying error with the store.
    pub fn child_paths(&self) -> Result<Vec<NodePath>, StorageError> {
        discover_children(&*self.storage, &self.path)?
            .iter()
            .map(|prefix| NodePath::try_from(prefix).map_err(StorageError::from))
            .collect()
    }

    /// Return the child nodes of the group, recursively.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if there is an underlying error with the store.
    pub fn children(&self) -> Result<Vec<Node>, StorageError> {
        get_child_nodes(&*self.storage, &self.path)
    }
}

impl<TStorage: ?Sized + WritableStorageTraits> Group<TStorage> {
    /// Store metadata.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if there is an underlying store error.
    pub fn store_metadata(&self) -> Result<(), StorageError> {
        create_group(&*self.storage, self.path(), &self.metadata)
    }
}

impl<TStorage: ?Sized + ReadableWritableListableStorageTraits> Group<TStorage> {
    /// Create a new group in `storage` at `path` and store its metadata.
    ///
    /// # Errors
    ///
    /// Returns [`GroupCreateError::AlreadyExists`] if a node already exists at `path`, or a storage error.
    pub fn create(
        storage: Arc<TStorage>,
        path: &str,
        metadata: GroupMetadata,
    ) -> Result<Self, GroupCreateError> {
        let group = Self::new_with_metadata(storage, path, metadata)?;
        if node_exists(&*group.storage, &group.path)? {
            return Err(GroupCreateError::AlreadyExists(group.path));
        }
        group.store_metadata()?;
        tracing::debug!(path = %group.path, "created group");
        Ok(group)
    }
}

/// A group creation error.
#[derive(Debug, Error)]
pub enum GroupCreateError {
    /// A node already exists at the path.
    #[error("a node already exists at {0}")]
    AlreadyExists(NodePath),
    /// The node at the path is not a group.
    #[error("the node at {0} is not a group")]
    NotAGroup(NodePath),
    /// There is no metadata at the path.
    #[error("no group metadata at {0}")]
    MissingMetadata(NodePath),
    /// Invalid node path.
    #[error(transparent)]
    NodePathError(#[from] NodePathError),
    /// Storage error.
    #[error(transparent)]
    StorageError(#[from] StorageError),
}

#[cfg(test)]
mod tests {
    use crate::storage::store::MemoryStore;

    use super::*;

    #[test]
    fn group_create_open() -> Result<(), Box<dyn std::error::Error>> {
        let store = Arc::new(MemoryStore::new());
        let mut attributes = serde_json::Map::new();
        attributes.insert("spam".to_string(), "ham".into());
        let group = GroupBuilder::new()
            .attributes(attributes.clone())
            .create(store.clone(), "/run")?;
        assert_eq!(group.path().as_str(), "/run");

        let group = Group::open(store.clone(), "/run")?;
        assert_eq!(group.attributes(), &attributes);
        assert!(group.child_paths()?.is_empty());
        Ok(())
    }

    #[test]
    fn group_create_existing() -> Result<(), Box<dyn std::error::Error>> {
        let store = Arc::new(MemoryStore::new());
        Group::create(store.clone(), "/", GroupMetadata::default())?;
        let err = Group::create(store.clone(), "/", GroupMetadata::default()).unwrap_err();
        assert!(matches!(err, GroupCreateError::AlreadyExists(_)));
        Ok(())
    }

    #[test]
    fn group_children() -> Result<(), Box<dyn std::error::Error>> {
        let store = Arc::new(MemoryStore::new());
        let root = Group::create(store.clone(), "/", GroupMetadata::default())?;
        Group::create(store.clone(), "/a", GroupMetadata::default())?;
        Group::create(store.clone(), "/b", GroupMetadata::default())?;
        Group::create(store.clone(), "/b/c", GroupMetadata::default())?;
        let paths = root.child_paths()?;
        assert_eq!(
            paths.iter().map(NodePath::as_str).collect::<Vec<_>>(),
            ["/a", "/b"]
        );
        let children = root.children()?;
        assert_eq!(children.len(), 2);
        assert_eq!(children[1].children().len(), 1);
        Ok(())
    }

    #[test]
    fn group_open_missing() {
        let store = Arc::new(MemoryStore::new());
        assert!(matches!(
            Group::open(store, "/missing").unwrap_err(),
            GroupCreateError::MissingMetadata(_)
        ));
    }
}
