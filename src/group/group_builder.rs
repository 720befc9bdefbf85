use std::sync::Arc;

use crate::storage::ReadableWritableListableStorageTraits;

use super::{Group, GroupCreateError, GroupMetadata};

/// A [`Group`] builder.
///
/// The default group builder has no attributes.
///
/// Use the methods in the group builder to change the configuration away from the default, and then build the group at a path of some storage with [`GroupBuilder::build`] or create it in the store with [`GroupBuilder::create`].
/// Note that [`build`](GroupBuilder::build) does not modify the store; the group metadata has to be written with [`Group::store_metadata`].
#[derive(Debug, Default)]
pub struct GroupBuilder {
    metadata: GroupMetadata,
}

impl GroupBuilder {
    /// Create a new group builder for a group at `path`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the attributes.
    #[must_use]
    pub fn attributes(mut self, attributes: serde_json::Map<String, serde_json::Value>) -> Self {
        self.metadata.attributes = attributes;
        self
    }

    /// Set a single attribute.
    #[must_use]
    pub fn attribute(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.metadata
            .attributes
            .insert(key.to_string(), value.into());
        self
    }

    /// Build into a [`Group`].
    ///
    /// # Errors
    ///
    /// Returns [`GroupCreateError`] if the group could not be created.
    pub fn build<TStorage: ?Sized>(
        self,
        storage: Arc<TStorage>,
        path: &str,
    ) -> Result<Group<TStorage>, GroupCreateError> {
        Group::new_with_metadata(storage, path, self.metadata)
    }

    /// Create a [`Group`] in the store.
    ///
    /// # Errors
    ///
    /// Returns [`GroupCreateError`] if a node already exists at `path` or the metadata could not be stored.
    pub fn create<TStorage: ?Sized + ReadableWritableListableStorageTraits>(
        self,
        storage: Arc<TStorage>,
        path: &str,
    ) -> Result<Group<TStorage>, GroupCreateError> {
        Group::create(storage, path, self.metadata)
    }
}
