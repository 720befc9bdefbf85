//! Hierarchy nodes.
//!
//! A node in a hierarchy represents either an [`Array`](crate::array::Array) or a [`Group`](crate::group::Group).
//!
//! A [`Node`] has an associated [`NodePath`], [`NodeMetadata`], and children.
//!
//! The [`Node::hierarchy_tree`] function can be used to create a string representation of the hierarchy below a node,
//! e.g. the studies of an ingestion run and their arrays.

mod node_metadata;
mod node_name;
mod node_path;

pub use node_metadata::NodeMetadata;
pub use node_name::{NodeName, NodeNameError};
pub use node_path::{NodePath, NodePathError};
use itertools::Itertools;
use thiserror::Error;

use crate::storage::{
    get_child_nodes, retrieve_node_metadata, ListableStorageTraits, ReadableStorageTraits,
    StorageError,
};

/// A hierarchy node.
#[derive(Debug)]
pub struct Node {
    /// Node path.
    path: NodePath,
    /// Node metadata.
    metadata: NodeMetadata,
    /// Node children.
    ///
    /// Only group nodes can have children.
    children: Vec<Node>,
}

/// A node open error.
#[derive(Debug, Error)]
pub enum NodeCreateError {
    /// An invalid node path
    #[error(transparent)]
    NodePathError(#[from] NodePathError),
    /// A storage error.
    #[error(transparent)]
    StorageError(#[from] StorageError),
    /// There is no metadata at the node path.
    #[error("no node metadata at {0}")]
    MissingMetadata(NodePath),
}

impl Node {
    /// Create a new node at `path` with `metadata` and `children`.
    #[must_use]
    pub fn new(path: NodePath, metadata: NodeMetadata, children: Vec<Node>) -> Self {
        Self {
            path,
            metadata,
            children,
        }
    }

    /// Open the node at `path` and read its metadata and children from `storage`.
    ///
    /// # Errors
    ///
    /// Returns [`NodeCreateError`] if the node has no metadata, the metadata is invalid, or there is a failure to list child nodes.
    pub fn open<TStorage: ?Sized + ReadableStorageTraits + ListableStorageTraits>(
        storage: &TStorage,
        path: &str,
    ) -> Result<Self, NodeCreateError> {
        let path: NodePath = path.try_into()?;
        let metadata = retrieve_node_metadata(storage, &path)?
            .ok_or_else(|| NodeCreateError::MissingMetadata(path.clone()))?;
        let children = match metadata {
            NodeMetadata::Array(_) => Vec::default(),
            NodeMetadata::Group(_) => get_child_nodes(storage, &path)?,
        };
        Ok(Self {
            path,
            metadata,
            children,
        })
    }

    /// Indicates if a node is the root.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.path.is_root()
    }

    /// Returns the name of the node.
    #[must_use]
    pub fn name(&self) -> NodeName {
        let name = self.path.as_str().split('/').last().unwrap_or_default();
        unsafe { NodeName::new_unchecked(name) }
    }

    /// Returns a reference to the path of the node.
    #[must_use]
    pub const fn path(&self) -> &NodePath {
        &self.path
    }

    /// Returns a reference to the metadata of the node.
    #[must_use]
    pub const fn metadata(&self) -> &NodeMetadata {
        &self.metadata
    }

    /// Returns a reference to the children of the node.
    #[must_use]
    pub fn children(&self) -> &[Node] {
        &self.children
    }

    /// Return a tree representation of a hierarchy as a string.
    ///
    /// Arrays are annotated with their type, dimensions and attributes.
    /// For example:
    /// ```text
    /// /
    ///   gsfq0zk81md
    ///     contrasts sparse [contrast] formula:string_utf8
    ///     stats sparse [gene, contrast] pvalue:float64 fdr:float64 logFC:float64
    ///     tpm sparse [gene, sample] expr:float64
    ///     tpm_dense dense [gene, sample] expr:float64
    /// ```
    #[must_use]
    pub fn hierarchy_tree(&self) -> String {
        fn print_metadata(name: &str, string: &mut String, metadata: &NodeMetadata) {
            match metadata {
                NodeMetadata::Array(array_metadata) => {
                    let schema = &array_metadata.schema;
                    let s = format!(
                        "{} {} [{}] {}",
                        name,
                        schema.array_type(),
                        schema.dimensions().iter().map(|d| d.name()).join(", "),
                        schema
                            .attributes()
                            .iter()
                            .map(|a| format!("{}:{}", a.name(), a.attribute_type()))
                            .join(" ")
                    );
                    string.push_str(&s);
                }
                NodeMetadata::Group(_) => {
                    string.push_str(name);
                }
            };
            string.push('\n');
        }

        fn update_tree(string: &mut String, children: &[Node], depth: usize) {
            for child in children {
                let name = child.name();
                string.push_str(&" ".repeat(depth * 2));
                print_metadata(name.as_str(), string, &child.metadata);
                update_tree(string, &child.children, depth + 1);
            }
        }

        let mut string = String::default();
        let root_name = if self.is_root() {
            "/".to_string()
        } else {
            self.name().to_string()
        };
        print_metadata(&root_name, &mut string, &self.metadata);
        update_tree(&mut string, &self.children, 1);
        string
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_metadata_array() {
        const JSON_ARRAY: &str = r#"{
            "node_type": "array",
            "format": 1,
            "schema": {
                "array_type": "sparse",
                "dimensions": [
                    {"name": "gene", "type": "string_ascii", "tile_extent": 1000},
                    {"name": "contrast", "type": "string_ascii", "tile_extent": 3}
                ],
                "attributes": [
                    {"name": "pvalue", "type": "float64"},
                    {"name": "fdr", "type": "float64"},
                    {"name": "logFC", "type": "float64"}
                ],
                "cell_order": "col_major",
                "tile_order": "col_major"
            },
            "attributes": {
                "foo": 42
            }
        }"#;
        let metadata = serde_json::from_str::<NodeMetadata>(JSON_ARRAY).unwrap();
        assert!(matches!(metadata, NodeMetadata::Array(_)));
    }

    #[test]
    fn node_metadata_group() {
        const JSON_GROUP: &str = r#"{
        "node_type": "group",
        "attributes": {
            "spam": "ham",
            "eggs": 42
        }
    }"#;
        let metadata = serde_json::from_str::<NodeMetadata>(JSON_GROUP).unwrap();
        assert!(matches!(metadata, NodeMetadata::Group(_)));
    }

    #[test]
    fn node_metadata_invalid() {
        const JSON_INVALID: &str = r#"{
        "node_type": "dataset",
        "attributes": {}
    }"#;
        assert!(serde_json::from_str::<NodeMetadata>(JSON_INVALID).is_err());
    }
}
