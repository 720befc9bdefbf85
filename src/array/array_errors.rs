use thiserror::Error;

use crate::{
    node::{NodePath, NodePathError},
    storage::{StorageError, StoreKeyError},
};

use super::{codec::CodecError, ArrayType, InvalidSchemaError};

/// An array creation error.
#[derive(Debug, Error)]
pub enum ArrayCreateError {
    /// A node already exists at the array path.
    #[error("a node already exists at {0}, erase it or choose another path")]
    SchemaAlreadyExists(NodePath),
    /// The dimension/attribute definitions are inconsistent.
    #[error(transparent)]
    InvalidSchema(#[from] InvalidSchemaError),
    /// Invalid node path.
    #[error(transparent)]
    NodePathError(#[from] NodePathError),
    /// Storage error.
    #[error(transparent)]
    StorageError(#[from] StorageError),
    /// There is no metadata at the array path.
    #[error("array metadata is missing at {0}")]
    MissingMetadata(NodePath),
    /// The node at the path is a group.
    #[error("the node at {0} is not an array")]
    NotAnArray(NodePath),
}

/// An array read/write error.
#[derive(Debug, Error)]
pub enum ArrayError {
    /// Storage error.
    #[error(transparent)]
    StorageError(#[from] StorageError),
    /// Codec error.
    #[error(transparent)]
    CodecError(#[from] CodecError),
    /// A block shape does not match the domain, or columns of a batch differ in length.
    #[error("expected shape {expected:?}, got {got:?}")]
    ShapeMismatch {
        /// The expected shape.
        expected: Vec<u64>,
        /// The supplied shape.
        got: Vec<u64>,
    },
    /// A batch holds more than one cell at a coordinate.
    #[error("duplicate coordinate {0} in write batch")]
    DuplicateCoordinate(String),
    /// A coordinate lies outside of the dimension domain.
    #[error("coordinate {coordinate} is outside the domain of dimension {dimension}")]
    OrphanCoordinate {
        /// The dimension name.
        dimension: String,
        /// The coordinate.
        coordinate: String,
    },
    /// A column has the wrong type.
    #[error("{name} has type {got}, expected {expected}")]
    TypeMismatch {
        /// The dimension or attribute name.
        name: String,
        /// The type in the schema.
        expected: String,
        /// The supplied type.
        got: String,
    },
    /// A dimension column is missing from a batch.
    #[error("missing coordinates for dimension {0}")]
    MissingDimension(String),
    /// A batch holds a dimension that is not in the schema.
    #[error("unknown dimension {0}")]
    UnknownDimension(String),
    /// An attribute column is missing from a batch.
    #[error("missing values for attribute {0}")]
    MissingAttribute(String),
    /// A batch holds an attribute that is not in the schema.
    #[error("unknown attribute {0}")]
    UnknownAttribute(String),
    /// The operation does not apply to the array type.
    #[error("operation requires a {expected} array, the array is {got}")]
    ArrayTypeMismatch {
        /// The array type the operation requires.
        expected: ArrayType,
        /// The array type.
        got: ArrayType,
    },
    /// The array schema does not describe an addressable domain.
    #[error(transparent)]
    InvalidSchema(#[from] InvalidSchemaError),
    /// Stored fragment data is inconsistent.
    #[error("invalid fragment {0}")]
    InvalidFragment(String),
}

impl From<StoreKeyError> for ArrayError {
    fn from(err: StoreKeyError) -> Self {
        Self::StorageError(err.into())
    }
}
