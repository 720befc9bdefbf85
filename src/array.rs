//! Arrays.
//!
//! An array is a node in a hierarchy holding multidimensional cell data described by an [`ArraySchema`]:
//! named [dimensions](Dimension) addressing the cells and named [attributes](Attribute) holding their values.
//!
//! A [sparse](ArrayType::Sparse) array stores only written cells as explicit (coordinate, value) pairs.
//! A [dense](ArrayType::Dense) array stores every cell of its bounded domain in rectangular tiles.
//!
//! Use [`ArraySchemaBuilder`] or [`Array::create`] to setup a new array, or use [`Array::open`] for an existing array.
//!
//! ### Writes
//! Writes go through an [`ArrayWriter`] from [`Array::open_for_write`].
//! Each write is a batch which lands in its own fragment and becomes visible all at once, or not at all.
//!  - [`ArrayWriter::write_sparse`] appends a batch of [`SparseCells`]. Coordinates repeated across batches resolve to the most recent batch.
//!  - [`ArrayWriter::write_dense`] replaces the full domain with a [`DenseBlock`].
//!
//! ### Reads
//! Reads go through an [`ArrayReader`] from [`Array::open_for_read`], a snapshot of the fragments committed when it was opened.
//!
//! [`Array::store_sparse`], [`Array::store_dense`], [`Array::retrieve_sparse`], and [`Array::retrieve_dense`] open and close a handle around a single operation.

mod array_dense;
mod array_errors;
mod array_handles;
mod array_metadata;
mod array_schema;
mod array_schema_builder;
mod array_sparse;
mod attribute;
pub mod codec;
mod dense_block;
mod dimension;
mod fragment;
mod sparse_cells;
mod values;

use std::sync::Arc;

use parking_lot::Mutex;

pub use self::{
    array_errors::{ArrayCreateError, ArrayError},
    array_handles::{ArrayReader, ArrayWriter},
    array_metadata::ArrayMetadata,
    array_schema::{ArraySchema, ArrayType, InvalidSchemaError, Layout},
    array_schema_builder::ArraySchemaBuilder,
    attribute::{Attribute, AttributeType},
    dense_block::DenseBlock,
    dimension::{Dimension, DimensionType},
    sparse_cells::SparseCells,
    values::{AttributeValue, AttributeValues, Coordinate, CoordinateValues},
};

use crate::{
    node::{NodeMetadata, NodePath},
    storage::{
        create_array, node_exists, retrieve_node_metadata, ListableStorageTraits,
        ReadableStorageTraits, ReadableWritableListableStorageTraits, StorageError,
        WritableStorageTraits,
    },
};

/// An array.
///
/// An array holds its storage, its path, and its [`ArrayMetadata`].
/// It serialises writes through its handles: at most one [`ArrayWriter`] exists per array at a time.
pub struct Array<TStorage: ?Sized> {
    /// The storage.
    storage: Arc<TStorage>,
    /// The path of the array in a store.
    path: NodePath,
    /// The array metadata.
    metadata: ArrayMetadata,
    /// Held by the open writer.
    write_lock: Mutex<()>,
}

impl<TStorage: ?Sized> core::fmt::Debug for Array<TStorage> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Array")
            .field("path", &self.path)
            .field("metadata", &self.metadata)
            .finish_non_exhaustive()
    }
}

impl<TStorage: ?Sized> Array<TStorage> {
    /// Create an array in `storage` at `path` with `metadata`.
    /// This does **not** write to the store, use [`store_metadata`](Array<WritableStorageTraits>::store_metadata) to write `metadata` to `storage`.
    ///
    /// # Errors
    /// Returns [`ArrayCreateError`] if the path or the schema is invalid.
    pub fn new_with_metadata(
        storage: Arc<TStorage>,
        path: &str,
        metadata: ArrayMetadata,
    ) -> Result<Self, ArrayCreateError> {
        let path = NodePath::new(path)?;
        metadata.schema.validate()?;
        Ok(Self {
            storage,
            path,
            metadata,
            write_lock: Mutex::new(()),
        })
    }

    /// Get the node path.
    #[must_use]
    pub const fn path(&self) -> &NodePath {
        &self.path
    }

    /// Get the array schema.
    #[must_use]
    pub const fn schema(&self) -> &ArraySchema {
        &self.metadata.schema
    }

    /// Get the array type.
    #[must_use]
    pub const fn array_type(&self) -> ArrayType {
        self.metadata.schema.array_type()
    }

    /// Get the user attributes.
    #[must_use]
    pub const fn attributes(&self) -> &serde_json::Map<String, serde_json::Value> {
        &self.metadata.attributes
    }

    /// Get the array metadata.
    #[must_use]
    pub const fn metadata(&self) -> &ArrayMetadata {
        &self.metadata
    }

    /// Get the underlying storage.
    #[must_use]
    pub fn storage(&self) -> Arc<TStorage> {
        self.storage.clone()
    }

    fn require_array_type(&self, expected: ArrayType) -> Result<(), ArrayError> {
        let got = self.array_type();
        if got == expected {
            Ok(())
        } else {
            Err(ArrayError::ArrayTypeMismatch { expected, got })
        }
    }
}

impl<TStorage: ?Sized + ReadableStorageTraits + ListableStorageTraits> Array<TStorage> {
    /// Open an existing array in `storage` at `path`.
    ///
    /// # Errors
    /// Returns [`ArrayCreateError`] if there is a storage error, the metadata is missing, or the node is not an array.
    pub fn open(storage: Arc<TStorage>, path: &str) -> Result<Self, ArrayCreateError> {
        let node_path: NodePath = path.try_into()?;
        match retrieve_node_metadata(&*storage, &node_path)? {
            Some(NodeMetadata::Array(metadata)) => Self::new_with_metadata(storage, path, metadata),
            Some(NodeMetadata::Group(_)) => Err(ArrayCreateError::NotAnArray(node_path)),
            None => Err(ArrayCreateError::MissingMetadata(node_path)),
        }
    }

    /// Open a read handle on a snapshot of the committed data.
    ///
    /// # Errors
    /// Returns an [`ArrayError`] if the fragments cannot be listed.
    pub fn open_for_read(&self) -> Result<ArrayReader<'_, TStorage>, ArrayError> {
        ArrayReader::new(self)
    }

    /// Read all cells of a sparse array.
    ///
    /// # Errors
    /// See [`ArrayReader::read_sparse`].
    pub fn retrieve_sparse(&self) -> Result<SparseCells, ArrayError> {
        self.open_for_read()?.read_sparse()
    }

    /// Read the full domain of a dense array.
    ///
    /// # Errors
    /// See [`ArrayReader::read_dense`].
    pub fn retrieve_dense(&self) -> Result<DenseBlock, ArrayError> {
        self.open_for_read()?.read_dense()
    }
}

impl<TStorage: ?Sized + WritableStorageTraits> Array<TStorage> {
    /// Store metadata.
    ///
    /// # Errors
    /// Returns [`StorageError`] if there is an underlying store error.
    pub fn store_metadata(&self) -> Result<(), StorageError> {
        create_array(&*self.storage, &self.path, &self.metadata)
    }
}

impl<TStorage: ?Sized + ReadableWritableListableStorageTraits> Array<TStorage> {
    /// Create a new array in `storage` at `path` with `schema` and store its metadata.
    ///
    /// # Errors
    /// Returns [`ArrayCreateError`] if
    ///  - a node already exists at `path` ([`ArrayCreateError::SchemaAlreadyExists`]),
    ///  - the schema is invalid ([`ArrayCreateError::InvalidSchema`]), or
    ///  - there is an underlying store error.
    pub fn create(
        storage: Arc<TStorage>,
        path: &str,
        schema: ArraySchema,
    ) -> Result<Self, ArrayCreateError> {
        Self::create_with_attributes(storage, path, schema, serde_json::Map::default())
    }

    /// Create a new array with user `attributes`.
    ///
    /// # Errors
    /// See [`Array::create`].
    pub fn create_with_attributes(
        storage: Arc<TStorage>,
        path: &str,
        schema: ArraySchema,
        attributes: serde_json::Map<String, serde_json::Value>,
    ) -> Result<Self, ArrayCreateError> {
        let array = Self::new_with_metadata(storage, path, ArrayMetadata::new(schema, attributes))?;
        if node_exists(&*array.storage, &array.path)? {
            return Err(ArrayCreateError::SchemaAlreadyExists(array.path));
        }
        array.store_metadata()?;
        tracing::debug!(
            path = %array.path,
            array_type = %array.array_type(),
            "created array"
        );
        Ok(array)
    }

    /// Open the write handle of the array, blocking until no other write handle is open.
    #[must_use]
    pub fn open_for_write(&self) -> ArrayWriter<'_, TStorage> {
        ArrayWriter::new(self, self.write_lock.lock())
    }

    /// Write a batch of cells to a sparse array.
    ///
    /// # Errors
    /// See [`ArrayWriter::write_sparse`].
    pub fn store_sparse(&self, cells: &SparseCells) -> Result<(), ArrayError> {
        self.open_for_write().write_sparse(cells)
    }

    /// Write the full domain of a dense array.
    ///
    /// # Errors
    /// See [`ArrayWriter::write_dense`].
    pub fn store_dense(&self, block: &DenseBlock) -> Result<(), ArrayError> {
        self.open_for_write().write_dense(block)
    }
}

/// Unravel a linearised index to ND indices.
#[must_use]
pub fn unravel_index(mut index: u64, shape: &[u64]) -> Vec<u64> {
    let mut indices = vec![0; shape.len()];
    for (indices_i, &dim) in std::iter::zip(indices.iter_mut().rev(), shape.iter().rev()) {
        *indices_i = index % dim;
        index /= dim;
    }
    indices
}

/// Ravel ND indices to a linearised index.
#[must_use]
pub fn ravel_indices(indices: &[u64], shape: &[u64]) -> u64 {
    let mut index: u64 = 0;
    let mut count = 1;
    for (i, s) in std::iter::zip(indices, shape).rev() {
        index += i * count;
        count *= s;
    }
    index
}

/// Ravel ND indices to a linearised index in `order`.
#[must_use]
pub fn ravel_indices_in_order(indices: &[u64], shape: &[u64], order: Layout) -> u64 {
    match order {
        Layout::RowMajor => ravel_indices(indices, shape),
        Layout::ColMajor => {
            let indices: Vec<u64> = indices.iter().rev().copied().collect();
            let shape: Vec<u64> = shape.iter().rev().copied().collect();
            ravel_indices(&indices, &shape)
        }
    }
}

/// Unravel a linearised index in `order` to ND indices.
#[must_use]
pub fn unravel_index_in_order(index: u64, shape: &[u64], order: Layout) -> Vec<u64> {
    match order {
        Layout::RowMajor => unravel_index(index, shape),
        Layout::ColMajor => {
            let shape: Vec<u64> = shape.iter().rev().copied().collect();
            let mut indices = unravel_index(index, &shape);
            indices.reverse();
            indices
        }
    }
}
