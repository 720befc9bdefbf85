use parking_lot::MutexGuard;

use crate::storage::{
    ListableStorageTraits, ReadableStorageTraits, ReadableWritableListableStorageTraits,
};

use super::{
    array_dense::{read_dense, retrieve_dense_cell, write_dense},
    array_sparse::{read_sparse, retrieve_sparse_cell, write_sparse},
    fragment::{committed_fragments, Fragment},
    Array, ArrayError, ArrayType, AttributeValue, Coordinate, DenseBlock, SparseCells,
};

/// The write handle of an [`Array`].
///
/// Only one writer per array is open at a time, further calls to [`Array::open_for_write`] block until it is closed or dropped.
pub struct ArrayWriter<'a, TStorage: ?Sized> {
    array: &'a Array<TStorage>,
    _lock: MutexGuard<'a, ()>,
}

impl<'a, TStorage: ?Sized + ReadableWritableListableStorageTraits> ArrayWriter<'a, TStorage> {
    pub(super) fn new(array: &'a Array<TStorage>, lock: MutexGuard<'a, ()>) -> Self {
        tracing::trace!(array = %array.path(), "opened array for write");
        Self { array, _lock: lock }
    }

    /// The array being written.
    #[must_use]
    pub fn array(&self) -> &Array<TStorage> {
        self.array
    }

    /// Write a batch of cells to a sparse array.
    ///
    /// The batch is validated in full before anything is stored, then lands in a single fragment.
    /// An empty batch is a no-op.
    ///
    /// # Errors
    /// Returns an [`ArrayError`] if
    ///  - the array is not sparse,
    ///  - a column is missing, unknown, or has the wrong type,
    ///  - the columns differ in length,
    ///  - an integer coordinate lies outside of its domain,
    ///  - a coordinate appears more than once in the batch, or
    ///  - there is an underlying store error.
    pub fn write_sparse(&mut self, cells: &SparseCells) -> Result<(), ArrayError> {
        write_sparse(self.array, cells)
    }

    /// Write the full domain of a dense array.
    ///
    /// # Errors
    /// Returns an [`ArrayError`] if the array is not dense, the block shape is not the domain shape, an attribute is missing, unknown, or has the wrong type, or there is an underlying store error.
    pub fn write_dense(&mut self, block: &DenseBlock) -> Result<(), ArrayError> {
        write_dense(self.array, block)
    }

    /// Close the handle.
    pub fn close(self) {
        tracing::trace!(array = %self.array.path(), "closed array for write");
    }
}

/// The read handle of an [`Array`].
///
/// A reader sees the fragments committed when it was opened.
pub struct ArrayReader<'a, TStorage: ?Sized> {
    array: &'a Array<TStorage>,
    fragments: Vec<Fragment>,
}

impl<'a, TStorage: ?Sized + ReadableStorageTraits + ListableStorageTraits>
    ArrayReader<'a, TStorage>
{
    pub(super) fn new(array: &'a Array<TStorage>) -> Result<Self, ArrayError> {
        let fragments = committed_fragments(&*array.storage, array.path())?;
        tracing::trace!(
            array = %array.path(),
            fragments = fragments.len(),
            "opened array for read"
        );
        Ok(Self { array, fragments })
    }
}

impl<TStorage: ?Sized + ReadableStorageTraits> ArrayReader<'_, TStorage> {
    /// The array being read.
    #[must_use]
    pub fn array(&self) -> &Array<TStorage> {
        self.array
    }

    /// The number of committed fragments in the snapshot.
    #[must_use]
    pub fn fragment_count(&self) -> usize {
        self.fragments.len()
    }

    /// Read all cells of a sparse array.
    ///
    /// Cells are returned in the cell order of the array.
    /// A coordinate written by several fragments holds the values of the most recent.
    ///
    /// # Errors
    /// Returns an [`ArrayError`] if the array is not sparse, or a fragment cannot be read.
    pub fn read_sparse(&self) -> Result<SparseCells, ArrayError> {
        read_sparse(self.array, &self.fragments)
    }

    /// Read the values of the cell at `coordinates` in a sparse array.
    ///
    /// Returns [`None`] if the cell was never written.
    ///
    /// # Errors
    /// Returns an [`ArrayError`] if the array is not sparse, `coordinates` does not address a cell, or a fragment cannot be read.
    pub fn retrieve_cell(
        &self,
        coordinates: &[Coordinate],
    ) -> Result<Option<Vec<AttributeValue>>, ArrayError> {
        retrieve_sparse_cell(self.array, &self.fragments, coordinates)
    }

    /// Read the full domain of a dense array.
    ///
    /// An array that was never written reads as the attribute fill values.
    ///
    /// # Errors
    /// Returns an [`ArrayError`] if the array is not dense, or a fragment cannot be read.
    pub fn read_dense(&self) -> Result<DenseBlock, ArrayError> {
        read_dense(self.array, &self.fragments)
    }

    /// Read the values of the cell at the positional `coordinates` in a dense array.
    ///
    /// # Errors
    /// Returns an [`ArrayError`] if the array is not dense, `coordinates` lies outside of the domain, or a fragment cannot be read.
    pub fn retrieve_dense_cell(
        &self,
        coordinates: &[i32],
    ) -> Result<Vec<AttributeValue>, ArrayError> {
        retrieve_dense_cell(self.array, &self.fragments, coordinates)
    }

    /// The number of cells holding written values.
    ///
    /// For a dense array this is the size of the domain once written.
    ///
    /// # Errors
    /// Returns an [`ArrayError`] if a fragment cannot be read.
    pub fn cell_count(&self) -> Result<u64, ArrayError> {
        match self.array.array_type() {
            ArrayType::Sparse => Ok(self.read_sparse()?.len() as u64),
            ArrayType::Dense => Ok(self
                .fragments
                .iter()
                .rev()
                .find(|fragment| fragment.commit.array_type == ArrayType::Dense)
                .map_or(0, |fragment| fragment.commit.cells)),
        }
    }

    /// Close the handle.
    pub fn close(self) {
        tracing::trace!(array = %self.array.path(), "closed array for read");
    }
}

#[cfg(test)]
mod tests {
    use std::{num::NonZeroU64, sync::Arc};

    use super::*;
    use crate::{
        array::{ArraySchemaBuilder, Attribute, AttributeType, Dimension, Layout},
        storage::store::MemoryStore,
    };

    fn stats(store: Arc<MemoryStore>) -> Array<MemoryStore> {
        let mut builder = ArraySchemaBuilder::new(ArrayType::Sparse);
        builder
            .dimension(Dimension::string("gene", NonZeroU64::new(1000)))
            .dimension(Dimension::string("contrast", NonZeroU64::new(3)))
            .attribute(Attribute::new("pvalue", AttributeType::Float64))
            .cell_order(Layout::ColMajor)
            .tile_order(Layout::ColMajor);
        builder.create(store, "/stats").unwrap()
    }

    #[test]
    fn reader_snapshot() -> Result<(), Box<dyn std::error::Error>> {
        let store = Arc::new(MemoryStore::new());
        let array = stats(store);
        let batch = |gene: &str, pvalue: f64| {
            SparseCells::new()
                .with_dimension("gene", vec![gene])
                .with_dimension("contrast", vec!["c1"])
                .with_attribute("pvalue", vec![pvalue])
        };

        let mut writer = array.open_for_write();
        writer.write_sparse(&batch("g1", 0.1))?;
        writer.close();

        let reader = array.open_for_read()?;
        array.store_sparse(&batch("g2", 0.2))?;
        assert_eq!(reader.fragment_count(), 1);
        assert_eq!(reader.cell_count()?, 1);
        assert_eq!(
            reader.retrieve_cell(&["g2".into(), "c1".into()])?,
            None
        );
        reader.close();

        let reader = array.open_for_read()?;
        assert_eq!(reader.cell_count()?, 2);
        assert_eq!(
            reader.retrieve_cell(&["g2".into(), "c1".into()])?,
            Some(vec![AttributeValue::Float64(0.2)])
        );
        Ok(())
    }

    #[test]
    fn writer_empty_batch() -> Result<(), Box<dyn std::error::Error>> {
        let store = Arc::new(MemoryStore::new());
        let array = stats(store);
        let empty = SparseCells::new()
            .with_dimension("gene", Vec::<&str>::new())
            .with_dimension("contrast", Vec::<&str>::new())
            .with_attribute("pvalue", Vec::<f64>::new());
        array.store_sparse(&empty)?;
        assert_eq!(array.open_for_read()?.fragment_count(), 0);
        Ok(())
    }
}
