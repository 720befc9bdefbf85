mod common;

use std::{num::NonZeroU64, sync::Arc};

use degstore::array::{
    Array, ArrayCreateError, ArrayError, ArraySchemaBuilder, ArrayType, Attribute, AttributeType,
    AttributeValue, DenseBlock, Dimension, InvalidSchemaError, Layout,
};
use degstore::storage::{
    store::{FilesystemStore, MemoryStore},
    ReadableWritableListableStorageTraits,
};

use common::init_tracing;

fn expression_array<TStorage: ?Sized + ReadableWritableListableStorageTraits>(
    store: Arc<TStorage>,
    genes: i32,
    samples: i32,
    gene_tile: u64,
    cell_order: Layout,
) -> Array<TStorage> {
    let mut builder = ArraySchemaBuilder::new(ArrayType::Dense);
    builder
        .dimension(Dimension::int32("gene", (1, genes), NonZeroU64::new(gene_tile)))
        .dimension(Dimension::int32("sample", (1, samples), None))
        .attribute(Attribute::new("expr", AttributeType::Float64))
        .cell_order(cell_order);
    builder.create(store, "/gsf0001/tpm_dense").unwrap()
}

#[test]
fn dense_write_read() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let store = Arc::new(MemoryStore::new());
    let array = expression_array(store, 3, 2, 3, Layout::RowMajor);
    let values = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
    array.store_dense(&DenseBlock::new(vec![3, 2]).with_attribute("expr", values.clone()))?;

    let block = array.retrieve_dense()?;
    assert_eq!(block.shape(), &[3, 2]);
    let read = block.attribute("expr").and_then(|v| v.as_f64()).unwrap();
    for (a, b) in std::iter::zip(read, &values) {
        assert!((a - b).abs() < 1e-9);
    }
    assert_eq!(block.get("expr", &[2, 0]), Some(AttributeValue::Float64(5.0)));
    Ok(())
}

#[test]
fn dense_edge_tiles() -> Result<(), Box<dyn std::error::Error>> {
    let store = Arc::new(MemoryStore::new());
    // 5 genes in tiles of 2 leaves a partial tile at the end of the domain
    let array = expression_array(store.clone(), 5, 3, 2, Layout::ColMajor);
    let values: Vec<f64> = (0..15).map(f64::from).collect();
    array.store_dense(&DenseBlock::new(vec![5, 3]).with_attribute("expr", values.clone()))?;

    let block = array.retrieve_dense()?;
    assert_eq!(block.attribute("expr").and_then(|v| v.as_f64()), Some(&values[..]));

    let reader = array.open_for_read()?;
    assert_eq!(reader.cell_count()?, 15);
    assert_eq!(
        reader.retrieve_dense_cell(&[5, 3])?,
        vec![AttributeValue::Float64(14.0)]
    );
    assert_eq!(
        reader.retrieve_dense_cell(&[2, 1])?,
        vec![AttributeValue::Float64(3.0)]
    );
    assert!(matches!(
        reader.retrieve_dense_cell(&[6, 1]),
        Err(ArrayError::OrphanCoordinate { .. })
    ));
    reader.close();
    Ok(())
}

#[test]
fn dense_unwritten_fill_values() -> Result<(), Box<dyn std::error::Error>> {
    let store = Arc::new(MemoryStore::new());
    let array = expression_array(store, 2, 2, 1, Layout::RowMajor);
    let block = array.retrieve_dense()?;
    assert_eq!(block.shape(), &[2, 2]);
    assert!(block
        .attribute("expr")
        .and_then(|v| v.as_f64())
        .unwrap()
        .iter()
        .all(|v| v.is_nan()));
    let reader = array.open_for_read()?;
    assert_eq!(reader.cell_count()?, 0);
    assert!(matches!(
        reader.retrieve_dense_cell(&[1, 1])?.as_slice(),
        [AttributeValue::Float64(v)] if v.is_nan()
    ));
    Ok(())
}

#[test]
fn dense_rewrite_replaces_domain() -> Result<(), Box<dyn std::error::Error>> {
    let store = Arc::new(MemoryStore::new());
    let array = expression_array(store, 2, 1, 1, Layout::RowMajor);
    array.store_dense(&DenseBlock::new(vec![2, 1]).with_attribute("expr", vec![1.0, 2.0]))?;
    array.store_dense(&DenseBlock::new(vec![2, 1]).with_attribute("expr", vec![3.0, 4.0]))?;
    assert_eq!(
        array.retrieve_dense()?.attribute("expr").and_then(|v| v.as_f64()),
        Some(&[3.0, 4.0][..])
    );
    Ok(())
}

#[test]
fn dense_invalid_blocks() {
    let store = Arc::new(MemoryStore::new());
    let array = expression_array(store, 3, 2, 2, Layout::RowMajor);

    let partial = DenseBlock::new(vec![2, 2]).with_attribute("expr", vec![0.0; 4]);
    assert!(matches!(
        array.store_dense(&partial),
        Err(ArrayError::ShapeMismatch { ref expected, .. }) if expected == &[3, 2]
    ));

    let wrong_type = DenseBlock::new(vec![3, 2]).with_attribute("expr", vec![0; 6]);
    assert!(matches!(
        array.store_dense(&wrong_type),
        Err(ArrayError::TypeMismatch { .. })
    ));

    let short = DenseBlock::new(vec![3, 2]).with_attribute("expr", vec![0.0; 5]);
    assert!(array.store_dense(&short).is_err());

    assert!(matches!(
        array.store_dense(&DenseBlock::new(vec![3, 2])),
        Err(ArrayError::MissingAttribute(_))
    ));
    assert!(matches!(
        array.retrieve_sparse(),
        Err(ArrayError::ArrayTypeMismatch { .. })
    ));
    assert_eq!(array.open_for_read().unwrap().fragment_count(), 0);
}

#[test]
fn dense_filesystem_store() -> Result<(), Box<dyn std::error::Error>> {
    let path = tempfile::TempDir::new()?;
    let store = Arc::new(FilesystemStore::new(path.path())?);
    let array = expression_array(store.clone(), 3, 2, 2, Layout::RowMajor);
    array.store_dense(
        &DenseBlock::new(vec![3, 2]).with_attribute("expr", vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]),
    )?;
    assert!(path
        .path()
        .join("gsf0001/tpm_dense/__fragments/0000000000/__commit")
        .is_file());

    let reopened = Array::open(store, "/gsf0001/tpm_dense")?;
    assert_eq!(
        reopened.open_for_read()?.retrieve_dense_cell(&[3, 1])?,
        vec![AttributeValue::Float64(5.0)]
    );
    Ok(())
}

#[test]
fn dense_domain_too_large() {
    let store = Arc::new(MemoryStore::new());
    let mut builder = ArraySchemaBuilder::new(ArrayType::Dense);
    builder
        .dimension(Dimension::int32("gene", (i32::MIN, i32::MAX), None))
        .dimension(Dimension::int32("sample", (i32::MIN, i32::MAX), None))
        .attribute(Attribute::new("expr", AttributeType::Float64));
    assert!(matches!(
        builder.create(store.clone(), "/tpm_dense"),
        Err(ArrayCreateError::InvalidSchema(InvalidSchemaError::DomainTooLarge(_)))
    ));
    assert!(store.is_empty());
}
