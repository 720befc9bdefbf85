mod common;

use std::{num::NonZeroU64, sync::Arc};

use degstore::array::{
    Array, ArrayError, ArraySchemaBuilder, ArrayType, Attribute, AttributeType, AttributeValue,
    AttributeValues, Coordinate, CoordinateValues, Dimension, Layout, SparseCells,
};
use degstore::storage::{store::MemoryStore, ListableStorageTraits, ReadableWritableListableStorageTraits};

use common::{init_tracing, FailingStore};

fn stats_array<TStorage: ?Sized + ReadableWritableListableStorageTraits>(
    store: Arc<TStorage>,
) -> Array<TStorage> {
    let mut builder = ArraySchemaBuilder::new(ArrayType::Sparse);
    builder
        .dimension(Dimension::string("gene", NonZeroU64::new(1000)))
        .dimension(Dimension::string("contrast", NonZeroU64::new(3)))
        .attribute(Attribute::new("pvalue", AttributeType::Float64))
        .attribute(Attribute::new("fdr", AttributeType::Float64))
        .attribute(Attribute::new("logFC", AttributeType::Float64))
        .cell_order(Layout::ColMajor)
        .tile_order(Layout::ColMajor);
    builder.create(store, "/gsf0001/stats").unwrap()
}

fn stats_batch(genes: Vec<&str>, contrast: &str, pvalues: Vec<f64>) -> SparseCells {
    let n = genes.len();
    SparseCells::new()
        .with_dimension("gene", genes)
        .with_dimension("contrast", vec![contrast; n])
        .with_attribute("pvalue", pvalues.clone())
        .with_attribute("fdr", pvalues)
        .with_attribute("logFC", vec![0.0; n])
}

#[test]
fn sparse_write_read_cell_order() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let store = Arc::new(MemoryStore::new());
    let array = stats_array(store);
    array.store_sparse(&stats_batch(vec!["g2", "g1"], "c2", vec![0.2, 0.1]))?;
    array.store_sparse(&stats_batch(vec!["g2", "g1"], "c1", vec![0.4, 0.3]))?;

    let cells = array.retrieve_sparse()?;
    assert_eq!(cells.len(), 4);
    // column-major: contrast varies slowest
    assert_eq!(
        cells.dimension("gene"),
        Some(&CoordinateValues::from(vec!["g1", "g2", "g1", "g2"]))
    );
    assert_eq!(
        cells.dimension("contrast"),
        Some(&CoordinateValues::from(vec!["c1", "c1", "c2", "c2"]))
    );
    assert_eq!(
        cells.attribute("pvalue"),
        Some(&AttributeValues::Float64(vec![0.3, 0.4, 0.1, 0.2]))
    );
    Ok(())
}

#[test]
fn sparse_last_write_wins() -> Result<(), Box<dyn std::error::Error>> {
    let store = Arc::new(MemoryStore::new());
    let array = stats_array(store);
    array.store_sparse(&stats_batch(vec!["g1", "g2"], "c1", vec![0.1, 0.2]))?;
    array.store_sparse(&stats_batch(vec!["g2"], "c1", vec![0.9]))?;

    let cells = array.retrieve_sparse()?;
    assert_eq!(cells.len(), 2);
    assert_eq!(
        cells.value_at(&["g2".into(), "c1".into()], "pvalue"),
        Some(AttributeValue::Float64(0.9))
    );
    let reader = array.open_for_read()?;
    assert_eq!(reader.fragment_count(), 2);
    assert_eq!(
        reader.retrieve_cell(&["g1".into(), "c1".into()])?,
        Some(vec![
            AttributeValue::Float64(0.1),
            AttributeValue::Float64(0.1),
            AttributeValue::Float64(0.0)
        ])
    );
    assert_eq!(reader.retrieve_cell(&["g3".into(), "c1".into()])?, None);
    assert!(matches!(
        reader.retrieve_cell(&["g1".into()]),
        Err(ArrayError::ShapeMismatch { .. })
    ));
    Ok(())
}

#[test]
fn sparse_duplicate_coordinate() -> Result<(), Box<dyn std::error::Error>> {
    let store = Arc::new(MemoryStore::new());
    let array = stats_array(store.clone());
    let keys_before = store.list()?;
    let err = array
        .store_sparse(&stats_batch(vec!["g1", "g2", "g1"], "c1", vec![0.1, 0.2, 0.3]))
        .unwrap_err();
    assert!(matches!(err, ArrayError::DuplicateCoordinate(ref cell) if cell == "(g1, c1)"));
    assert_eq!(store.list()?, keys_before);
    assert!(array.retrieve_sparse()?.is_empty());
    Ok(())
}

#[test]
fn sparse_invalid_batches() {
    let store = Arc::new(MemoryStore::new());
    let array = stats_array(store.clone());

    let short = stats_batch(vec!["g1", "g2"], "c1", vec![0.1, 0.2])
        .with_attribute("logFC", vec![1.0]);
    assert!(matches!(
        array.store_sparse(&short),
        Err(ArrayError::ShapeMismatch { .. })
    ));

    let wrong_type = stats_batch(vec!["g1"], "c1", vec![0.1])
        .with_attribute("pvalue", AttributeValues::Int32(vec![1]));
    assert!(matches!(
        array.store_sparse(&wrong_type),
        Err(ArrayError::TypeMismatch { ref name, .. }) if name == "pvalue"
    ));

    let missing = SparseCells::new()
        .with_dimension("gene", vec!["g1"])
        .with_dimension("contrast", vec!["c1"])
        .with_attribute("pvalue", vec![0.1]);
    assert!(matches!(
        array.store_sparse(&missing),
        Err(ArrayError::MissingAttribute(ref name)) if name == "fdr"
    ));

    let unknown = stats_batch(vec!["g1"], "c1", vec![0.1]).with_attribute("q", vec![0.1]);
    assert!(matches!(
        array.store_sparse(&unknown),
        Err(ArrayError::UnknownAttribute(_))
    ));

    let non_ascii = stats_batch(vec!["gène"], "c1", vec![0.1]);
    assert!(matches!(
        array.store_sparse(&non_ascii),
        Err(ArrayError::CodecError(_))
    ));

    assert!(array.retrieve_sparse().unwrap().is_empty());
    assert!(matches!(
        array.retrieve_dense(),
        Err(ArrayError::ArrayTypeMismatch { .. })
    ));
}

#[test]
fn sparse_orphan_coordinate() -> Result<(), Box<dyn std::error::Error>> {
    let store = Arc::new(MemoryStore::new());
    let mut builder = ArraySchemaBuilder::new(ArrayType::Sparse);
    builder
        .dimension(Dimension::int32("position", (1, 10), None))
        .attribute(Attribute::new("label", AttributeType::StringUtf8));
    let array = builder.create(store, "/labels")?;

    let cells = SparseCells::new()
        .with_dimension("position", vec![1, 11])
        .with_attribute("label", vec!["a", "b"]);
    assert!(matches!(
        array.store_sparse(&cells),
        Err(ArrayError::OrphanCoordinate { ref dimension, ref coordinate })
            if dimension == "position" && coordinate == "11"
    ));

    let cells = SparseCells::new()
        .with_dimension("position", vec![10, 1])
        .with_attribute("label", vec!["ten", "one"]);
    array.store_sparse(&cells)?;
    let read = array.retrieve_sparse()?;
    assert_eq!(read.coordinates(0), Some(vec![Coordinate::Int32(1)]));
    assert_eq!(
        read.attribute("label"),
        Some(&AttributeValues::from(vec!["one", "ten"]))
    );
    Ok(())
}

#[test]
fn sparse_write_failure_is_atomic() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    // metadata plus one full fragment (5 columns and a commit marker)
    let store = FailingStore::new(1 + 6);
    let array = stats_array(store.clone());
    array.store_sparse(&stats_batch(vec!["g1"], "c1", vec![0.1]))?;
    let keys_before = store.list()?;

    store.allow_sets(3);
    let err = array
        .store_sparse(&stats_batch(vec!["g2", "g3"], "c1", vec![0.2, 0.3]))
        .unwrap_err();
    assert!(matches!(err, ArrayError::StorageError(_)));
    assert_eq!(store.list()?, keys_before);

    let cells = array.retrieve_sparse()?;
    assert_eq!(cells.len(), 1);
    assert_eq!(
        cells.value_at(&["g1".into(), "c1".into()], "pvalue"),
        Some(AttributeValue::Float64(0.1))
    );
    Ok(())
}
