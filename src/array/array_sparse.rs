use std::collections::{BTreeMap, HashSet};

use itertools::Itertools;

use crate::storage::{ReadableStorageTraits, ReadableWritableListableStorageTraits};

use super::{
    codec::{decode_attribute, decode_coordinates, encode_attribute, encode_coordinates},
    fragment::{next_sequence, Fragment, FragmentCommit, FragmentWriter},
    Array, ArrayError, ArrayType, AttributeValue, AttributeValues, Coordinate, CoordinateValues,
    Layout, SparseCells,
};

/// The decoded columns of one sparse fragment, in schema order.
struct SparseFragmentColumns {
    coordinates: Vec<CoordinateValues>,
    values: Vec<AttributeValues>,
    len: usize,
}

impl SparseFragmentColumns {
    fn coordinates(&self, index: usize) -> Option<Vec<Coordinate>> {
        self.coordinates.iter().map(|c| c.get(index)).collect()
    }

    fn values(&self, index: usize) -> Option<Vec<AttributeValue>> {
        self.values.iter().map(|v| v.get(index)).collect()
    }
}

pub(super) fn format_coordinates(coordinates: &[Coordinate]) -> String {
    format!("({})", coordinates.iter().join(", "))
}

/// Validate a sparse batch against the schema and write it as one fragment.
pub(super) fn write_sparse<TStorage: ?Sized + ReadableWritableListableStorageTraits>(
    array: &Array<TStorage>,
    cells: &SparseCells,
) -> Result<(), ArrayError> {
    array.require_array_type(ArrayType::Sparse)?;
    let schema = array.schema();

    if let Some((name, _)) = cells
        .dimensions()
        .iter()
        .find(|(name, _)| schema.dimension(name).is_none())
    {
        return Err(ArrayError::UnknownDimension(name.clone()));
    }
    if let Some((name, _)) = cells
        .attributes()
        .iter()
        .find(|(name, _)| schema.attribute(name).is_none())
    {
        return Err(ArrayError::UnknownAttribute(name.clone()));
    }

    let mut coordinates = Vec::with_capacity(schema.dimensions().len());
    for dimension in schema.dimensions() {
        let column = cells
            .dimension(dimension.name())
            .ok_or_else(|| ArrayError::MissingDimension(dimension.name().to_string()))?;
        if column.dimension_type() != dimension.dimension_type() {
            return Err(ArrayError::TypeMismatch {
                name: dimension.name().to_string(),
                expected: dimension.dimension_type().to_string(),
                got: column.dimension_type().to_string(),
            });
        }
        coordinates.push((dimension, column));
    }
    let mut values = Vec::with_capacity(schema.attributes().len());
    for attribute in schema.attributes() {
        let column = cells
            .attribute(attribute.name())
            .ok_or_else(|| ArrayError::MissingAttribute(attribute.name().to_string()))?;
        if column.attribute_type() != attribute.attribute_type() {
            return Err(ArrayError::TypeMismatch {
                name: attribute.name().to_string(),
                expected: attribute.attribute_type().to_string(),
                got: column.attribute_type().to_string(),
            });
        }
        values.push((attribute, column));
    }

    let len = coordinates.first().map_or(0, |(_, column)| column.len());
    let lengths = coordinates
        .iter()
        .map(|(_, column)| column.len())
        .chain(values.iter().map(|(_, column)| column.len()));
    for column_len in lengths {
        if column_len != len {
            return Err(ArrayError::ShapeMismatch {
                expected: vec![len as u64],
                got: vec![column_len as u64],
            });
        }
    }

    for (dimension, column) in &coordinates {
        if let CoordinateValues::Int32(column) = column {
            if let Some(coordinate) = column.iter().find(|c| !dimension.contains(**c)) {
                return Err(ArrayError::OrphanCoordinate {
                    dimension: dimension.name().to_string(),
                    coordinate: coordinate.to_string(),
                });
            }
        }
    }

    let mut seen = HashSet::with_capacity(len);
    for index in 0..len {
        let cell: Vec<Coordinate> = coordinates
            .iter()
            .filter_map(|(_, column)| column.get(index))
            .collect();
        if seen.contains(&cell) {
            return Err(ArrayError::DuplicateCoordinate(format_coordinates(&cell)));
        }
        seen.insert(cell);
    }

    if len == 0 {
        tracing::debug!(array = %array.path(), "empty sparse write");
        return Ok(());
    }

    let mut encoded = Vec::with_capacity(coordinates.len() + values.len());
    for (dimension, column) in &coordinates {
        encoded.push((format!("d/{}", dimension.name()), encode_coordinates(column)?));
    }
    for (attribute, column) in &values {
        encoded.push((format!("a/{}", attribute.name()), encode_attribute(column)));
    }

    let sequence = next_sequence(&*array.storage, array.path())?;
    let mut writer = FragmentWriter::new(&*array.storage, array.path(), sequence);
    for (name, bytes) in &encoded {
        writer.set(name, bytes)?;
    }
    writer.commit(&FragmentCommit {
        array_type: ArrayType::Sparse,
        cells: len as u64,
    })?;
    tracing::debug!(array = %array.path(), cells = len, sequence, "wrote sparse cells");
    Ok(())
}

fn decode_fragment<TStorage: ?Sized + ReadableStorageTraits>(
    array: &Array<TStorage>,
    fragment: &Fragment,
) -> Result<SparseFragmentColumns, ArrayError> {
    if fragment.commit.array_type != ArrayType::Sparse {
        return Err(ArrayError::InvalidFragment(format!(
            "{} is not a sparse fragment",
            fragment.prefix
        )));
    }
    let len = usize::try_from(fragment.commit.cells)
        .map_err(|_| ArrayError::InvalidFragment(fragment.prefix.to_string()))?;
    let get = |name: String| -> Result<Vec<u8>, ArrayError> {
        let key = fragment.key(&name)?;
        array
            .storage
            .get(&key)?
            .ok_or_else(|| ArrayError::InvalidFragment(format!("{key} is missing")))
    };

    let schema = array.schema();
    let coordinates = schema
        .dimensions()
        .iter()
        .map(|dimension| -> Result<CoordinateValues, ArrayError> {
            Ok(decode_coordinates(
                &get(format!("d/{}", dimension.name()))?,
                dimension.dimension_type(),
            )?)
        })
        .collect::<Result<Vec<_>, ArrayError>>()?;
    let values = schema
        .attributes()
        .iter()
        .map(|attribute| -> Result<AttributeValues, ArrayError> {
            Ok(decode_attribute(
                &get(format!("a/{}", attribute.name()))?,
                attribute.attribute_type(),
            )?)
        })
        .collect::<Result<Vec<_>, ArrayError>>()?;

    let lengths = coordinates
        .iter()
        .map(CoordinateValues::len)
        .chain(values.iter().map(AttributeValues::len));
    for column_len in lengths {
        if column_len != len {
            return Err(ArrayError::InvalidFragment(format!(
                "{} holds {column_len} values, expected {len}",
                fragment.prefix
            )));
        }
    }
    Ok(SparseFragmentColumns {
        coordinates,
        values,
        len,
    })
}

/// Merge the committed sparse fragments, later fragments overwriting earlier ones.
///
/// Cells are returned sorted by the schema cell order.
pub(super) fn read_sparse<TStorage: ?Sized + ReadableStorageTraits>(
    array: &Array<TStorage>,
    fragments: &[Fragment],
) -> Result<SparseCells, ArrayError> {
    array.require_array_type(ArrayType::Sparse)?;
    let schema = array.schema();
    let order = schema.cell_order();
    let to_cell_order = |mut coordinates: Vec<Coordinate>| {
        if order == Layout::ColMajor {
            coordinates.reverse();
        }
        coordinates
    };

    let mut merged: BTreeMap<Vec<Coordinate>, Vec<AttributeValue>> = BTreeMap::new();
    for fragment in fragments {
        let columns = decode_fragment(array, fragment)?;
        for index in 0..columns.len {
            let (Some(coordinates), Some(values)) =
                (columns.coordinates(index), columns.values(index))
            else {
                return Err(ArrayError::InvalidFragment(fragment.prefix.to_string()));
            };
            merged.insert(to_cell_order(coordinates), values);
        }
    }

    let mut coordinate_columns: Vec<CoordinateValues> = schema
        .dimensions()
        .iter()
        .map(|d| CoordinateValues::empty(d.dimension_type()))
        .collect();
    let mut value_columns: Vec<AttributeValues> = schema
        .attributes()
        .iter()
        .map(|a| AttributeValues::empty(a.attribute_type()))
        .collect();
    for (coordinates, values) in merged {
        for (column, coordinate) in
            std::iter::zip(coordinate_columns.iter_mut(), to_cell_order(coordinates))
        {
            column.push(coordinate);
        }
        for (column, value) in std::iter::zip(value_columns.iter_mut(), values) {
            column.push(value);
        }
    }

    let mut cells = SparseCells::new();
    for (dimension, column) in std::iter::zip(schema.dimensions(), coordinate_columns) {
        cells = cells.with_dimension(dimension.name(), column);
    }
    for (attribute, column) in std::iter::zip(schema.attributes(), value_columns) {
        cells = cells.with_attribute(attribute.name(), column);
    }
    Ok(cells)
}

/// Check the arity and types of a cell address.
pub(super) fn check_coordinates<TStorage: ?Sized>(
    array: &Array<TStorage>,
    coordinates: &[Coordinate],
) -> Result<(), ArrayError> {
    let dimensions = array.schema().dimensions();
    if coordinates.len() != dimensions.len() {
        return Err(ArrayError::ShapeMismatch {
            expected: vec![dimensions.len() as u64],
            got: vec![coordinates.len() as u64],
        });
    }
    for (dimension, coordinate) in std::iter::zip(dimensions, coordinates) {
        if coordinate.dimension_type() != dimension.dimension_type() {
            return Err(ArrayError::TypeMismatch {
                name: dimension.name().to_string(),
                expected: dimension.dimension_type().to_string(),
                got: coordinate.dimension_type().to_string(),
            });
        }
        if let Coordinate::Int32(position) = coordinate {
            if !dimension.contains(*position) {
                return Err(ArrayError::OrphanCoordinate {
                    dimension: dimension.name().to_string(),
                    coordinate: coordinate.to_string(),
                });
            }
        }
    }
    Ok(())
}

/// Find the most recent values of the cell at `coordinates`.
pub(super) fn retrieve_sparse_cell<TStorage: ?Sized + ReadableStorageTraits>(
    array: &Array<TStorage>,
    fragments: &[Fragment],
    coordinates: &[Coordinate],
) -> Result<Option<Vec<AttributeValue>>, ArrayError> {
    array.require_array_type(ArrayType::Sparse)?;
    check_coordinates(array, coordinates)?;
    for fragment in fragments.iter().rev() {
        let columns = decode_fragment(array, fragment)?;
        let position = (0..columns.len).find(|&index| {
            columns
                .coordinates
                .iter()
                .zip(coordinates)
                .all(|(column, coordinate)| column.get(index).as_ref() == Some(coordinate))
        });
        if let Some(index) = position {
            return Ok(columns.values(index));
        }
    }
    Ok(None)
}
