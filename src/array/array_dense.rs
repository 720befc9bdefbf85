use itertools::Itertools;
use rayon::prelude::*;

use crate::storage::{ReadableStorageTraits, ReadableWritableListableStorageTraits};

use super::{
    codec::{decode_attribute, encode_attribute},
    fragment::{next_sequence, Fragment, FragmentCommit, FragmentWriter},
    ravel_indices, ravel_indices_in_order, unravel_index_in_order, Array, ArrayError, ArraySchema,
    ArrayType, AttributeValue, AttributeValues, Coordinate, DenseBlock, InvalidSchemaError, Layout,
};

/// The regular tiling of a bounded domain.
///
/// Edge tiles are bounded by the domain, so they can be smaller than the tile shape.
struct TileGrid {
    num_cells: u64,
    domain_shape: Vec<u64>,
    tile_shape: Vec<u64>,
    grid_shape: Vec<u64>,
}

impl TileGrid {
    fn new(schema: &ArraySchema) -> Result<Self, ArrayError> {
        let (Some(domain_shape), Some(tile_shape)) = (schema.domain_shape(), schema.tile_shape())
        else {
            return Err(ArrayError::ArrayTypeMismatch {
                expected: ArrayType::Dense,
                got: schema.array_type(),
            });
        };
        let num_cells = schema
            .num_cells()
            .filter(|num_cells| usize::try_from(*num_cells).is_ok())
            .ok_or_else(|| InvalidSchemaError::DomainTooLarge(domain_shape.clone()))?;
        let grid_shape = std::iter::zip(&domain_shape, &tile_shape)
            .map(|(d, t)| d.div_ceil(*t))
            .collect();
        Ok(Self {
            num_cells,
            domain_shape,
            tile_shape,
            grid_shape,
        })
    }

    fn num_cells(&self) -> u64 {
        self.num_cells
    }

    /// All tile indices, in `order`.
    fn tiles(&self, order: Layout) -> impl Iterator<Item = Vec<u64>> + '_ {
        let num_tiles: u64 = self.grid_shape.iter().product();
        (0..num_tiles).map(move |index| unravel_index_in_order(index, &self.grid_shape, order))
    }

    /// The start and shape of the tile at `tile`.
    fn tile_region(&self, tile: &[u64]) -> (Vec<u64>, Vec<u64>) {
        let start: Vec<u64> = std::iter::zip(tile, &self.tile_shape)
            .map(|(i, t)| i * t)
            .collect();
        let shape = itertools::izip!(&start, &self.tile_shape, &self.domain_shape)
            .map(|(s, t, d)| (*t).min(d - s))
            .collect();
        (start, shape)
    }

    /// The flat row-major domain index of every cell of the tile at `tile`, in cell `order`.
    fn tile_cells(&self, tile: &[u64], order: Layout) -> Vec<usize> {
        let (start, shape) = self.tile_region(tile);
        let num_cells: u64 = shape.iter().product();
        (0..num_cells)
            .map(|local| {
                let indices: Vec<u64> = std::iter::zip(
                    &start,
                    unravel_index_in_order(local, &shape, order),
                )
                .map(|(s, l)| s + l)
                .collect();
                ravel_indices(&indices, &self.domain_shape) as usize
            })
            .collect()
    }

    fn tile_key(attribute: &str, tile: &[u64]) -> String {
        format!("a/{attribute}/c/{}", tile.iter().join("/"))
    }
}

fn gather(values: &AttributeValues, indices: &[usize]) -> AttributeValues {
    match values {
        AttributeValues::Float64(values) => {
            AttributeValues::Float64(indices.iter().map(|&i| values[i]).collect())
        }
        AttributeValues::Int32(values) => {
            AttributeValues::Int32(indices.iter().map(|&i| values[i]).collect())
        }
        AttributeValues::String(values) => {
            AttributeValues::String(indices.iter().map(|&i| values[i].clone()).collect())
        }
    }
}

fn scatter(values: &mut AttributeValues, indices: &[usize], tile: AttributeValues) -> bool {
    match (values, tile) {
        (AttributeValues::Float64(values), AttributeValues::Float64(tile)) => {
            std::iter::zip(indices, tile).for_each(|(&i, v)| values[i] = v);
        }
        (AttributeValues::Int32(values), AttributeValues::Int32(tile)) => {
            std::iter::zip(indices, tile).for_each(|(&i, v)| values[i] = v);
        }
        (AttributeValues::String(values), AttributeValues::String(tile)) => {
            std::iter::zip(indices, tile).for_each(|(&i, v)| values[i] = v);
        }
        _ => return false,
    }
    true
}

/// Validate a dense block against the domain and write it as one fragment.
pub(super) fn write_dense<TStorage: ?Sized + ReadableWritableListableStorageTraits>(
    array: &Array<TStorage>,
    block: &DenseBlock,
) -> Result<(), ArrayError> {
    array.require_array_type(ArrayType::Dense)?;
    let schema = array.schema();
    let grid = TileGrid::new(schema)?;

    if block.shape() != grid.domain_shape.as_slice() {
        return Err(ArrayError::ShapeMismatch {
            expected: grid.domain_shape.clone(),
            got: block.shape().to_vec(),
        });
    }
    if let Some((name, _)) = block
        .attributes()
        .iter()
        .find(|(name, _)| schema.attribute(name).is_none())
    {
        return Err(ArrayError::UnknownAttribute(name.clone()));
    }
    let mut values = Vec::with_capacity(schema.attributes().len());
    for attribute in schema.attributes() {
        let column = block
            .attribute(attribute.name())
            .ok_or_else(|| ArrayError::MissingAttribute(attribute.name().to_string()))?;
        if column.attribute_type() != attribute.attribute_type() {
            return Err(ArrayError::TypeMismatch {
                name: attribute.name().to_string(),
                expected: attribute.attribute_type().to_string(),
                got: column.attribute_type().to_string(),
            });
        }
        if column.len() as u64 != grid.num_cells() {
            return Err(ArrayError::ShapeMismatch {
                expected: grid.domain_shape.clone(),
                got: vec![column.len() as u64],
            });
        }
        values.push((attribute, column));
    }

    let tiles: Vec<Vec<u64>> = grid.tiles(schema.tile_order()).collect();
    let encoded: Vec<Vec<(String, Vec<u8>)>> = tiles
        .par_iter()
        .map(|tile| {
            let cells = grid.tile_cells(tile, schema.cell_order());
            values
                .iter()
                .map(|(attribute, column)| {
                    (
                        TileGrid::tile_key(attribute.name(), tile),
                        encode_attribute(&gather(column, &cells)),
                    )
                })
                .collect()
        })
        .collect();

    let sequence = next_sequence(&*array.storage, array.path())?;
    let mut writer = FragmentWriter::new(&*array.storage, array.path(), sequence);
    for (name, bytes) in encoded.iter().flatten() {
        writer.set(name, bytes)?;
    }
    writer.commit(&FragmentCommit {
        array_type: ArrayType::Dense,
        cells: grid.num_cells(),
    })?;
    tracing::debug!(
        array = %array.path(),
        cells = grid.num_cells(),
        tiles = tiles.len(),
        sequence,
        "wrote dense block"
    );
    Ok(())
}

fn latest_dense(fragments: &[Fragment]) -> Option<&Fragment> {
    fragments
        .iter()
        .rev()
        .find(|fragment| fragment.commit.array_type == ArrayType::Dense)
}

fn read_tile<TStorage: ?Sized + ReadableStorageTraits>(
    array: &Array<TStorage>,
    fragment: &Fragment,
    attribute: &super::Attribute,
    tile: &[u64],
    expected_len: usize,
) -> Result<AttributeValues, ArrayError> {
    let key = fragment.key(&TileGrid::tile_key(attribute.name(), tile))?;
    let bytes = array
        .storage
        .get(&key)?
        .ok_or_else(|| ArrayError::InvalidFragment(format!("{key} is missing")))?;
    let values = decode_attribute(&bytes, attribute.attribute_type())?;
    if values.len() == expected_len {
        Ok(values)
    } else {
        Err(ArrayError::InvalidFragment(format!(
            "{key} holds {} values, expected {expected_len}",
            values.len()
        )))
    }
}

/// Read the full domain from the most recent dense fragment.
///
/// Cells of an array that was never written hold the attribute fill values.
pub(super) fn read_dense<TStorage: ?Sized + ReadableStorageTraits>(
    array: &Array<TStorage>,
    fragments: &[Fragment],
) -> Result<DenseBlock, ArrayError> {
    array.require_array_type(ArrayType::Dense)?;
    let schema = array.schema();
    let grid = TileGrid::new(schema)?;
    let num_cells = usize::try_from(grid.num_cells())
        .map_err(|_| InvalidSchemaError::DomainTooLarge(grid.domain_shape.clone()))?;
    let latest = latest_dense(fragments);

    let mut block = DenseBlock::new(grid.domain_shape.clone());
    for attribute in schema.attributes() {
        let mut values = AttributeValues::filled(attribute.attribute_type(), num_cells);
        if let Some(fragment) = latest {
            for tile in grid.tiles(schema.tile_order()) {
                let cells = grid.tile_cells(&tile, schema.cell_order());
                let tile_values = read_tile(array, fragment, attribute, &tile, cells.len())?;
                if !scatter(&mut values, &cells, tile_values) {
                    return Err(ArrayError::InvalidFragment(fragment.prefix.to_string()));
                }
            }
        }
        block = block.with_attribute(attribute.name(), values);
    }
    Ok(block)
}

/// Read the values of the single cell at the positional `coordinates`.
pub(super) fn retrieve_dense_cell<TStorage: ?Sized + ReadableStorageTraits>(
    array: &Array<TStorage>,
    fragments: &[Fragment],
    coordinates: &[i32],
) -> Result<Vec<AttributeValue>, ArrayError> {
    array.require_array_type(ArrayType::Dense)?;
    let address: Vec<Coordinate> = coordinates.iter().copied().map(Coordinate::Int32).collect();
    super::array_sparse::check_coordinates(array, &address)?;
    let schema = array.schema();
    let grid = TileGrid::new(schema)?;

    let Some(fragment) = latest_dense(fragments) else {
        return Ok(schema
            .attributes()
            .iter()
            .map(super::Attribute::fill_value)
            .collect());
    };

    let positions: Vec<u64> = std::iter::zip(schema.dimensions(), coordinates)
        .map(|(dimension, &coordinate)| {
            let lo = dimension.domain().map_or(0, |(lo, _)| lo);
            (i64::from(coordinate) - i64::from(lo)) as u64
        })
        .collect();
    let tile: Vec<u64> = std::iter::zip(&positions, &grid.tile_shape)
        .map(|(p, t)| p / t)
        .collect();
    let local: Vec<u64> = std::iter::zip(&positions, &grid.tile_shape)
        .map(|(p, t)| p % t)
        .collect();
    let (_, tile_shape) = grid.tile_region(&tile);
    let tile_len: u64 = tile_shape.iter().product();
    let offset = ravel_indices_in_order(&local, &tile_shape, schema.cell_order()) as usize;

    schema
        .attributes()
        .iter()
        .map(|attribute| {
            let values = read_tile(array, fragment, attribute, &tile, tile_len as usize)?;
            values
                .get(offset)
                .ok_or_else(|| ArrayError::InvalidFragment(fragment.prefix.to_string()))
        })
        .collect()
}
