use std::sync::Arc;

use crate::storage::ReadableWritableListableStorageTraits;

use super::{
    Array, ArrayCreateError, ArraySchema, ArrayType, Attribute, Dimension, InvalidSchemaError,
    Layout,
};

/// An [`ArraySchema`] builder.
///
/// The array type is set on construction; the default cell and tile orders are [`Layout::RowMajor`].
/// Dimensions and attributes are added in order, and the array can carry optional user attributes.
///
/// [`ArraySchemaBuilder::schema`] validates and returns the schema, and [`ArraySchemaBuilder::create`] creates the array in a store.
///
/// ### Example
/// ```rust
/// # use std::{num::NonZeroU64, sync::Arc};
/// use degstore::array::{ArraySchemaBuilder, ArrayType, Attribute, AttributeType, Dimension, Layout};
/// # let store = Arc::new(degstore::storage::store::MemoryStore::new());
/// let array = ArraySchemaBuilder::new(ArrayType::Sparse)
///     .dimension(Dimension::string("gene", NonZeroU64::new(1000)))
///     .dimension(Dimension::string("contrast", NonZeroU64::new(3)))
///     .attribute(Attribute::new("pvalue", AttributeType::Float64))
///     .cell_order(Layout::ColMajor)
///     .tile_order(Layout::ColMajor)
///     .create(store, "/stats")?;
/// assert_eq!(array.schema().dimensions().len(), 2);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone)]
pub struct ArraySchemaBuilder {
    /// Array type.
    pub array_type: ArrayType,
    /// Dimensions.
    pub dimensions: Vec<Dimension>,
    /// Attributes.
    pub attributes: Vec<Attribute>,
    /// Cell order.
    pub cell_order: Layout,
    /// Tile order.
    pub tile_order: Layout,
    /// User attributes stored in the array metadata.
    pub user_attributes: serde_json::Map<String, serde_json::Value>,
}

impl ArraySchemaBuilder {
    /// Create a new array schema builder for an array of `array_type`.
    #[must_use]
    pub fn new(array_type: ArrayType) -> Self {
        Self {
            array_type,
            dimensions: Vec::new(),
            attributes: Vec::new(),
            cell_order: Layout::default(),
            tile_order: Layout::default(),
            user_attributes: serde_json::Map::default(),
        }
    }

    /// Create a new builder copying the configuration of an existing array.
    #[must_use]
    pub fn from_array<TStorage: ?Sized>(array: &Array<TStorage>) -> Self {
        let schema = array.schema();
        let mut builder = Self::new(schema.array_type());
        builder
            .dimensions(schema.dimensions().to_vec())
            .attributes(schema.attributes().to_vec())
            .cell_order(schema.cell_order())
            .tile_order(schema.tile_order())
            .user_attributes(array.attributes().clone());
        builder
    }

    /// Append a dimension.
    pub fn dimension(&mut self, dimension: Dimension) -> &mut Self {
        self.dimensions.push(dimension);
        self
    }

    /// Set the dimensions.
    pub fn dimensions(&mut self, dimensions: Vec<Dimension>) -> &mut Self {
        self.dimensions = dimensions;
        self
    }

    /// Append an attribute.
    pub fn attribute(&mut self, attribute: Attribute) -> &mut Self {
        self.attributes.push(attribute);
        self
    }

    /// Set the attributes.
    pub fn attributes(&mut self, attributes: Vec<Attribute>) -> &mut Self {
        self.attributes = attributes;
        self
    }

    /// Set the cell order.
    pub fn cell_order(&mut self, cell_order: Layout) -> &mut Self {
        self.cell_order = cell_order;
        self
    }

    /// Set the tile order.
    pub fn tile_order(&mut self, tile_order: Layout) -> &mut Self {
        self.tile_order = tile_order;
        self
    }

    /// Set the user attributes.
    pub fn user_attributes(
        &mut self,
        user_attributes: serde_json::Map<String, serde_json::Value>,
    ) -> &mut Self {
        self.user_attributes = user_attributes;
        self
    }

    /// Validate and return the schema.
    ///
    /// # Errors
    /// Returns [`InvalidSchemaError`] if the dimension/attribute definitions are inconsistent.
    pub fn schema(&self) -> Result<ArraySchema, InvalidSchemaError> {
        ArraySchema::new(
            self.array_type,
            self.dimensions.clone(),
            self.attributes.clone(),
            self.cell_order,
            self.tile_order,
        )
    }

    /// Create the array in `storage` at `path`.
    ///
    /// # Errors
    /// Returns [`ArrayCreateError`] if the schema is invalid, a node already exists at `path`, or there is a storage error.
    pub fn create<TStorage: ?Sized + ReadableWritableListableStorageTraits>(
        &self,
        storage: Arc<TStorage>,
        path: &str,
    ) -> Result<Array<TStorage>, ArrayCreateError> {
        Array::create_with_attributes(storage, path, self.schema()?, self.user_attributes.clone())
    }
}
