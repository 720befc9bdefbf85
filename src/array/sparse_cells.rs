use super::{AttributeValue, AttributeValues, Coordinate, CoordinateValues};

/// A batch of sparse cells in column form.
///
/// Each dimension has one coordinate column and each attribute one value column.
/// Row `i` of every column describes cell `i`, so all columns of a valid batch have equal length.
///
/// ### Example
/// ```rust
/// # use degstore::array::{SparseCells, Coordinate};
/// let cells = SparseCells::new()
///     .with_dimension("gene", vec!["g1", "g2"])
///     .with_dimension("contrast", vec!["c1", "c1"])
///     .with_attribute("logFC", vec![2.0, -1.0]);
/// assert_eq!(cells.len(), 2);
/// assert_eq!(
///     cells.coordinates(1),
///     Some(vec![Coordinate::from("g2"), Coordinate::from("c1")])
/// );
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SparseCells {
    dimensions: Vec<(String, CoordinateValues)>,
    attributes: Vec<(String, AttributeValues)>,
}

impl SparseCells {
    /// Create an empty batch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the coordinate column of dimension `name`.
    #[must_use]
    pub fn with_dimension(
        mut self,
        name: impl Into<String>,
        values: impl Into<CoordinateValues>,
    ) -> Self {
        insert(&mut self.dimensions, name.into(), values.into());
        self
    }

    /// Set the value column of attribute `name`.
    #[must_use]
    pub fn with_attribute(
        mut self,
        name: impl Into<String>,
        values: impl Into<AttributeValues>,
    ) -> Self {
        insert(&mut self.attributes, name.into(), values.into());
        self
    }

    /// The coordinate columns in insertion order.
    #[must_use]
    pub fn dimensions(&self) -> &[(String, CoordinateValues)] {
        &self.dimensions
    }

    /// The value columns in insertion order.
    #[must_use]
    pub fn attributes(&self) -> &[(String, AttributeValues)] {
        &self.attributes
    }

    /// The coordinate column of dimension `name`.
    #[must_use]
    pub fn dimension(&self, name: &str) -> Option<&CoordinateValues> {
        self.dimensions
            .iter()
            .find_map(|(n, values)| (n == name).then_some(values))
    }

    /// The value column of attribute `name`.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&AttributeValues> {
        self.attributes
            .iter()
            .find_map(|(n, values)| (n == name).then_some(values))
    }

    /// The number of cells, taken from the first column.
    #[must_use]
    pub fn len(&self) -> usize {
        self.dimensions
            .first()
            .map(|(_, values)| values.len())
            .or_else(|| self.attributes.first().map(|(_, values)| values.len()))
            .unwrap_or_default()
    }

    /// Returns true if the batch holds no cells.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The coordinates of cell `index`, in dimension column order.
    #[must_use]
    pub fn coordinates(&self, index: usize) -> Option<Vec<Coordinate>> {
        self.dimensions
            .iter()
            .map(|(_, values)| values.get(index))
            .collect()
    }

    /// The attribute values of cell `index`, in attribute column order.
    #[must_use]
    pub fn values(&self, index: usize) -> Option<Vec<AttributeValue>> {
        self.attributes
            .iter()
            .map(|(_, values)| values.get(index))
            .collect()
    }

    /// Find the index of the cell at `coordinates`.
    #[must_use]
    pub fn position(&self, coordinates: &[Coordinate]) -> Option<usize> {
        (0..self.len()).find(|&index| {
            self.dimensions
                .iter()
                .zip(coordinates)
                .all(|((_, values), coordinate)| values.get(index).as_ref() == Some(coordinate))
        })
    }

    /// The value of attribute `name` of the cell at `coordinates`.
    #[must_use]
    pub fn value_at(&self, coordinates: &[Coordinate], name: &str) -> Option<AttributeValue> {
        let index = self.position(coordinates)?;
        self.attribute(name)?.get(index)
    }
}

fn insert<T>(columns: &mut Vec<(String, T)>, name: String, values: T) {
    if let Some(column) = columns.iter_mut().find(|(n, _)| *n == name) {
        column.1 = values;
    } else {
        columns.push((name, values));
    }
}
