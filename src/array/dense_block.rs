use super::{ravel_indices, AttributeValue, AttributeValues};

/// A dense block of cells covering a rectangular region.
///
/// Each attribute holds one value per cell of the block, in row-major (C) order.
/// A block written to a dense array must cover the full domain of the array.
#[derive(Clone, Debug, PartialEq)]
pub struct DenseBlock {
    shape: Vec<u64>,
    attributes: Vec<(String, AttributeValues)>,
}

impl DenseBlock {
    /// Create a block of `shape` with no attributes.
    #[must_use]
    pub fn new(shape: Vec<u64>) -> Self {
        Self {
            shape,
            attributes: Vec::new(),
        }
    }

    /// Set the values of attribute `name` in row-major order.
    #[must_use]
    pub fn with_attribute(
        mut self,
        name: impl Into<String>,
        values: impl Into<AttributeValues>,
    ) -> Self {
        let name = name.into();
        let values = values.into();
        if let Some(column) = self.attributes.iter_mut().find(|(n, _)| *n == name) {
            column.1 = values;
        } else {
            self.attributes.push((name, values));
        }
        self
    }

    /// The shape of the block.
    #[must_use]
    pub fn shape(&self) -> &[u64] {
        &self.shape
    }

    /// The number of cells in the block.
    #[must_use]
    pub fn num_cells(&self) -> u64 {
        self.shape.iter().product()
    }

    /// The attribute columns.
    #[must_use]
    pub fn attributes(&self) -> &[(String, AttributeValues)] {
        &self.attributes
    }

    /// The values of attribute `name`.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&AttributeValues> {
        self.attributes
            .iter()
            .find_map(|(n, values)| (n == name).then_some(values))
    }

    /// The value of attribute `name` at the zero-based `indices` of the block.
    #[must_use]
    pub fn get(&self, name: &str, indices: &[u64]) -> Option<AttributeValue> {
        if indices.len() != self.shape.len()
            || std::iter::zip(indices, &self.shape).any(|(i, s)| i >= s)
        {
            return None;
        }
        let index = usize::try_from(ravel_indices(indices, &self.shape)).ok()?;
        self.attribute(name)?.get(index)
    }

    /// Convert the floating point attribute `name` to an [`ndarray::ArrayD`].
    ///
    /// Returns [`None`] if there is no such attribute, or it is not [`AttributeValues::Float64`].
    #[cfg(feature = "ndarray")]
    #[must_use]
    pub fn to_ndarray(&self, name: &str) -> Option<ndarray::ArrayD<f64>> {
        let values = self.attribute(name)?.as_f64()?.to_vec();
        let shape = self
            .shape
            .iter()
            .map(|&s| usize::try_from(s).ok())
            .collect::<Option<Vec<_>>>()?;
        ndarray::ArrayD::<f64>::from_shape_vec(shape, values).ok()
    }

    /// Create a block with the floating point attribute `name` from an [`ndarray`] array.
    #[cfg(feature = "ndarray")]
    #[must_use]
    pub fn from_ndarray<D: ndarray::Dimension>(
        name: impl Into<String>,
        array: &ndarray::Array<f64, D>,
    ) -> Self {
        let shape = array.shape().iter().map(|&s| s as u64).collect();
        Self::new(shape).with_attribute(name, array.iter().copied().collect::<Vec<f64>>())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dense_block_get() {
        let block = DenseBlock::new(vec![3, 2])
            .with_attribute("expr", vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(block.num_cells(), 6);
        assert_eq!(block.get("expr", &[1, 0]), Some(AttributeValue::Float64(3.0)));
        assert_eq!(block.get("expr", &[2, 1]), Some(AttributeValue::Float64(6.0)));
        assert_eq!(block.get("expr", &[3, 0]), None);
        assert_eq!(block.get("tpm", &[0, 0]), None);
    }

    #[cfg(feature = "ndarray")]
    #[test]
    fn dense_block_ndarray() {
        let array = ndarray::array![[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]];
        let block = DenseBlock::from_ndarray("expr", &array);
        assert_eq!(block.shape(), &[3, 2]);
        assert_eq!(block.get("expr", &[2, 0]), Some(AttributeValue::Float64(5.0)));
        assert_eq!(block.to_ndarray("expr").unwrap(), array.into_dyn());
    }
}
