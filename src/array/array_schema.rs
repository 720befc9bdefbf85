use std::collections::HashSet;

use derive_more::Display;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::node::NodeName;

use super::{Attribute, AttributeType, Dimension, DimensionType};

/// The physical layout of an array.
#[derive(Serialize, Deserialize, Copy, Clone, Debug, PartialEq, Eq, Hash, Display)]
#[serde(rename_all = "snake_case")]
pub enum ArrayType {
    /// Only written cells are stored, as explicit (coordinate, value) pairs.
    #[display("sparse")]
    Sparse,
    /// Every cell of the domain is stored in rectangular tiles.
    #[display("dense")]
    Dense,
}

/// A cell or tile order.
#[derive(Serialize, Deserialize, Copy, Clone, Debug, PartialEq, Eq, Hash, Default, Display)]
#[serde(rename_all = "snake_case")]
pub enum Layout {
    /// The last dimension varies fastest.
    #[default]
    #[display("row_major")]
    RowMajor,
    /// The first dimension varies fastest.
    #[display("col_major")]
    ColMajor,
}

/// An array schema: dimensions, attributes, layout and cell/tile orders.
///
/// A schema is immutable once an array is created.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ArraySchema {
    array_type: ArrayType,
    dimensions: Vec<Dimension>,
    attributes: Vec<Attribute>,
    #[serde(default)]
    cell_order: Layout,
    #[serde(default)]
    tile_order: Layout,
}

/// An invalid array schema.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InvalidSchemaError {
    /// The schema has no dimensions.
    #[error("an array schema requires at least one dimension")]
    NoDimensions,
    /// The schema has no attributes.
    #[error("an array schema requires at least one attribute")]
    NoAttributes,
    /// A name is used more than once across dimensions and attributes.
    #[error("duplicate dimension or attribute name {0}")]
    DuplicateName(String),
    /// A dimension or attribute name is not a valid node name.
    #[error("invalid dimension or attribute name {0:?}")]
    InvalidName(String),
    /// A positional dimension has no domain.
    #[error("int32 dimension {0} requires a domain")]
    MissingDomain(String),
    /// A string dimension has a domain.
    #[error("string dimension {0} cannot have a domain")]
    UnexpectedDomain(String),
    /// A domain lower bound exceeds its upper bound.
    #[error("dimension {name} has an invalid domain [{lo}, {hi}]")]
    InvalidDomain {
        /// The dimension name.
        name: String,
        /// The lower bound.
        lo: i32,
        /// The upper bound.
        hi: i32,
    },
    /// A dense array has an unbounded (string) dimension.
    #[error("dense arrays require bounded dimensions, {0} is unbounded")]
    DenseUnboundedDimension(String),
    /// A dense array has a variable length attribute.
    #[error("dense arrays require fixed size attributes, {0} is variable length")]
    DenseVariableLengthAttribute(String),
    /// The number of cells in a dense domain is not addressable.
    #[error("the dense domain {0:?} has too many cells")]
    DomainTooLarge(Vec<u64>),
}

impl ArraySchema {
    /// Create and validate a new array schema.
    ///
    /// # Errors
    /// Returns [`InvalidSchemaError`] if the schema is not valid according to [`ArraySchema::validate`].
    pub fn new(
        array_type: ArrayType,
        dimensions: Vec<Dimension>,
        attributes: Vec<Attribute>,
        cell_order: Layout,
        tile_order: Layout,
    ) -> Result<Self, InvalidSchemaError> {
        let schema = Self {
            array_type,
            dimensions,
            attributes,
            cell_order,
            tile_order,
        };
        schema.validate()?;
        Ok(schema)
    }

    /// Validate the schema.
    ///
    /// # Errors
    /// Returns [`InvalidSchemaError`] if
    ///  - there are no dimensions or no attributes,
    ///  - a dimension or attribute name is invalid or duplicated,
    ///  - a dimension domain is missing, unexpected, or inverted, or
    ///  - a dense array has a string dimension, a variable length attribute, or more cells than fit in memory addressing.
    pub fn validate(&self) -> Result<(), InvalidSchemaError> {
        if self.dimensions.is_empty() {
            return Err(InvalidSchemaError::NoDimensions);
        }
        if self.attributes.is_empty() {
            return Err(InvalidSchemaError::NoAttributes);
        }

        let mut names = HashSet::new();
        let all_names = self
            .dimensions
            .iter()
            .map(Dimension::name)
            .chain(self.attributes.iter().map(Attribute::name));
        for name in all_names {
            if name.is_empty() || !NodeName::validate(name) {
                return Err(InvalidSchemaError::InvalidName(name.to_string()));
            }
            if !names.insert(name) {
                return Err(InvalidSchemaError::DuplicateName(name.to_string()));
            }
        }

        for dimension in &self.dimensions {
            let name = dimension.name().to_string();
            match (dimension.dimension_type(), dimension.domain()) {
                (DimensionType::Int32, None) => {
                    return Err(InvalidSchemaError::MissingDomain(name))
                }
                (DimensionType::Int32, Some((lo, hi))) if lo > hi => {
                    return Err(InvalidSchemaError::InvalidDomain { name, lo, hi })
                }
                (DimensionType::StringAscii, Some(_)) => {
                    return Err(InvalidSchemaError::UnexpectedDomain(name))
                }
                (DimensionType::StringAscii, None) if self.array_type == ArrayType::Dense => {
                    return Err(InvalidSchemaError::DenseUnboundedDimension(name))
                }
                _ => {}
            }
        }

        if self.array_type == ArrayType::Dense {
            if let Some(attribute) = self
                .attributes
                .iter()
                .find(|attribute| attribute.attribute_type() == AttributeType::StringUtf8)
            {
                return Err(InvalidSchemaError::DenseVariableLengthAttribute(
                    attribute.name().to_string(),
                ));
            }
            if self
                .num_cells()
                .and_then(|num_cells| usize::try_from(num_cells).ok())
                .is_none()
            {
                return Err(InvalidSchemaError::DomainTooLarge(
                    self.domain_shape().unwrap_or_default(),
                ));
            }
        }
        Ok(())
    }

    /// The array type.
    #[must_use]
    pub const fn array_type(&self) -> ArrayType {
        self.array_type
    }

    /// The dimensions.
    #[must_use]
    pub fn dimensions(&self) -> &[Dimension] {
        &self.dimensions
    }

    /// The attributes.
    #[must_use]
    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    /// The cell order.
    #[must_use]
    pub const fn cell_order(&self) -> Layout {
        self.cell_order
    }

    /// The tile order.
    #[must_use]
    pub const fn tile_order(&self) -> Layout {
        self.tile_order
    }

    /// The dimension named `name`.
    #[must_use]
    pub fn dimension(&self, name: &str) -> Option<&Dimension> {
        self.dimensions.iter().find(|d| d.name() == name)
    }

    /// The attribute named `name`.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name() == name)
    }

    /// The shape of the domain, or [`None`] if any dimension is unbounded.
    #[must_use]
    pub fn domain_shape(&self) -> Option<Vec<u64>> {
        self.dimensions.iter().map(Dimension::domain_length).collect()
    }

    /// The number of cells in the domain.
    ///
    /// Returns [`None`] if any dimension is unbounded or the count overflows a [`u64`].
    #[must_use]
    pub fn num_cells(&self) -> Option<u64> {
        self.domain_shape()?
            .into_iter()
            .try_fold(1u64, u64::checked_mul)
    }

    /// The effective tile shape of a bounded domain.
    #[must_use]
    pub fn tile_shape(&self) -> Option<Vec<u64>> {
        self.dimensions
            .iter()
            .map(Dimension::effective_tile_extent)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroU64;

    use super::*;

    fn float(name: &str) -> Attribute {
        Attribute::new(name, AttributeType::Float64)
    }

    #[test]
    fn schema_valid() {
        let schema = ArraySchema::new(
            ArrayType::Dense,
            vec![
                Dimension::int32("gene", (1, 3), NonZeroU64::new(1000)),
                Dimension::int32("sample", (1, 2), None),
            ],
            vec![float("expr")],
            Layout::RowMajor,
            Layout::RowMajor,
        )
        .unwrap();
        assert_eq!(schema.domain_shape(), Some(vec![3, 2]));
        assert_eq!(schema.tile_shape(), Some(vec![3, 2]));
        assert_eq!(schema.num_cells(), Some(6));
        assert_eq!(schema.attribute("expr"), Some(&float("expr")));
    }

    #[test]
    fn schema_invalid() {
        let sparse = |dimensions: Vec<Dimension>, attributes: Vec<Attribute>| {
            ArraySchema::new(
                ArrayType::Sparse,
                dimensions,
                attributes,
                Layout::ColMajor,
                Layout::ColMajor,
            )
            .unwrap_err()
        };
        assert_eq!(
            sparse(vec![], vec![float("a")]),
            InvalidSchemaError::NoDimensions
        );
        assert_eq!(
            sparse(vec![Dimension::string("gene", None)], vec![]),
            InvalidSchemaError::NoAttributes
        );
        assert_eq!(
            sparse(vec![Dimension::string("gene", None)], vec![float("gene")]),
            InvalidSchemaError::DuplicateName("gene".to_string())
        );
        assert_eq!(
            sparse(vec![Dimension::string("a/b", None)], vec![float("x")]),
            InvalidSchemaError::InvalidName("a/b".to_string())
        );
        assert_eq!(
            sparse(
                vec![Dimension::new("gene", DimensionType::Int32, None, None)],
                vec![float("x")]
            ),
            InvalidSchemaError::MissingDomain("gene".to_string())
        );
        assert_eq!(
            sparse(vec![Dimension::int32("gene", (5, 1), None)], vec![float("x")]),
            InvalidSchemaError::InvalidDomain {
                name: "gene".to_string(),
                lo: 5,
                hi: 1
            }
        );
        assert_eq!(
            sparse(
                vec![Dimension::new(
                    "gene",
                    DimensionType::StringAscii,
                    Some((1, 2)),
                    None
                )],
                vec![float("x")]
            ),
            InvalidSchemaError::UnexpectedDomain("gene".to_string())
        );
    }

    #[test]
    fn schema_invalid_dense() {
        let err = ArraySchema::new(
            ArrayType::Dense,
            vec![Dimension::string("gene", None)],
            vec![float("expr")],
            Layout::RowMajor,
            Layout::RowMajor,
        )
        .unwrap_err();
        assert_eq!(
            err,
            InvalidSchemaError::DenseUnboundedDimension("gene".to_string())
        );
        let err = ArraySchema::new(
            ArrayType::Dense,
            vec![Dimension::int32("gene", (1, 2), None)],
            vec![Attribute::new("formula", AttributeType::StringUtf8)],
            Layout::RowMajor,
            Layout::RowMajor,
        )
        .unwrap_err();
        assert_eq!(
            err,
            InvalidSchemaError::DenseVariableLengthAttribute("formula".to_string())
        );

        let full = || Dimension::int32("position", (i32::MIN, i32::MAX), None);
        let err = ArraySchema::new(
            ArrayType::Dense,
            vec![full(), Dimension::int32("other", (i32::MIN, i32::MAX), None)],
            vec![float("expr")],
            Layout::RowMajor,
            Layout::RowMajor,
        )
        .unwrap_err();
        assert_eq!(
            err,
            InvalidSchemaError::DomainTooLarge(vec![1_u64 << 32, 1_u64 << 32])
        );

        // the same domain is fine for a sparse array, which stores only written cells
        let sparse = ArraySchema::new(
            ArrayType::Sparse,
            vec![full(), Dimension::int32("other", (i32::MIN, i32::MAX), None)],
            vec![float("expr")],
            Layout::RowMajor,
            Layout::RowMajor,
        )
        .unwrap();
        assert_eq!(sparse.num_cells(), None);
    }
}
