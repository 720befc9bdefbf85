//! Coordinate and attribute values.

use derive_more::{Display, From};

use super::{AttributeType, DimensionType};

/// A single coordinate along one dimension.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Display, From)]
pub enum Coordinate {
    /// A positional coordinate.
    Int32(i32),
    /// An identifier coordinate.
    String(String),
}

impl From<&str> for Coordinate {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl Coordinate {
    /// The dimension type this coordinate addresses.
    #[must_use]
    pub const fn dimension_type(&self) -> DimensionType {
        match self {
            Self::Int32(_) => DimensionType::Int32,
            Self::String(_) => DimensionType::StringAscii,
        }
    }
}

/// The coordinates of many cells along one dimension.
#[derive(Clone, Debug, PartialEq, Eq, From)]
pub enum CoordinateValues {
    /// Positional coordinates.
    Int32(Vec<i32>),
    /// Identifier coordinates.
    String(Vec<String>),
}

impl CoordinateValues {
    /// Create empty coordinates of `dimension_type`.
    #[must_use]
    pub fn empty(dimension_type: DimensionType) -> Self {
        match dimension_type {
            DimensionType::Int32 => Self::Int32(Vec::new()),
            DimensionType::StringAscii => Self::String(Vec::new()),
        }
    }

    /// The number of coordinates.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Int32(values) => values.len(),
            Self::String(values) => values.len(),
        }
    }

    /// Returns true if there are no coordinates.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The dimension type these coordinates address.
    #[must_use]
    pub const fn dimension_type(&self) -> DimensionType {
        match self {
            Self::Int32(_) => DimensionType::Int32,
            Self::String(_) => DimensionType::StringAscii,
        }
    }

    /// Returns the coordinate at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<Coordinate> {
        match self {
            Self::Int32(values) => values.get(index).copied().map(Coordinate::Int32),
            Self::String(values) => values.get(index).cloned().map(Coordinate::String),
        }
    }

    /// Append `coordinate`, returning false if it has a different type.
    pub(crate) fn push(&mut self, coordinate: Coordinate) -> bool {
        match (self, coordinate) {
            (Self::Int32(values), Coordinate::Int32(value)) => values.push(value),
            (Self::String(values), Coordinate::String(value)) => values.push(value),
            _ => return false,
        }
        true
    }
}

impl From<Vec<&str>> for CoordinateValues {
    fn from(values: Vec<&str>) -> Self {
        Self::String(values.into_iter().map(str::to_string).collect())
    }
}

/// A single attribute value.
#[derive(Clone, Debug, PartialEq, Display, From)]
pub enum AttributeValue {
    /// A floating point value.
    Float64(f64),
    /// An integer value.
    Int32(i32),
    /// A string value.
    String(String),
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl AttributeValue {
    /// The attribute type of the value.
    #[must_use]
    pub const fn attribute_type(&self) -> AttributeType {
        match self {
            Self::Float64(_) => AttributeType::Float64,
            Self::Int32(_) => AttributeType::Int32,
            Self::String(_) => AttributeType::StringUtf8,
        }
    }

    /// Returns the value if it is a [`AttributeValue::Float64`].
    #[must_use]
    pub const fn as_f64(&self) -> Option<f64> {
        if let Self::Float64(value) = self {
            Some(*value)
        } else {
            None
        }
    }

    /// Returns the value if it is a [`AttributeValue::Int32`].
    #[must_use]
    pub const fn as_i32(&self) -> Option<i32> {
        if let Self::Int32(value) = self {
            Some(*value)
        } else {
            None
        }
    }

    /// Returns the value if it is a [`AttributeValue::String`].
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        if let Self::String(value) = self {
            Some(value)
        } else {
            None
        }
    }
}

/// The values of one attribute for many cells.
#[derive(Clone, Debug, PartialEq, From)]
pub enum AttributeValues {
    /// Floating point values.
    Float64(Vec<f64>),
    /// Integer values.
    Int32(Vec<i32>),
    /// String values.
    String(Vec<String>),
}

impl AttributeValues {
    /// Create empty values of `attribute_type`.
    #[must_use]
    pub fn empty(attribute_type: AttributeType) -> Self {
        match attribute_type {
            AttributeType::Float64 => Self::Float64(Vec::new()),
            AttributeType::Int32 => Self::Int32(Vec::new()),
            AttributeType::StringUtf8 => Self::String(Vec::new()),
        }
    }

    /// Create `len` copies of the fill value of `attribute_type`.
    #[must_use]
    pub fn filled(attribute_type: AttributeType, len: usize) -> Self {
        match attribute_type {
            AttributeType::Float64 => Self::Float64(vec![f64::NAN; len]),
            AttributeType::Int32 => Self::Int32(vec![0; len]),
            AttributeType::StringUtf8 => Self::String(vec![String::new(); len]),
        }
    }

    /// The number of values.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Float64(values) => values.len(),
            Self::Int32(values) => values.len(),
            Self::String(values) => values.len(),
        }
    }

    /// Returns true if there are no values.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The attribute type of the values.
    #[must_use]
    pub const fn attribute_type(&self) -> AttributeType {
        match self {
            Self::Float64(_) => AttributeType::Float64,
            Self::Int32(_) => AttributeType::Int32,
            Self::String(_) => AttributeType::StringUtf8,
        }
    }

    /// Returns the value at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<AttributeValue> {
        match self {
            Self::Float64(values) => values.get(index).copied().map(AttributeValue::Float64),
            Self::Int32(values) => values.get(index).copied().map(AttributeValue::Int32),
            Self::String(values) => values.get(index).cloned().map(AttributeValue::String),
        }
    }

    /// Returns the values if they are [`AttributeValues::Float64`].
    #[must_use]
    pub fn as_f64(&self) -> Option<&[f64]> {
        if let Self::Float64(values) = self {
            Some(values)
        } else {
            None
        }
    }

    /// Returns the values if they are [`AttributeValues::Int32`].
    #[must_use]
    pub fn as_i32(&self) -> Option<&[i32]> {
        if let Self::Int32(values) = self {
            Some(values)
        } else {
            None
        }
    }

    /// Returns the values if they are [`AttributeValues::String`].
    #[must_use]
    pub fn as_strings(&self) -> Option<&[String]> {
        if let Self::String(values) = self {
            Some(values)
        } else {
            None
        }
    }

    /// Append `value`, returning false if it has a different type.
    pub(crate) fn push(&mut self, value: AttributeValue) -> bool {
        match (self, value) {
            (Self::Float64(values), AttributeValue::Float64(value)) => values.push(value),
            (Self::Int32(values), AttributeValue::Int32(value)) => values.push(value),
            (Self::String(values), AttributeValue::String(value)) => values.push(value),
            _ => return false,
        }
        true
    }

    /// Overwrite the value at `index`, returning false if it has a different type or is out of bounds.
    pub(crate) fn set(&mut self, index: usize, value: AttributeValue) -> bool {
        fn replace<T>(values: &mut [T], index: usize, value: T) -> bool {
            if let Some(slot) = values.get_mut(index) {
                *slot = value;
                true
            } else {
                false
            }
        }
        match (self, value) {
            (Self::Float64(values), AttributeValue::Float64(value)) => {
                replace(values, index, value)
            }
            (Self::Int32(values), AttributeValue::Int32(value)) => replace(values, index, value),
            (Self::String(values), AttributeValue::String(value)) => {
                replace(values, index, value)
            }
            _ => false,
        }
    }
}

impl From<Vec<&str>> for AttributeValues {
    fn from(values: Vec<&str>) -> Self {
        Self::String(values.into_iter().map(str::to_string).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coordinate_values() {
        let values = CoordinateValues::from(vec!["g1", "g2"]);
        assert_eq!(values.len(), 2);
        assert_eq!(values.dimension_type(), DimensionType::StringAscii);
        assert_eq!(values.get(1), Some(Coordinate::from("g2")));
        assert_eq!(values.get(2), None);
        let mut values = CoordinateValues::empty(DimensionType::Int32);
        assert!(values.push(Coordinate::Int32(4)));
        assert!(!values.push(Coordinate::from("g1")));
        assert_eq!(values, CoordinateValues::Int32(vec![4]));
    }

    #[test]
    fn attribute_values() {
        let mut values = AttributeValues::filled(AttributeType::Float64, 2);
        assert!(values.get(0).and_then(|v| v.as_f64()).unwrap().is_nan());
        assert!(values.set(1, AttributeValue::Float64(2.0)));
        assert!(!values.set(2, AttributeValue::Float64(2.0)));
        assert!(!values.set(0, AttributeValue::Int32(2)));
        assert_eq!(values.get(1), Some(AttributeValue::Float64(2.0)));
        assert_eq!(AttributeValue::from("~ A + B").to_string(), "~ A + B");
        assert_eq!(
            AttributeValues::from(vec![1, 2]).attribute_type(),
            AttributeType::Int32
        );
    }
}
