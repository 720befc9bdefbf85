use derive_more::Display;
use serde::{Deserialize, Serialize};

use super::AttributeValue;

/// The value type of an attribute.
#[derive(Serialize, Deserialize, Copy, Clone, Debug, PartialEq, Eq, Hash, Display)]
#[serde(rename_all = "snake_case")]
pub enum AttributeType {
    /// An IEEE 754 double-precision floating point number.
    #[display("float64")]
    Float64,
    /// A 32-bit signed integer.
    #[display("int32")]
    Int32,
    /// A variable length UTF-8 string. Only valid in sparse arrays.
    #[display("string_utf8")]
    StringUtf8,
}

impl AttributeType {
    /// The value of unwritten cells of a dense array.
    #[must_use]
    pub fn fill_value(&self) -> AttributeValue {
        match self {
            Self::Float64 => AttributeValue::Float64(f64::NAN),
            Self::Int32 => AttributeValue::Int32(0),
            Self::StringUtf8 => AttributeValue::String(String::new()),
        }
    }

    /// Returns true if the type has a fixed size.
    #[must_use]
    pub const fn is_fixed_size(&self) -> bool {
        !matches!(self, Self::StringUtf8)
    }
}

/// An array attribute: a named value held by every cell.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Attribute {
    name: String,
    #[serde(rename = "type")]
    attribute_type: AttributeType,
}

impl Attribute {
    /// Create a new attribute.
    #[must_use]
    pub fn new(name: impl Into<String>, attribute_type: AttributeType) -> Self {
        Self {
            name: name.into(),
            attribute_type,
        }
    }

    /// The attribute name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The attribute value type.
    #[must_use]
    pub const fn attribute_type(&self) -> AttributeType {
        self.attribute_type
    }

    /// The fill value of the attribute.
    #[must_use]
    pub fn fill_value(&self) -> AttributeValue {
        self.attribute_type.fill_value()
    }
}
