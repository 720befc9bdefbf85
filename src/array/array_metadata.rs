use derive_more::Display;
use serde::{Deserialize, Serialize};

use super::ArraySchema;

/// Array metadata.
///
/// ### Example JSON
/// ```json
/// {
///     "node_type": "array",
///     "format": 1,
///     "schema": {
///         "array_type": "sparse",
///         "dimensions": [
///             { "name": "contrast", "type": "string_ascii" }
///         ],
///         "attributes": [
///             { "name": "formula", "type": "string_utf8" }
///         ],
///         "cell_order": "row_major",
///         "tile_order": "row_major"
///     },
///     "attributes": {
///         "study": "gsfq0zk81md"
///     }
/// }
/// ```
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Display)]
#[display("{}", serde_json::to_string(self).unwrap_or_default())]
pub struct ArrayMetadata {
    /// A string defining the type of hierarchy node element, must be `array` here.
    pub node_type: monostate::MustBe!("array"),
    /// The metadata format version, must be `1`.
    pub format: monostate::MustBe!(1u64),
    /// The array schema.
    pub schema: ArraySchema,
    /// Optional user defined attributes.
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

impl ArrayMetadata {
    /// Create array metadata.
    #[must_use]
    pub fn new(
        schema: ArraySchema,
        attributes: serde_json::Map<String, serde_json::Value>,
    ) -> Self {
        Self {
            node_type: monostate::MustBe!("array"),
            format: monostate::MustBe!(1u64),
            schema,
            attributes,
        }
    }
}
