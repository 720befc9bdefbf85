use std::num::NonZeroU64;

use derive_more::Display;
use serde::{Deserialize, Serialize};

/// The key type of a dimension.
#[derive(Serialize, Deserialize, Copy, Clone, Debug, PartialEq, Eq, Hash, Display)]
#[serde(rename_all = "snake_case")]
pub enum DimensionType {
    /// A variable length ASCII identifier (e.g. a gene or sample identifier).
    ///
    /// String dimensions have no domain and are only valid in sparse arrays.
    #[display("string_ascii")]
    StringAscii,
    /// A positional 32-bit integer with an inclusive domain.
    #[display("int32")]
    Int32,
}

/// An array dimension.
///
/// ### Example JSON
/// ```json
/// { "name": "gene", "type": "int32", "domain": [1, 20000], "tile_extent": 1000 }
/// ```
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Dimension {
    name: String,
    #[serde(rename = "type")]
    dimension_type: DimensionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    domain: Option<(i32, i32)>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tile_extent: Option<NonZeroU64>,
}

impl Dimension {
    /// Create a new dimension.
    ///
    /// The dimension is not validated until it is part of a schema, see [`ArraySchema::validate`](super::ArraySchema::validate).
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        dimension_type: DimensionType,
        domain: Option<(i32, i32)>,
        tile_extent: Option<NonZeroU64>,
    ) -> Self {
        Self {
            name: name.into(),
            dimension_type,
            domain,
            tile_extent,
        }
    }

    /// Create a string identifier dimension.
    #[must_use]
    pub fn string(name: impl Into<String>, tile_extent: Option<NonZeroU64>) -> Self {
        Self::new(name, DimensionType::StringAscii, None, tile_extent)
    }

    /// Create a positional integer dimension with the inclusive domain `(lo, hi)`.
    #[must_use]
    pub fn int32(
        name: impl Into<String>,
        domain: (i32, i32),
        tile_extent: Option<NonZeroU64>,
    ) -> Self {
        Self::new(name, DimensionType::Int32, Some(domain), tile_extent)
    }

    /// The dimension name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The dimension key type.
    #[must_use]
    pub const fn dimension_type(&self) -> DimensionType {
        self.dimension_type
    }

    /// The inclusive domain of the dimension, if bounded.
    #[must_use]
    pub const fn domain(&self) -> Option<(i32, i32)> {
        self.domain
    }

    /// The requested tile extent.
    #[must_use]
    pub const fn tile_extent(&self) -> Option<NonZeroU64> {
        self.tile_extent
    }

    /// The number of positions in the domain, or [`None`] if the dimension is unbounded.
    #[must_use]
    pub fn domain_length(&self) -> Option<u64> {
        self.domain
            .map(|(lo, hi)| u64::try_from(i64::from(hi) - i64::from(lo) + 1).unwrap_or(0))
    }

    /// The effective tile extent of a bounded dimension.
    ///
    /// An unset tile extent spans the whole domain, and an extent larger than the domain is clamped to it.
    #[must_use]
    pub fn effective_tile_extent(&self) -> Option<u64> {
        let length = self.domain_length()?;
        Some(
            self.tile_extent
                .map_or(length, |extent| extent.get().min(length))
                .max(1),
        )
    }

    /// Returns true if the positional `coordinate` lies inside the domain.
    #[must_use]
    pub fn contains(&self, coordinate: i32) -> bool {
        self.domain
            .is_some_and(|(lo, hi)| (lo..=hi).contains(&coordinate))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dimension_tile_extent() {
        let dimension = Dimension::int32("gene", (1, 3), NonZeroU64::new(1000));
        assert_eq!(dimension.domain_length(), Some(3));
        assert_eq!(dimension.effective_tile_extent(), Some(3));
        assert!(dimension.contains(1));
        assert!(dimension.contains(3));
        assert!(!dimension.contains(0));

        let dimension = Dimension::int32("sample", (0, 9), NonZeroU64::new(4));
        assert_eq!(dimension.effective_tile_extent(), Some(4));
        let dimension = Dimension::int32("sample", (0, 9), None);
        assert_eq!(dimension.effective_tile_extent(), Some(10));

        let dimension = Dimension::string("gene", NonZeroU64::new(1000));
        assert_eq!(dimension.domain_length(), None);
        assert_eq!(dimension.effective_tile_extent(), None);
        assert!(!dimension.contains(1));
    }

    #[test]
    fn dimension_json() {
        let dimension = Dimension::int32("gene", (1, 20000), NonZeroU64::new(1000));
        let json = serde_json::to_string(&dimension).unwrap();
        assert_eq!(
            json,
            r#"{"name":"gene","type":"int32","domain":[1,20000],"tile_extent":1000}"#
        );
        let dimension: Dimension =
            serde_json::from_str(r#"{"name":"contrast","type":"string_ascii"}"#).unwrap();
        assert_eq!(dimension, Dimension::string("contrast", None));
        assert!(serde_json::from_str::<Dimension>(
            r#"{"name":"gene","type":"string_ascii","tile_extent":0}"#
        )
        .is_err());
    }
}
