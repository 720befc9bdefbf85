use derive_more::Display;
use serde::{Deserialize, Serialize};

/// Group metadata.
///
/// A group is a named container with no schema of its own; it only carries user attributes.
/// ```json
/// {
///     "node_type": "group",
///     "attributes": {
///         "study": "gsfq0zk81md",
///         "contrasts": 5
///     }
/// }
/// ```
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Display)]
#[display("{}", serde_json::to_string(self).unwrap_or_default())]
pub struct GroupMetadata {
    /// A string defining the type of hierarchy node element, must be `group` here.
    pub node_type: monostate::MustBe!("group"),
    /// Optional user defined attributes.
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

impl Default for GroupMetadata {
    fn default() -> Self {
        Self::new(serde_json::Map::new())
    }
}

impl GroupMetadata {
    /// Create group metadata with `attributes`.
    #[must_use]
    pub fn new(attributes: serde_json::Map<String, serde_json::Value>) -> Self {
        Self {
            node_type: monostate::MustBe!("group"),
            attributes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_metadata_round_trip() {
        let mut attributes = serde_json::Map::new();
        attributes.insert("contrasts".to_string(), 5.into());
        let metadata = GroupMetadata::new(attributes);
        let json = metadata.to_string();
        assert_eq!(json, r#"{"node_type":"group","attributes":{"contrasts":5}}"#);
        let parsed: GroupMetadata = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, metadata);
        assert_eq!(
            GroupMetadata::default().to_string(),
            r#"{"node_type":"group"}"#
        );
    }
}
