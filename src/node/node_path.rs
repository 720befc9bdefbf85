use crate::storage::StorePrefix;
use derive_more::Display;
use thiserror::Error;

use super::NodeName;

/// A hierarchy node path.
///
/// A path always starts with `/`; the root node is `/`.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Display)]
pub struct NodePath(String);

/// An invalid node path.
#[derive(Debug, Error)]
#[error("invalid node path {0}")]
pub struct NodePathError(String);

impl NodePath {
    /// Create a new node path from `path`.
    ///
    /// # Errors
    ///
    /// Returns [`NodePathError`] if `path` is not valid according to [`NodePath::validate`()].
    pub fn new(path: &str) -> Result<Self, NodePathError> {
        if Self::validate(path) {
            Ok(Self(path.to_string()))
        } else {
            Err(NodePathError(path.to_string()))
        }
    }

    /// The root node.
    #[must_use]
    pub fn root() -> Self {
        Self("/".to_string())
    }

    /// Extracts a string slice containing the node path.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Indicates if this is the root path.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0 == "/"
    }

    /// Validates a path:
    /// - a path always starts with `/`,
    /// - a non-root path cannot end with `/`, and
    /// - every component is a valid [`NodeName`].
    #[must_use]
    pub fn validate(path: &str) -> bool {
        path == "/"
            || (path.starts_with('/')
                && path[1..]
                    .split('/')
                    .all(|name| !name.is_empty() && NodeName::validate(name)))
    }

    /// Returns the path of the child node `name`.
    ///
    /// # Errors
    ///
    /// Returns [`NodePathError`] if `name` is not a valid node name.
    pub fn child(&self, name: &str) -> Result<Self, NodePathError> {
        if name.is_empty() || !NodeName::validate(name) {
            return Err(NodePathError(format!("{}/{name}", self.0)));
        }
        if self.is_root() {
            Ok(Self(format!("/{name}")))
        } else {
            Ok(Self(format!("{}/{name}", self.0)))
        }
    }

    /// Returns the path of the parent node, if this is not the root.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        if self.is_root() {
            return None;
        }
        match self.0.rsplit_once('/') {
            Some(("", _)) => Some(Self::root()),
            Some((parent, _)) => Some(Self(parent.to_string())),
            None => None,
        }
    }
}

impl TryFrom<&str> for NodePath {
    type Error = NodePathError;

    fn try_from(path: &str) -> Result<Self, Self::Error> {
        Self::new(path)
    }
}

impl TryFrom<&StorePrefix> for NodePath {
    type Error = NodePathError;

    fn try_from(prefix: &StorePrefix) -> Result<Self, Self::Error> {
        match prefix.as_str().strip_suffix('/') {
            Some(path) => Self::new(&format!("/{path}")),
            None => Ok(Self::root()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_path() {
        assert!(NodePath::new("/").is_ok());
        assert!(NodePath::new("/a/b").is_ok());
        assert_eq!(NodePath::new("/a/b").unwrap().to_string(), "/a/b");
        assert!(NodePath::new("/a/b/").is_err());
        assert_eq!(
            NodePath::new("/a/b/").unwrap_err().to_string(),
            "invalid node path /a/b/"
        );
        assert!(NodePath::new("/a//b").is_err());
        assert!(NodePath::new("a/b").is_err());
        assert!(NodePath::new("/a/__fragments").is_err());
    }

    #[test]
    fn node_path_relatives() {
        let root = NodePath::root();
        let study = root.child("gsfabc").unwrap();
        assert_eq!(study.as_str(), "/gsfabc");
        let stats = study.child("stats").unwrap();
        assert_eq!(stats.as_str(), "/gsfabc/stats");
        assert!(study.child("a/b").is_err());
        assert_eq!(stats.parent(), Some(study.clone()));
        assert_eq!(study.parent(), Some(root.clone()));
        assert_eq!(root.parent(), None);
    }

    #[test]
    fn node_path_from_prefix() {
        let prefix = StorePrefix::new("gsfabc/stats/").unwrap();
        assert_eq!(NodePath::try_from(&prefix).unwrap().as_str(), "/gsfabc/stats");
        assert!(NodePath::try_from(&StorePrefix::root()).unwrap().is_root());
    }
}
