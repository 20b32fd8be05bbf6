//! Node identity type.
//!
//! Array of Things nodes are identified by the hex MAC-derived string printed
//! on the node (e.g. `001e06113acb`). The id is compared exactly; no case
//! folding is applied.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Sensor node identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        NodeId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parse a raw id from a source file, trimming surrounding whitespace.
    /// Returns `None` for blank ids.
    pub fn parse(s: &str) -> Option<Self> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(NodeId(trimmed.to_string()))
        }
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        NodeId(id.to_string())
    }
}

impl From<String> for NodeId {
    fn from(id: String) -> Self {
        NodeId(id)
    }
}

impl AsRef<str> for NodeId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for NodeId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_parse_trims_and_rejects_blank() {
        assert_eq!(NodeId::parse(" 001e0610ba46 "), Some(NodeId::from("001e0610ba46")));
        assert_eq!(NodeId::parse("   "), None);
    }

    #[test]
    fn test_lookup_by_str() {
        let mut map = HashMap::new();
        map.insert(NodeId::from("N1"), 1);
        assert_eq!(map.get("N1"), Some(&1));
    }
}
