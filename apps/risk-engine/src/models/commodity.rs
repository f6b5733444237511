//! Commodity identifier value object.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a commodity in the configured universe.
///
/// Normalized to uppercase so `"corn"` and `"CORN"` name the same book entry.
///
/// Examples: `"CORN"`, `"WHEAT"`, `"SOYBEANS"`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct CommodityId(String);

impl CommodityId {
    /// Create a new identifier.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into().trim().to_uppercase())
    }

    /// Get the identifier string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the identifier is empty after normalization.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for CommodityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CommodityId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for CommodityId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<CommodityId> for String {
    fn from(id: CommodityId) -> Self {
        id.0
    }
}

impl AsRef<str> for CommodityId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commodity_id_normalized() {
        assert_eq!(CommodityId::new(" corn ").as_str(), "CORN");
        assert_eq!(CommodityId::from("Wheat"), CommodityId::new("WHEAT"));
    }

    #[test]
    fn test_commodity_id_serde_normalizes() {
        let id: CommodityId = serde_json::from_str("\"soybeans\"").unwrap();
        assert_eq!(id.as_str(), "SOYBEANS");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"SOYBEANS\"");
    }

    #[test]
    fn test_commodity_id_ordering() {
        let mut ids = vec![CommodityId::new("wheat"), CommodityId::new("corn")];
        ids.sort();
        assert_eq!(ids[0].as_str(), "CORN");
    }
}
