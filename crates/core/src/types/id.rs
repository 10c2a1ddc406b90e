//! Catalog product identifier.
//!
//! The remote catalog keys products by opaque strings (e.g. `P001`); the
//! newtype keeps them from being mixed up with identities or names.

use serde::{Deserialize, Serialize};

/// Opaque product identifier assigned by the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(String);

impl ProductId {
    /// Create a new ID from any string-like value.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the underlying string value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ProductId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ProductId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for ProductId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl From<ProductId> for String {
    fn from(id: ProductId) -> Self {
        id.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_product_id_serializes_transparently() {
        let id = ProductId::new("P001");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"P001\"");

        let parsed: ProductId = serde_json::from_str("\"P042\"").unwrap();
        assert_eq!(parsed.as_str(), "P042");
    }

    #[test]
    fn test_product_id_display() {
        assert_eq!(ProductId::from("p42").to_string(), "p42");
    }
}
