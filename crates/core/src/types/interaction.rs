//! Interaction events reported to the remote aggregator.

use serde::{Deserialize, Serialize};

use super::ProductId;

/// Kind of interaction a user performs against a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionKind {
    View,
    Purchase,
}

impl std::fmt::Display for InteractionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::View => write!(f, "view"),
            Self::Purchase => write!(f, "purchase"),
        }
    }
}

impl std::str::FromStr for InteractionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "view" => Ok(Self::View),
            "purchase" => Ok(Self::Purchase),
            _ => Err(format!("invalid interaction type: {s}")),
        }
    }
}

/// Body of a tracking request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingRecord {
    pub product_id: ProductId,
    #[serde(rename = "type")]
    pub kind: InteractionKind,
}

impl TrackingRecord {
    #[must_use]
    pub const fn new(product_id: ProductId, kind: InteractionKind) -> Self {
        Self { product_id, kind }
    }
}
