//! Catalog products and ranked recommendations.

use std::collections::BTreeSet;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::{Price, ProductId};

/// A catalog product.
///
/// Products are sourced wholly from the remote API and never modified locally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Catalog ID (e.g. `P001`).
    pub id: ProductId,
    /// Display name.
    pub name: String,
    /// Unit price.
    pub price: Price,
    /// Category the product is filed under.
    pub category: String,
    /// Free-form descriptive tags.
    #[serde(default)]
    pub tags: BTreeSet<String>,
}

/// A ranked product suggestion paired with a human-readable rationale.
///
/// Recommendations arrive as an ordered sequence; the index in that sequence
/// is the rank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    /// The recommended product.
    pub product: Product,
    /// Why the recommender picked this product for the user.
    pub explanation: String,
    /// When the remote side produced the explanation, if reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<NaiveDateTime>,
}

impl Recommendation {
    /// Display label for the recommendation at zero-based `rank`.
    #[must_use]
    pub fn rank_label(rank: usize) -> String {
        format!("Rec #{}", rank + 1)
    }
}
