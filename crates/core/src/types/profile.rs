//! Behavioral profile snapshot.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// The remote-computed summary of a user's viewing and purchasing history.
///
/// A profile is a snapshot: every fetch replaces it wholesale, it is never
/// merged with a previous value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Identity the profile was computed for.
    pub user_id: String,
    /// Number of distinct products viewed.
    pub viewed_count: u64,
    /// Number of purchases.
    pub purchase_count: u64,
    /// Interaction count per category.
    #[serde(default)]
    pub favorite_categories: BTreeMap<String, u64>,
    /// Names of recently viewed products, oldest first.
    #[serde(default)]
    pub viewed_products: Vec<String>,
    /// Names of purchased products, oldest first.
    #[serde(default)]
    pub purchased_products: Vec<String>,
}

impl UserProfile {
    /// Categories with at least one interaction, most active first.
    ///
    /// Ties are broken by category name so the order is stable.
    #[must_use]
    pub fn ranked_categories(&self) -> Vec<(&str, u64)> {
        let mut ranked: Vec<(&str, u64)> = self
            .favorite_categories
            .iter()
            .filter(|(_, count)| **count > 0)
            .map(|(category, count)| (category.as_str(), *count))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        ranked
    }

    /// Whether any category has recorded activity.
    #[must_use]
    pub fn has_category_activity(&self) -> bool {
        self.favorite_categories.values().any(|count| *count > 0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn profile(categories: &[(&str, u64)]) -> UserProfile {
        UserProfile {
            user_id: "user_001".to_string(),
            viewed_count: 0,
            purchase_count: 0,
            favorite_categories: categories
                .iter()
                .map(|(c, n)| ((*c).to_string(), *n))
                .collect(),
            viewed_products: vec![],
            purchased_products: vec![],
        }
    }

    #[test]
    fn test_profile_deserialization() {
        let json = r#"{
            "user_id": "user_001",
            "viewed_count": 2,
            "purchase_count": 1,
            "favorite_categories": {"Electronics": 2, "Accessories": 1},
            "viewed_products": ["Wireless Headphones", "Phone Case"],
            "purchased_products": ["Wireless Headphones"]
        }"#;
        let profile: UserProfile = serde_json::from_str(json).unwrap();
        assert_eq!(profile.viewed_count, 2);
        assert_eq!(profile.purchase_count, 1);
        assert_eq!(profile.favorite_categories.get("Electronics"), Some(&2));
        assert_eq!(profile.viewed_products.get(1).map(String::as_str), Some("Phone Case"));
    }

    #[test]
    fn test_fresh_user_profile_defaults_collections() {
        let json = r#"{"user_id": "user_9999", "viewed_count": 0, "purchase_count": 0}"#;
        let profile: UserProfile = serde_json::from_str(json).unwrap();
        assert!(profile.favorite_categories.is_empty());
        assert!(!profile.has_category_activity());
    }

    #[test]
    fn test_ranked_categories_order_and_filter() {
        let p = profile(&[("Accessories", 1), ("Audio", 0), ("Electronics", 3), ("Desk", 1)]);
        assert_eq!(
            p.ranked_categories(),
            vec![("Electronics", 3), ("Accessories", 1), ("Desk", 1)]
        );
        assert!(p.has_category_activity());
    }

    #[test]
    fn test_all_zero_categories_have_no_activity() {
        let p = profile(&[("Electronics", 0), ("Accessories", 0)]);
        assert!(p.ranked_categories().is_empty());
        assert!(!p.has_category_activity());
    }
}
