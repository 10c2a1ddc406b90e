//! Integration test support for the recommender dashboard.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p recommender-integration-tests
//! ```
//!
//! Nothing external is needed: session tests run against [`RecordingGateway`],
//! an in-process fake, and client tests against [`StubApi`], an `axum` server
//! bound to an ephemeral local port.
//!
//! # Test Categories
//!
//! - `session_identity` - identity reaction, stale-response handling
//! - `session_interactions` - tracking and the delayed refresh
//! - `api_client` - HTTP client against the stub API

mod fake;
mod stub;

use std::time::Duration;

use recommender_core::{Price, Product, ProductId, Recommendation};
use recommender_dashboard::session::{SessionHandle, SessionSnapshot};

pub use fake::{Call, CallRecord, Endpoint, RecordingGateway};
pub use stub::{RecordedRequest, StubApi};

/// Longest a test waits for a session to reach an expected state.
pub const WAIT_LIMIT: Duration = Duration::from_secs(5);

/// Wait until a published snapshot satisfies `condition`.
///
/// Returns `None` if the session closes or [`WAIT_LIMIT`] passes first.
pub async fn wait_for_snapshot(
    handle: &SessionHandle,
    condition: impl FnMut(&SessionSnapshot) -> bool,
) -> Option<SessionSnapshot> {
    let mut updates = handle.subscribe();
    let snapshot = tokio::time::timeout(WAIT_LIMIT, updates.wait_for(condition))
        .await
        .ok()?
        .ok()?;
    Some(snapshot.clone())
}

/// Let the session drain everything runnable at `duration` from now.
pub async fn settle_for(duration: Duration) {
    tokio::time::sleep(duration).await;
}

// =============================================================================
// Fixtures
// =============================================================================

/// Build a product.
#[must_use]
pub fn product(id: &str, name: &str, category: &str, cents: i64) -> Product {
    Product {
        id: ProductId::new(id),
        name: name.to_string(),
        price: Price::from_cents(cents),
        category: category.to_string(),
        tags: std::iter::once(category.to_lowercase()).collect(),
    }
}

/// A small catalog with products in two categories.
#[must_use]
pub fn catalog() -> Vec<Product> {
    vec![
        product("P001", "Wireless Headphones", "Electronics", 7999),
        product("P002", "Phone Case", "Accessories", 2499),
        product("P003", "Smart Watch", "Electronics", 19999),
        product("p42", "Charging Cable", "Accessories", 1299),
    ]
}

/// Pair every product with an explanation naming `user`, in catalog order.
#[must_use]
pub fn recommendations_for(user: &str, products: &[Product]) -> Vec<Recommendation> {
    products
        .iter()
        .map(|product| Recommendation {
            product: product.clone(),
            explanation: format!("Picked for {user}"),
            generated_at: None,
        })
        .collect()
}
