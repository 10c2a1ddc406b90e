//! Remote recommender API.
//!
//! # Architecture
//!
//! - [`RecommenderApi`] is the seam the session depends on; it states the
//!   four-endpoint contract and nothing else
//! - [`ApiClient`] implements it over HTTP with `reqwest`
//! - The recommendation math, profile aggregation and persistence all live on
//!   the remote side
//!
//! # Endpoints
//!
//! All paths are relative to the configured base (e.g. `http://localhost:5000/api`):
//!
//! - `GET /products`
//! - `GET /recommendations/{user}?count={n}`
//! - `GET /user/{user}/profile`
//! - `POST /user/{user}/track` with `{"product_id": .., "type": "view" | "purchase"}`
//!
//! # Example
//!
//! ```rust,ignore
//! use recommender_dashboard::gateway::{ApiClient, RecommenderApi};
//!
//! let client = ApiClient::new(&config.api)?;
//! let catalog = client.list_products().await?;
//! let recs = client.recommendations(&user, 4).await?;
//! ```

mod client;

use std::future::Future;

use recommender_core::{Product, Recommendation, TrackingRecord, UserIdentity, UserProfile};
use thiserror::Error;

pub use client::ApiClient;

/// Errors that can occur when talking to the recommender API.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// HTTP request failed (connection refused, timeout, ...).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API answered with a non-success status.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Response body could not be decoded.
    #[error("Malformed response: {0}")]
    Malformed(String),

    /// Endpoint URL could not be built from the configured base.
    #[error("Invalid endpoint URL: {0}")]
    InvalidUrl(String),
}

/// The remote recommender API contract.
///
/// Implementations must be shareable across tasks: the session issues
/// requests concurrently from spawned tasks.
pub trait RecommenderApi: Send + Sync + 'static {
    /// Fetch the full catalog, in API order.
    fn list_products(&self) -> impl Future<Output = Result<Vec<Product>, GatewayError>> + Send;

    /// Fetch up to `count` ranked recommendations for `user`.
    ///
    /// A response without a well-formed `recommendations` field yields an
    /// empty list, not an error.
    fn recommendations(
        &self,
        user: &UserIdentity,
        count: u32,
    ) -> impl Future<Output = Result<Vec<Recommendation>, GatewayError>> + Send;

    /// Fetch the profile snapshot for `user`.
    fn profile(
        &self,
        user: &UserIdentity,
    ) -> impl Future<Output = Result<UserProfile, GatewayError>> + Send;

    /// Record an interaction for `user`. The response body is not consumed.
    fn track(
        &self,
        user: &UserIdentity,
        record: &TrackingRecord,
    ) -> impl Future<Output = Result<(), GatewayError>> + Send;
}
