//! HTTP client for the recommender API.

use std::sync::Arc;

use recommender_core::{Product, Recommendation, TrackingRecord, UserIdentity, UserProfile};
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::config::ApiConfig;

use super::{GatewayError, RecommenderApi};

/// Longest response body excerpt kept in errors and logs.
const BODY_EXCERPT_CHARS: usize = 500;

/// Recommender API client.
///
/// Cheaply cloneable; clones share the underlying connection pool.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a new API client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &ApiConfig) -> Result<Self, GatewayError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                client,
                base_url: config.base_url.clone(),
            }),
        })
    }

    /// The configured API base URL.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// Build an endpoint URL by appending percent-encoded path segments to the base.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, GatewayError> {
        let mut url = self.inner.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| GatewayError::InvalidUrl(self.inner.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Send a GET request and return the body of a successful response.
    async fn get_text(&self, url: Url) -> Result<String, GatewayError> {
        let response = self.inner.client.get(url).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            warn!(
                status = %status,
                body = %excerpt(&body),
                "Recommender API returned non-success status"
            );
            return Err(GatewayError::Api {
                status: status.as_u16(),
                message: excerpt(&body),
            });
        }

        Ok(body)
    }

    /// Send a GET request and decode the JSON body.
    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, GatewayError> {
        let body = self.get_text(url).await?;
        decode(&body)
    }
}

impl RecommenderApi for ApiClient {
    #[instrument(skip(self))]
    async fn list_products(&self) -> Result<Vec<Product>, GatewayError> {
        let url = self.endpoint(&["products"])?;
        let products: Vec<Product> = self.get_json(url).await?;
        debug!(count = products.len(), "Fetched catalog");
        Ok(products)
    }

    #[instrument(skip(self, user), fields(user = %user))]
    async fn recommendations(
        &self,
        user: &UserIdentity,
        count: u32,
    ) -> Result<Vec<Recommendation>, GatewayError> {
        let mut url = self.endpoint(&["recommendations", user.as_str()])?;
        url.query_pairs_mut().append_pair("count", &count.to_string());

        let body: serde_json::Value = self.get_json(url).await?;
        let recommendations = extract_recommendations(body);
        debug!(count = recommendations.len(), "Fetched recommendations");
        Ok(recommendations)
    }

    #[instrument(skip(self, user), fields(user = %user))]
    async fn profile(&self, user: &UserIdentity) -> Result<UserProfile, GatewayError> {
        let url = self.endpoint(&["user", user.as_str(), "profile"])?;
        self.get_json(url).await
    }

    #[instrument(
        skip(self, user, record),
        fields(user = %user, product = %record.product_id, kind = %record.kind)
    )]
    async fn track(&self, user: &UserIdentity, record: &TrackingRecord) -> Result<(), GatewayError> {
        let url = self.endpoint(&["user", user.as_str(), "track"])?;

        let response = self.inner.client.post(url).json(record).send().await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(GatewayError::Api {
                status: status.as_u16(),
                message: excerpt(&message),
            });
        }

        Ok(())
    }
}

// =============================================================================
// Decoding
// =============================================================================

/// Decode a JSON body, logging an excerpt of anything that fails to parse.
fn decode<T: DeserializeOwned>(body: &str) -> Result<T, GatewayError> {
    serde_json::from_str(body).map_err(|e| {
        warn!(
            error = %e,
            body = %excerpt(body),
            "Failed to parse recommender API response"
        );
        GatewayError::Malformed(e.to_string())
    })
}

/// Pull the ranked list out of a recommendations response.
///
/// A missing or malformed `recommendations` field yields an empty list.
fn extract_recommendations(mut body: serde_json::Value) -> Vec<Recommendation> {
    let Some(field) = body.get_mut("recommendations").map(serde_json::Value::take) else {
        debug!("Recommendations response has no recommendations field");
        return Vec::new();
    };

    serde_json::from_value(field).unwrap_or_else(|e| {
        warn!(error = %e, "Malformed recommendations field, treating as empty");
        Vec::new()
    })
}

fn excerpt(body: &str) -> String {
    body.chars().take(BODY_EXCERPT_CHARS).collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn client(base: &str) -> ApiClient {
        ApiClient::new(&ApiConfig::new(base).unwrap()).unwrap()
    }

    fn product_json(id: &str) -> serde_json::Value {
        json!({"id": id, "name": "Phone Case", "category": "Accessories", "price": 24.99, "tags": ["mobile"]})
    }

    #[test]
    fn test_endpoint_appends_to_base_path() {
        let c = client("http://localhost:5000/api");
        assert_eq!(
            c.endpoint(&["products"]).unwrap().as_str(),
            "http://localhost:5000/api/products"
        );

        // Trailing slash on the base does not double up
        let c = client("http://localhost:5000/api/");
        assert_eq!(
            c.endpoint(&["user", "user_001", "profile"]).unwrap().as_str(),
            "http://localhost:5000/api/user/user_001/profile"
        );
    }

    #[test]
    fn test_endpoint_percent_encodes_identity() {
        let c = client("http://localhost:5000/api");
        let url = c.endpoint(&["user", "a/b c", "track"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:5000/api/user/a%2Fb%20c/track");
    }

    #[test]
    fn test_extract_recommendations_preserves_order() {
        let body = json!({
            "user_id": "user_001",
            "recommendations": [
                {"product": product_json("P003"), "explanation": "first"},
                {"product": product_json("P001"), "explanation": "second"}
            ],
            "count": 2
        });
        let recs = extract_recommendations(body);
        let ids: Vec<&str> = recs.iter().map(|r| r.product.id.as_str()).collect();
        assert_eq!(ids, vec!["P003", "P001"]);
    }

    #[test]
    fn test_extract_recommendations_missing_field() {
        assert!(extract_recommendations(json!({})).is_empty());
        assert!(extract_recommendations(json!([1, 2, 3])).is_empty());
    }

    #[test]
    fn test_extract_recommendations_malformed_field() {
        assert!(extract_recommendations(json!({"recommendations": "soon"})).is_empty());
        assert!(extract_recommendations(json!({"recommendations": null})).is_empty());
        assert!(extract_recommendations(json!({"recommendations": [{"explanation": "no product"}]})).is_empty());
    }

    #[test]
    fn test_decode_rejects_non_json() {
        let err = decode::<Vec<Product>>("<html>502 Bad Gateway</html>").unwrap_err();
        assert!(matches!(err, GatewayError::Malformed(_)));
    }

    #[test]
    fn test_excerpt_truncates() {
        let long = "x".repeat(BODY_EXCERPT_CHARS * 2);
        assert_eq!(excerpt(&long).len(), BODY_EXCERPT_CHARS);
    }
}
