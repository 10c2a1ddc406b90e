//! In-process recommender API that records every call.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use recommender_core::{
    InteractionKind, Product, Recommendation, TrackingRecord, UserIdentity, UserProfile,
};
use recommender_dashboard::gateway::{GatewayError, RecommenderApi};
use tokio::time::Instant;

/// The four remote endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Products,
    Recommendations,
    Profile,
    Track,
}

/// A call received by the fake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    ListProducts,
    Recommendations { user: String, count: u32 },
    Profile { user: String },
    Track {
        user: String,
        product_id: String,
        kind: InteractionKind,
    },
}

impl Call {
    /// The identity the call was made for, if any.
    #[must_use]
    pub fn user(&self) -> Option<&str> {
        match self {
            Self::ListProducts => None,
            Self::Recommendations { user, .. } | Self::Profile { user } | Self::Track { user, .. } => {
                Some(user)
            }
        }
    }
}

/// A call and the (tokio) instant it arrived.
#[derive(Debug, Clone)]
pub struct CallRecord {
    pub call: Call,
    pub at: Instant,
}

/// Fake [`RecommenderApi`] with scripted responses.
///
/// Profiles are aggregated from the interactions the fake has been sent, so
/// a refresh after tracking observes the new counts. Clones share state.
#[derive(Clone, Default)]
pub struct RecordingGateway {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Default)]
struct Inner {
    calls: Vec<CallRecord>,
    catalog: Vec<Product>,
    recommendations: HashMap<String, Vec<Recommendation>>,
    interactions: HashMap<String, Vec<TrackingRecord>>,
    failing: HashSet<Endpoint>,
    panicking: HashSet<Endpoint>,
    delays: HashMap<String, Duration>,
}

impl RecordingGateway {
    /// Fake serving `catalog`, with no recommendations for anyone.
    #[must_use]
    pub fn new(catalog: Vec<Product>) -> Self {
        let gateway = Self::default();
        gateway.lock().catalog = catalog;
        gateway
    }

    /// Serve `recommendations` to `user`.
    pub fn set_recommendations(&self, user: &str, recommendations: Vec<Recommendation>) {
        self.lock()
            .recommendations
            .insert(user.to_string(), recommendations);
    }

    /// Delay recommendation and profile responses for `user`.
    pub fn set_delay(&self, user: &str, delay: Duration) {
        self.lock().delays.insert(user.to_string(), delay);
    }

    /// Answer calls to `endpoint` with an error until [`recover`](Self::recover).
    pub fn fail(&self, endpoint: Endpoint) {
        self.lock().failing.insert(endpoint);
    }

    pub fn recover(&self, endpoint: Endpoint) {
        let mut inner = self.lock();
        inner.failing.remove(&endpoint);
        inner.panicking.remove(&endpoint);
    }

    /// Panic inside calls to `endpoint` until [`recover`](Self::recover).
    pub fn panic_on(&self, endpoint: Endpoint) {
        self.lock().panicking.insert(endpoint);
    }

    /// Every call received so far, in arrival order.
    #[must_use]
    pub fn calls(&self) -> Vec<CallRecord> {
        self.lock().calls.clone()
    }

    /// Number of received calls matching `predicate`.
    #[must_use]
    pub fn count(&self, predicate: impl Fn(&Call) -> bool) -> usize {
        self.lock().calls.iter().filter(|r| predicate(&r.call)).count()
    }

    /// Recommendation fetches received for `user`.
    #[must_use]
    pub fn recommendation_fetches(&self, user: &str) -> usize {
        self.count(|call| matches!(call, Call::Recommendations { user: u, .. } if u == user))
    }

    /// Profile fetches received for `user`.
    #[must_use]
    pub fn profile_fetches(&self, user: &str) -> usize {
        self.count(|call| matches!(call, Call::Profile { user: u } if u == user))
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record `call` and return the response delay for it.
    fn record(&self, call: Call) -> Duration {
        let mut inner = self.lock();
        let delay = call
            .user()
            .filter(|_| matches!(call, Call::Recommendations { .. } | Call::Profile { .. }))
            .and_then(|user| inner.delays.get(user).copied())
            .unwrap_or_default();
        inner.calls.push(CallRecord {
            call,
            at: Instant::now(),
        });
        delay
    }

    fn check(&self, endpoint: Endpoint) -> Result<(), GatewayError> {
        let panicking = self.lock().panicking.contains(&endpoint);
        assert!(!panicking, "{endpoint:?} handler crashed");
        if self.lock().failing.contains(&endpoint) {
            return Err(GatewayError::Api {
                status: 503,
                message: format!("{endpoint:?} unavailable"),
            });
        }
        Ok(())
    }
}

impl Inner {
    fn profile(&self, user: &str) -> UserProfile {
        let interactions = self.interactions.get(user).map_or(&[][..], Vec::as_slice);
        let mut profile = UserProfile {
            user_id: user.to_string(),
            viewed_count: 0,
            purchase_count: 0,
            favorite_categories: BTreeMap::new(),
            viewed_products: Vec::new(),
            purchased_products: Vec::new(),
        };

        for record in interactions {
            let product = self.catalog.iter().find(|p| p.id == record.product_id);
            let name = product.map_or_else(|| record.product_id.to_string(), |p| p.name.clone());
            match record.kind {
                InteractionKind::View => {
                    profile.viewed_count += 1;
                    profile.viewed_products.push(name);
                }
                InteractionKind::Purchase => {
                    profile.purchase_count += 1;
                    profile.purchased_products.push(name);
                }
            }
            if let Some(product) = product {
                *profile
                    .favorite_categories
                    .entry(product.category.clone())
                    .or_default() += 1;
            }
        }
        profile
    }
}

async fn pause(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

impl RecommenderApi for RecordingGateway {
    async fn list_products(&self) -> Result<Vec<Product>, GatewayError> {
        self.record(Call::ListProducts);
        self.check(Endpoint::Products)?;
        Ok(self.lock().catalog.clone())
    }

    async fn recommendations(
        &self,
        user: &UserIdentity,
        count: u32,
    ) -> Result<Vec<Recommendation>, GatewayError> {
        let delay = self.record(Call::Recommendations {
            user: user.to_string(),
            count,
        });
        pause(delay).await;
        self.check(Endpoint::Recommendations)?;

        let inner = self.lock();
        let recommendations = inner
            .recommendations
            .get(user.as_str())
            .map(|recs| {
                recs.iter()
                    .take(usize::try_from(count).unwrap_or(usize::MAX))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Ok(recommendations)
    }

    async fn profile(&self, user: &UserIdentity) -> Result<UserProfile, GatewayError> {
        let delay = self.record(Call::Profile {
            user: user.to_string(),
        });
        pause(delay).await;
        self.check(Endpoint::Profile)?;
        Ok(self.lock().profile(user.as_str()))
    }

    async fn track(&self, user: &UserIdentity, record: &TrackingRecord) -> Result<(), GatewayError> {
        self.record(Call::Track {
            user: user.to_string(),
            product_id: record.product_id.to_string(),
            kind: record.kind,
        });
        self.check(Endpoint::Track)?;
        self.lock()
            .interactions
            .entry(user.to_string())
            .or_default()
            .push(record.clone());
        Ok(())
    }
}
