//! Session state and the refresh rules that couple it to remote fetches.
//!
//! [`SessionState`] is a synchronous reducer: every [`Event`] mutates state
//! and returns the [`Effect`]s the runtime must perform. No I/O happens here,
//! which keeps every ordering rule testable without a runtime.
//!
//! # Refresh rules
//!
//! - Identity change: a reaction declared over the identity cell issues a
//!   recommendations fetch and a profile fetch whenever the identity settles on
//!   a new non-empty value. It runs after every event, so an identity change
//!   from any entry point triggers it exactly once.
//! - Interaction: the tracking record is submitted immediately and a refresh
//!   is scheduled after the configured delay. Each interaction schedules its
//!   own refresh.
//!
//! Every identity change bumps the generation. Requests and scheduled
//! refreshes carry the generation they were issued under; completions from an
//! older generation are discarded.

use std::time::Duration;

use recommender_core::{
    InteractionKind, Product, ProductId, Recommendation, TrackingRecord, UserIdentity,
    UserProfile, ViewSelector,
};
use tracing::{debug, warn};

use super::{FetchFailure, Resource, SessionSnapshot};

/// Session constants.
///
/// [`Default`] holds the values the dashboard runs with; other values exist
/// for library callers and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    /// Recommendations requested per fetch.
    pub recommendation_count: u32,
    /// Delay between recording an interaction and re-reading derived views.
    pub refresh_delay: Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            recommendation_count: 4,
            refresh_delay: Duration::from_millis(500),
        }
    }
}

/// Identity and generation a request was issued under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    pub user: UserIdentity,
    pub generation: u64,
}

/// Operator-initiated state changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Replace the identity; `None` clears it and suppresses dependent fetches.
    SetIdentity(Option<UserIdentity>),
    /// Switch the active view.
    SetView(ViewSelector),
    /// Report an interaction for the current identity.
    TrackInteraction {
        product_id: ProductId,
        kind: InteractionKind,
    },
}

/// Everything the reducer reacts to.
#[derive(Debug)]
pub enum Event {
    Command(Command),
    CatalogLoaded(Result<Vec<Product>, String>),
    RecommendationsLoaded {
        ticket: Ticket,
        result: Result<Vec<Recommendation>, String>,
    },
    ProfileLoaded {
        ticket: Ticket,
        result: Result<UserProfile, String>,
    },
    TrackingCompleted {
        ticket: Ticket,
        result: Result<(), String>,
    },
    /// A delayed refresh scheduled under `generation` fired.
    RefreshDue { generation: u64 },
}

/// Work the runtime performs on behalf of the reducer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    FetchCatalog,
    FetchRecommendations { ticket: Ticket, count: u32 },
    FetchProfile { ticket: Ticket },
    SubmitTracking { ticket: Ticket, record: TrackingRecord },
    ScheduleRefresh { generation: u64, delay: Duration },
    CancelScheduledRefreshes,
}

/// A value with a version bumped on every change.
#[derive(Debug)]
struct Versioned<T> {
    value: T,
    version: u64,
}

impl<T: PartialEq> Versioned<T> {
    const fn new(value: T) -> Self {
        Self { value, version: 0 }
    }

    /// Replace the value; returns whether it changed.
    fn set(&mut self, value: T) -> bool {
        if self.value == value {
            return false;
        }
        self.value = value;
        self.version += 1;
        true
    }
}

/// Failure indicators, one slot per resource.
#[derive(Debug, Default)]
struct Failures {
    catalog: Option<String>,
    recommendations: Option<String>,
    profile: Option<String>,
    tracking: Option<String>,
}

impl Failures {
    fn slot(&mut self, resource: Resource) -> &mut Option<String> {
        match resource {
            Resource::Catalog => &mut self.catalog,
            Resource::Recommendations => &mut self.recommendations,
            Resource::Profile => &mut self.profile,
            Resource::Tracking => &mut self.tracking,
        }
    }

    fn record(&mut self, resource: Resource, message: String) {
        *self.slot(resource) = Some(message);
    }

    fn clear(&mut self, resource: Resource) {
        *self.slot(resource) = None;
    }

    fn to_vec(&self) -> Vec<FetchFailure> {
        [
            (Resource::Catalog, &self.catalog),
            (Resource::Recommendations, &self.recommendations),
            (Resource::Profile, &self.profile),
            (Resource::Tracking, &self.tracking),
        ]
        .into_iter()
        .filter_map(|(resource, message)| {
            message.as_ref().map(|message| FetchFailure {
                resource,
                message: message.clone(),
            })
        })
        .collect()
    }
}

/// The single source of truth for a dashboard session.
#[derive(Debug)]
pub struct SessionState {
    settings: SessionSettings,
    identity: Versioned<Option<UserIdentity>>,
    /// Identity version the identity reaction last ran for.
    reacted_version: Option<u64>,
    catalog: Vec<Product>,
    catalog_requested: bool,
    recommendations: Vec<Recommendation>,
    profile: Option<UserProfile>,
    view: ViewSelector,
    /// Recommendation fetches in flight for the current generation.
    pending_recommendations: usize,
    failures: Failures,
}

impl SessionState {
    /// Create the state for a session starting with `identity`.
    #[must_use]
    pub fn new(settings: SessionSettings, identity: Option<UserIdentity>) -> Self {
        Self {
            settings,
            identity: Versioned::new(identity),
            reacted_version: None,
            catalog: Vec::new(),
            catalog_requested: false,
            recommendations: Vec::new(),
            profile: None,
            view: ViewSelector::default(),
            pending_recommendations: 0,
            failures: Failures::default(),
        }
    }

    /// Session start: load the catalog once and run the initial reactions.
    pub fn start(&mut self) -> Vec<Effect> {
        let mut effects = Vec::new();
        if !self.catalog_requested {
            self.catalog_requested = true;
            effects.push(Effect::FetchCatalog);
        }
        self.react(&mut effects);
        effects
    }

    /// Apply an event and return the effects it causes.
    pub fn apply(&mut self, event: Event) -> Vec<Effect> {
        let mut effects = Vec::new();

        match event {
            Event::Command(command) => self.apply_command(command, &mut effects),
            Event::CatalogLoaded(result) => self.on_catalog(result),
            Event::RecommendationsLoaded { ticket, result } => {
                self.on_recommendations(&ticket, result);
            }
            Event::ProfileLoaded { ticket, result } => self.on_profile(&ticket, result),
            Event::TrackingCompleted { ticket, result } => self.on_tracking(&ticket, result),
            Event::RefreshDue { generation } => {
                if generation == self.generation() {
                    self.refresh(&mut effects);
                } else {
                    debug!(generation, current = self.generation(), "Dropping stale scheduled refresh");
                }
            }
        }

        self.react(&mut effects);
        effects
    }

    fn apply_command(&mut self, command: Command, effects: &mut Vec<Effect>) {
        match command {
            Command::SetIdentity(identity) => {
                self.identity.set(identity);
            }
            Command::SetView(view) => self.view = view,
            Command::TrackInteraction { product_id, kind } => {
                let Some(ticket) = self.ticket() else {
                    warn!(product = %product_id, %kind, "Ignoring interaction without a user identity");
                    return;
                };
                let generation = ticket.generation;
                effects.push(Effect::SubmitTracking {
                    ticket,
                    record: TrackingRecord::new(product_id, kind),
                });
                effects.push(Effect::ScheduleRefresh {
                    generation,
                    delay: self.settings.refresh_delay,
                });
            }
        }
    }

    /// Reactions declared over versioned state; run after every event.
    fn react(&mut self, effects: &mut Vec<Effect>) {
        let version = self.identity.version;
        if self.reacted_version == Some(version) {
            return;
        }
        let first_run = self.reacted_version.is_none();
        self.reacted_version = Some(version);

        if !first_run {
            // Everything derived from the previous identity is void
            effects.push(Effect::CancelScheduledRefreshes);
            self.recommendations.clear();
            self.profile = None;
            self.pending_recommendations = 0;
            self.failures.clear(Resource::Recommendations);
            self.failures.clear(Resource::Profile);
            self.failures.clear(Resource::Tracking);
        }

        self.refresh(effects);
    }

    /// Issue a recommendations fetch and a profile fetch for the current identity.
    fn refresh(&mut self, effects: &mut Vec<Effect>) {
        let Some(ticket) = self.ticket() else {
            debug!("No user identity, skipping refresh");
            return;
        };
        self.pending_recommendations += 1;
        effects.push(Effect::FetchRecommendations {
            ticket: ticket.clone(),
            count: self.settings.recommendation_count,
        });
        effects.push(Effect::FetchProfile { ticket });
    }

    fn on_catalog(&mut self, result: Result<Vec<Product>, String>) {
        match result {
            Ok(products) => {
                self.catalog = products;
                self.failures.clear(Resource::Catalog);
            }
            Err(message) => self.failures.record(Resource::Catalog, message),
        }
    }

    fn on_recommendations(&mut self, ticket: &Ticket, result: Result<Vec<Recommendation>, String>) {
        if !self.is_current(ticket) {
            debug!(user = %ticket.user, generation = ticket.generation, "Discarding stale recommendations");
            return;
        }
        self.pending_recommendations = self.pending_recommendations.saturating_sub(1);

        match result {
            Ok(recommendations) => {
                self.recommendations = recommendations;
                self.failures.clear(Resource::Recommendations);
            }
            Err(message) => self.failures.record(Resource::Recommendations, message),
        }
    }

    fn on_profile(&mut self, ticket: &Ticket, result: Result<UserProfile, String>) {
        if !self.is_current(ticket) {
            debug!(user = %ticket.user, generation = ticket.generation, "Discarding stale profile");
            return;
        }

        match result {
            Ok(profile) => {
                self.profile = Some(profile);
                self.failures.clear(Resource::Profile);
            }
            Err(message) => self.failures.record(Resource::Profile, message),
        }
    }

    fn on_tracking(&mut self, ticket: &Ticket, result: Result<(), String>) {
        if !self.is_current(ticket) {
            return;
        }
        match result {
            Ok(()) => self.failures.clear(Resource::Tracking),
            Err(message) => self.failures.record(Resource::Tracking, message),
        }
    }

    fn ticket(&self) -> Option<Ticket> {
        self.identity.value.as_ref().map(|user| Ticket {
            user: user.clone(),
            generation: self.generation(),
        })
    }

    fn is_current(&self, ticket: &Ticket) -> bool {
        ticket.generation == self.generation()
    }

    /// Current identity generation.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.identity.version
    }

    /// Current identity, if any.
    #[must_use]
    pub const fn identity(&self) -> Option<&UserIdentity> {
        self.identity.value.as_ref()
    }

    /// Whether a recommendation fetch for the current identity is outstanding.
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        self.pending_recommendations > 0
    }

    /// Loaded catalog, in API order.
    #[must_use]
    pub fn catalog(&self) -> &[Product] {
        &self.catalog
    }

    /// Current recommendations, in rank order.
    #[must_use]
    pub fn recommendations(&self) -> &[Recommendation] {
        &self.recommendations
    }

    /// Current profile snapshot.
    #[must_use]
    pub const fn profile(&self) -> Option<&UserProfile> {
        self.profile.as_ref()
    }

    /// Active view.
    #[must_use]
    pub const fn view(&self) -> ViewSelector {
        self.view
    }

    /// Owned copy of everything a view needs.
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            identity: self.identity.value.clone(),
            generation: self.generation(),
            view: self.view,
            catalog: self.catalog.clone(),
            recommendations: self.recommendations.clone(),
            profile: self.profile.clone(),
            loading: self.is_loading(),
            failures: self.failures.to_vec(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeMap;

    use recommender_core::Price;

    use super::*;

    fn user(id: &str) -> UserIdentity {
        UserIdentity::parse(id).unwrap()
    }

    fn product(id: &str) -> Product {
        Product {
            id: ProductId::new(id),
            name: format!("Product {id}"),
            price: Price::from_cents(999),
            category: "Electronics".to_string(),
            tags: ["portable".to_string()].into(),
        }
    }

    fn recommendation(id: &str) -> Recommendation {
        Recommendation {
            product: product(id),
            explanation: format!("Because {id}"),
            generated_at: None,
        }
    }

    fn profile(user_id: &str, viewed: u64) -> UserProfile {
        UserProfile {
            user_id: user_id.to_string(),
            viewed_count: viewed,
            purchase_count: 0,
            favorite_categories: BTreeMap::new(),
            viewed_products: vec![],
            purchased_products: vec![],
        }
    }

    fn started(identity: &str) -> (SessionState, Vec<Effect>) {
        let mut state = SessionState::new(SessionSettings::default(), Some(user(identity)));
        let effects = state.start();
        (state, effects)
    }

    fn ticket(effects: &[Effect]) -> Ticket {
        effects
            .iter()
            .find_map(|e| match e {
                Effect::FetchRecommendations { ticket, .. } => Some(ticket.clone()),
                _ => None,
            })
            .unwrap()
    }

    fn set_identity(state: &mut SessionState, id: Option<&str>) -> Vec<Effect> {
        state.apply(Event::Command(Command::SetIdentity(id.map(user))))
    }

    #[test]
    fn test_start_fetches_catalog_and_identity_views() {
        let (state, effects) = started("user_001");
        let t = Ticket {
            user: user("user_001"),
            generation: 0,
        };
        assert_eq!(
            effects,
            vec![
                Effect::FetchCatalog,
                Effect::FetchRecommendations {
                    ticket: t.clone(),
                    count: 4
                },
                Effect::FetchProfile { ticket: t },
            ]
        );
        assert!(state.is_loading());
    }

    #[test]
    fn test_start_is_idempotent() {
        let (mut state, _) = started("user_001");
        assert!(state.start().is_empty());
    }

    #[test]
    fn test_start_without_identity_only_fetches_catalog() {
        let mut state = SessionState::new(SessionSettings::default(), None);
        assert_eq!(state.start(), vec![Effect::FetchCatalog]);
        assert!(!state.is_loading());
    }

    #[test]
    fn test_identity_change_refetches_for_new_identity() {
        let (mut state, _) = started("user_001");
        let effects = set_identity(&mut state, Some("user_9999"));

        let t = Ticket {
            user: user("user_9999"),
            generation: 1,
        };
        assert_eq!(
            effects,
            vec![
                Effect::CancelScheduledRefreshes,
                Effect::FetchRecommendations {
                    ticket: t.clone(),
                    count: 4
                },
                Effect::FetchProfile { ticket: t },
            ]
        );
    }

    #[test]
    fn test_same_identity_is_not_a_change() {
        let (mut state, _) = started("user_001");
        assert!(set_identity(&mut state, Some("user_001")).is_empty());
        assert_eq!(state.generation(), 0);
    }

    #[test]
    fn test_clearing_identity_suppresses_fetches_and_resets_views() {
        let (mut state, effects) = started("user_001");
        let t = ticket(&effects);
        state.apply(Event::ProfileLoaded {
            ticket: t,
            result: Ok(profile("user_001", 3)),
        });
        assert!(state.profile().is_some());

        let effects = set_identity(&mut state, None);
        assert_eq!(effects, vec![Effect::CancelScheduledRefreshes]);
        assert!(state.profile().is_none());
        assert!(state.recommendations().is_empty());
        assert!(!state.is_loading());
    }

    #[test]
    fn test_view_change_has_no_effects() {
        let (mut state, _) = started("user_001");
        for view in ViewSelector::ALL {
            let effects = state.apply(Event::Command(Command::SetView(view)));
            assert!(effects.is_empty());
            assert_eq!(state.view(), view);
        }
        // Loading flag untouched by view switches
        assert!(state.is_loading());
    }

    #[test]
    fn test_loading_flag_brackets_fetch_on_success_and_failure() {
        let (mut state, effects) = started("user_001");
        let t = ticket(&effects);
        assert!(state.is_loading());

        state.apply(Event::RecommendationsLoaded {
            ticket: t.clone(),
            result: Ok(vec![recommendation("P1")]),
        });
        assert!(!state.is_loading());

        let effects = state.apply(Event::RefreshDue { generation: 0 });
        assert!(state.is_loading());
        state.apply(Event::RecommendationsLoaded {
            ticket: ticket(&effects),
            result: Err("connection refused".to_string()),
        });
        assert!(!state.is_loading());
        // Failure keeps the previous list
        assert_eq!(state.recommendations().len(), 1);
    }

    #[test]
    fn test_overlapping_fetches_keep_loading_until_last_completes() {
        let (mut state, effects) = started("user_001");
        let first = ticket(&effects);
        let second = ticket(&state.apply(Event::RefreshDue { generation: 0 }));

        state.apply(Event::RecommendationsLoaded {
            ticket: first,
            result: Ok(vec![]),
        });
        assert!(state.is_loading());
        state.apply(Event::RecommendationsLoaded {
            ticket: second,
            result: Ok(vec![]),
        });
        assert!(!state.is_loading());
    }

    #[test]
    fn test_recommendations_replace_in_rank_order() {
        let (mut state, effects) = started("user_001");
        state.apply(Event::RecommendationsLoaded {
            ticket: ticket(&effects),
            result: Ok(vec![recommendation("P3"), recommendation("P1"), recommendation("P2")]),
        });
        let ids: Vec<&str> = state
            .recommendations()
            .iter()
            .map(|r| r.product.id.as_str())
            .collect();
        assert_eq!(ids, vec!["P3", "P1", "P2"]);
    }

    #[test]
    fn test_profile_replaced_on_success_kept_on_failure() {
        let (mut state, effects) = started("user_001");
        let t = ticket(&effects);

        state.apply(Event::ProfileLoaded {
            ticket: t.clone(),
            result: Ok(profile("user_001", 1)),
        });
        state.apply(Event::ProfileLoaded {
            ticket: t.clone(),
            result: Ok(profile("user_001", 5)),
        });
        assert_eq!(state.profile().unwrap().viewed_count, 5);

        state.apply(Event::ProfileLoaded {
            ticket: t,
            result: Err("HTTP error: timed out".to_string()),
        });
        assert_eq!(state.profile().unwrap().viewed_count, 5);
        let snapshot = state.snapshot();
        assert_eq!(snapshot.failure(Resource::Profile), Some("HTTP error: timed out"));
    }

    #[test]
    fn test_stale_responses_are_discarded() {
        let (mut state, effects) = started("user_001");
        let stale = ticket(&effects);
        let fresh = ticket(&set_identity(&mut state, Some("user_9999")));

        state.apply(Event::RecommendationsLoaded {
            ticket: fresh,
            result: Ok(vec![recommendation("P9")]),
        });
        state.apply(Event::RecommendationsLoaded {
            ticket: stale.clone(),
            result: Ok(vec![recommendation("P1")]),
        });
        state.apply(Event::ProfileLoaded {
            ticket: stale,
            result: Ok(profile("user_001", 7)),
        });

        assert_eq!(state.recommendations().first().map(|r| r.product.id.as_str()), Some("P9"));
        assert!(state.profile().is_none());
        assert!(!state.is_loading());
    }

    #[test]
    fn test_switching_back_to_previous_identity_still_discards_old_generation() {
        let (mut state, effects) = started("user_001");
        let stale = ticket(&effects);
        set_identity(&mut state, Some("user_2"));
        set_identity(&mut state, Some("user_001"));

        state.apply(Event::ProfileLoaded {
            ticket: stale,
            result: Ok(profile("user_001", 1)),
        });
        assert!(state.profile().is_none());
    }

    #[test]
    fn test_track_submits_then_schedules_refresh() {
        let (mut state, _) = started("user_001");
        let effects = state.apply(Event::Command(Command::TrackInteraction {
            product_id: ProductId::new("p42"),
            kind: InteractionKind::Purchase,
        }));
        assert_eq!(
            effects,
            vec![
                Effect::SubmitTracking {
                    ticket: Ticket {
                        user: user("user_001"),
                        generation: 0
                    },
                    record: TrackingRecord::new(ProductId::new("p42"), InteractionKind::Purchase),
                },
                Effect::ScheduleRefresh {
                    generation: 0,
                    delay: Duration::from_millis(500)
                },
            ]
        );
    }

    #[test]
    fn test_track_without_identity_is_ignored() {
        let mut state = SessionState::new(SessionSettings::default(), None);
        state.start();
        let effects = state.apply(Event::Command(Command::TrackInteraction {
            product_id: ProductId::new("P001"),
            kind: InteractionKind::View,
        }));
        assert!(effects.is_empty());
    }

    #[test]
    fn test_stale_scheduled_refresh_is_dropped() {
        let (mut state, _) = started("user_001");
        set_identity(&mut state, Some("user_2"));
        assert!(state.apply(Event::RefreshDue { generation: 0 }).is_empty());
        assert_eq!(state.apply(Event::RefreshDue { generation: 1 }).len(), 2);
    }

    #[test]
    fn test_tracking_failure_is_reported() {
        let (mut state, effects) = started("user_001");
        let t = ticket(&effects);
        state.apply(Event::TrackingCompleted {
            ticket: t.clone(),
            result: Err("API error: 404 - Product not found".to_string()),
        });
        assert!(state.snapshot().failure(Resource::Tracking).is_some());

        state.apply(Event::TrackingCompleted {
            ticket: t,
            result: Ok(()),
        });
        assert!(state.snapshot().failure(Resource::Tracking).is_none());
    }

    #[test]
    fn test_catalog_failure_leaves_catalog_empty() {
        let (mut state, _) = started("user_001");
        let effects = state.apply(Event::CatalogLoaded(Err("connection refused".to_string())));
        assert!(effects.is_empty());
        assert!(state.catalog().is_empty());
        assert_eq!(
            state.snapshot().failure(Resource::Catalog),
            Some("connection refused")
        );
    }

    #[test]
    fn test_catalog_is_identity_independent() {
        let (mut state, _) = started("user_001");
        state.apply(Event::CatalogLoaded(Ok(vec![product("P001"), product("P002")])));
        let effects = set_identity(&mut state, Some("user_2"));
        assert!(!effects.contains(&Effect::FetchCatalog));
        assert_eq!(state.catalog().len(), 2);
    }
}
