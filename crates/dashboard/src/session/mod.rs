//! Dashboard session: state holder, refresh rules and the task that runs them.
//!
//! # Architecture
//!
//! - [`state`]: synchronous reducer owning all session state
//! - [`runtime`]: the session task executing the reducer's effects against a
//!   [`RecommenderApi`](crate::gateway::RecommenderApi)
//!
//! All state mutation happens on the session task. Fetches run as spawned
//! tasks whose completions are fed back to it in arrival order; every change
//! is published as a [`SessionSnapshot`].
//!
//! # Example
//!
//! ```rust,ignore
//! use recommender_dashboard::session::{Session, SessionSettings};
//!
//! let session = Session::spawn(client, SessionSettings::default(), Some(user));
//! let handle = session.handle();
//!
//! handle.track_interaction("P001".into(), InteractionKind::Purchase).await?;
//! let mut updates = handle.subscribe();
//! updates.changed().await?;
//!
//! session.shutdown().await?;
//! ```

pub mod runtime;
pub mod state;

use recommender_core::{Product, Recommendation, UserIdentity, UserProfile, ViewSelector};
use thiserror::Error;

pub use runtime::{Session, SessionHandle};
pub use state::{Command, Effect, Event, SessionSettings, SessionState, Ticket};

/// Errors that can occur when driving a session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The session task has ended.
    #[error("session closed")]
    Closed,

    /// The session task panicked or was cancelled.
    #[error("session task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Remote resources the session reads or writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Resource {
    Catalog,
    Recommendations,
    Profile,
    Tracking,
}

impl std::fmt::Display for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Catalog => write!(f, "catalog"),
            Self::Recommendations => write!(f, "recommendations"),
            Self::Profile => write!(f, "profile"),
            Self::Tracking => write!(f, "tracking"),
        }
    }
}

/// Most recent failed call for a resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchFailure {
    pub resource: Resource,
    pub message: String,
}

/// Point-in-time copy of session state, as published to views.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    /// Current identity; `None` when cleared.
    pub identity: Option<UserIdentity>,
    /// Identity generation the snapshot belongs to.
    pub generation: u64,
    /// Active view.
    pub view: ViewSelector,
    /// Catalog, in API order.
    pub catalog: Vec<Product>,
    /// Recommendations, in rank order.
    pub recommendations: Vec<Recommendation>,
    /// Profile of the current identity, once loaded.
    pub profile: Option<UserProfile>,
    /// True while a recommendation fetch is outstanding.
    pub loading: bool,
    /// Unresolved failures, at most one per resource.
    pub failures: Vec<FetchFailure>,
}

impl SessionSnapshot {
    /// Failure message for `resource`, if its last call failed.
    #[must_use]
    pub fn failure(&self, resource: Resource) -> Option<&str> {
        self.failures
            .iter()
            .find(|f| f.resource == resource)
            .map(|f| f.message.as_str())
    }
}
