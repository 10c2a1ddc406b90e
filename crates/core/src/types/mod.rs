//! Core types for the recommender dashboard.
//!
//! This module provides type-safe wrappers for the domain concepts the
//! dashboard session works with.

pub mod id;
pub mod identity;
pub mod interaction;
pub mod price;
pub mod product;
pub mod profile;
pub mod view;

pub use id::*;
pub use identity::{IdentityError, UserIdentity};
pub use interaction::{InteractionKind, TrackingRecord};
pub use price::Price;
pub use product::{Product, Recommendation};
pub use profile::UserProfile;
pub use view::ViewSelector;
