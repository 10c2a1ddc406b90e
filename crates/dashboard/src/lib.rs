//! Product recommender operator dashboard.
//!
//! Drives one dashboard session against a remote recommender API: selects the
//! user identity, reads the catalog, recommendations and profile for it, and
//! reports interactions back.
//!
//! # Modules
//!
//! - [`config`]: environment configuration
//! - [`gateway`]: the remote API seam and its HTTP client
//! - [`session`]: session state, refresh rules and the task running them
//! - [`console`]: operator command parsing and text rendering

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod console;
pub mod error;
pub mod gateway;
pub mod session;
