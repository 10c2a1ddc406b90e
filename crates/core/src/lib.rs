//! Recommender Core - Shared domain types.
//!
//! This crate provides the types exchanged between the dashboard session and
//! the remote recommender API:
//! - products and the catalog they form
//! - ranked recommendations with their explanations
//! - behavioral profile snapshots
//! - interaction events and the local view selector
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no HTTP clients, no async
//! runtime. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers and wire-compatible domain structs

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
