//! Meetboard server library.
//!
//! Receives meeting lifecycle webhooks, keeps the current meeting state in a
//! pluggable store, and pushes status snapshots to dashboards over SSE.

// layers
pub mod domain;
pub mod infrastructure;
pub mod ui;
pub mod usecase;

pub mod config;
