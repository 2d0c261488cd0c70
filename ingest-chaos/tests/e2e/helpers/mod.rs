//! Shared E2E test helpers.
//!
//! Provides the simulated pipeline world (fake runtime, fake chain, fake
//! query API) and a fast configuration wired to it.

pub mod api;
pub mod config;
pub mod world;
