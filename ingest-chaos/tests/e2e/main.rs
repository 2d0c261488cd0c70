//! E2E tests for the ingest-chaos scenario engine.
//!
//! Every scenario runs against a simulated pipeline: a healthy one must pass,
//! a lossy or duplicating one must fail naming the offending identifiers.
//!
//! # Test Structure
//!
//! - `helpers/` -- Simulated world, fake query API, fast config
//! - `scenarios/` -- Test files organized by scenario
//!
//! # Running
//!
//! ```bash
//! cargo test -p ingest-chaos --test e2e
//! ```

mod helpers;
mod scenarios;
