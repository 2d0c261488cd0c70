#![doc = include_str!("../README.md")]
//!
//! # Module Structure
//!
//! - [`error`]: Sample error type (`SampleError`)
//! - [`source`]: Pipeline query API access (`EventSource` trait, `HttpEventSource`)
//! - [`oracle`]: Deadline-bounded visibility polling (`EventOracle`)
//! - [`structural`]: Field-level comparison of observed events (`StructuralCheck`)
//!
//! # Architecture
//!
//! ```text
//! Scenario step
//!     |
//!     +--> EventOracle.await_expected ------+
//!     +--> EventOracle.count_matches -------+--> EventSource --> GET /wallet/{address}/transactions
//!     +--> EventOracle.await_last_received -+                --> GET /internal/last-received
//!     |
//!     +--> StructuralCheck.verify(event)
//! ```

pub mod error;
pub mod oracle;
pub mod source;
pub mod structural;

// --- Public API Re-exports ---

// Oracle
pub use oracle::EventOracle;

// Error
pub use error::SampleError;

// Source
pub use source::{EventSource, HttpEventSource};

// Structural
pub use structural::StructuralCheck;
