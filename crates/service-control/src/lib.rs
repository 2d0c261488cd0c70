#![doc = include_str!("../README.md")]
//!
//! # Module Structure
//!
//! - [`error`]: Domain error types (`ControlError`, `ProbeSampleError`)
//! - [`config`]: Controller and prober configuration (`ControllerConfig`, builder)
//! - [`runtime`]: Container engine abstraction (`ServiceRuntime` trait, `DockerRuntime`)
//! - [`controller`]: Idempotent lifecycle operations (`ServiceController`)
//! - [`readiness`]: Bounded readiness polling (`ReadinessProber`, `ReadinessCheck`)
//!
//! # Architecture
//!
//! ```text
//! Scenario step
//!     |
//!     +--> ServiceController.stop/start/restart --> ServiceRuntime
//!     |
//!     +--> ReadinessProber.wait_until --+--> ServiceRuntime.logs
//!                                       +--> HTTP health / status document
//! ```

pub mod config;
pub mod controller;
pub mod error;
pub mod readiness;
pub mod runtime;

// --- Public API Re-exports ---

// Controller
pub use controller::ServiceController;

// Configuration
pub use config::{ControllerConfig, ControllerConfigBuilder, ProberConfig};

// Error
pub use error::{ControlError, ProbeSampleError};

// Readiness
pub use readiness::{ProbeOutcome, ReadinessCheck, ReadinessProber};

// Runtime
pub use runtime::{DockerRuntime, ExecOutput, ServiceRuntime, validate_service_name};
