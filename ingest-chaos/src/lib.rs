//! ingest-chaos harness library.
//!
//! This library exposes the scenario engine for integration testing.
//! In production, `ingest-chaos` is used as a binary (main.rs).
//!
//! # Module Structure
//!
//! - [`harness`]: Component bundle shared by every scenario
//! - [`scenario`]: The chaos scenarios
//! - [`runner`]: Session fixture + setup + scenarios -> [`report::RunReport`]
//! - [`fixture`]: Session-wide cleanup before the first scenario
//! - [`assertions`]: Delivery invariants over oracle outcomes
//! - [`process`]: Guard for auxiliary pipeline processes
//! - [`report`]: Run report and exit codes
//! - [`cli`], [`logging`]: Entrypoint plumbing

pub mod assertions;
pub mod cli;
pub mod fixture;
pub mod harness;
pub mod logging;
pub mod process;
pub mod report;
pub mod runner;
pub mod scenario;

use std::sync::Arc;

use ingest_chaos_chain_driver::{AnyDriver, DriverConfig};
use ingest_chaos_core::config::{HarnessConfig, ScenarioKind};
use ingest_chaos_core::error::HarnessError;
use ingest_chaos_event_oracle::HttpEventSource;
use ingest_chaos_service_control::{ControllerConfig, DockerRuntime};

use crate::harness::Harness;
use crate::report::RunReport;
use crate::runner::Runner;

/// Harness wired to the real environment.
pub type LiveHarness = Harness<DockerRuntime, AnyDriver, HttpEventSource>;

/// Builds the production collaborators from `config`.
pub fn live_harness(config: HarnessConfig) -> Result<LiveHarness, HarnessError> {
    let runtime = Arc::new(DockerRuntime::connect(ControllerConfig::from_core(
        &config.services,
    ))?);
    let driver = AnyDriver::from_config(DriverConfig::from_core(&config))?;
    let source = Arc::new(HttpEventSource::new(
        &config.endpoints.api_url,
        config.endpoints.request_timeout(),
    )?);
    Harness::new(config, runtime, driver, source)
}

/// Runs `scenarios` against the real environment.
pub async fn run_live(
    config: HarnessConfig,
    scenarios: &[ScenarioKind],
) -> Result<RunReport, HarnessError> {
    let harness = live_harness(config)?;
    Ok(Runner::new(harness).run(scenarios).await)
}
