//! Fast harness configuration and wiring for E2E tests.
//!
//! Intervals are milliseconds, timeouts one second, settle windows zero, so a
//! failing scenario gives up quickly.

use std::sync::Arc;
use std::time::Duration;

use ingest_chaos::harness::Harness;
use ingest_chaos::runner::Runner;
use ingest_chaos_core::config::HarnessConfig;
use ingest_chaos_event_oracle::HttpEventSource;

use super::api::spawn_api;
use super::world::{FakeDriver, FakeRuntime, World};

pub type TestHarness = Harness<FakeRuntime, FakeDriver, HttpEventSource>;

/// Configuration tuned for the simulated world.
pub fn fast_config(api_url: &str) -> HarnessConfig {
    let mut config = HarnessConfig::default();
    config.endpoints.api_url = api_url.to_owned();
    config.endpoints.request_timeout_ms = 500;
    config.services.action_timeout_secs = 1;

    config.readiness.poll_interval_ms = 20;
    config.readiness.poller_timeout_secs = 1;
    config.readiness.api_health_timeout_secs = 1;

    config.oracle.poll_interval_ms = 20;
    config.oracle.visibility_timeout_secs = 1;
    config.oracle.recheck_timeout_secs = 1;

    config.chain.connect_timeout_secs = 1;
    config.chain.connect_interval_ms = 20;

    let scenarios = &mut config.scenarios;
    scenarios.baseline_settle_secs = 0;
    scenarios.chain_down_secs = 0;
    scenarios.reconnect_settle_secs = 0;
    scenarios.bus_down_before_submit_secs = 0;
    scenarios.bus_down_after_submit_secs = 0;
    scenarios.bus_recovery_timeout_secs = 1;
    scenarios.api_restart_settle_secs = 0;
    scenarios.session_settle_secs = 0;

    config.upstream_retry.attempts = 1;
    config.validate().expect("fast config is valid");
    config
}

/// Serves the fake API for `world` and wires a harness to it.
pub async fn harness_for(world: &World) -> TestHarness {
    harness_with(world, |_| {}).await
}

/// Like [`harness_for`], with a config tweak applied before wiring.
pub async fn harness_with(world: &World, tweak: impl FnOnce(&mut HarnessConfig)) -> TestHarness {
    let api_url = spawn_api(world.clone()).await;
    let mut config = fast_config(&api_url);
    tweak(&mut config);
    let source = HttpEventSource::new(&api_url, Duration::from_millis(500)).expect("source");
    Harness::new(
        config,
        Arc::new(FakeRuntime::new(world.clone())),
        FakeDriver::new(world.clone()),
        Arc::new(source),
    )
    .expect("harness")
}

pub async fn runner_for(world: &World) -> Runner<FakeRuntime, FakeDriver, HttpEventSource> {
    Runner::new(harness_for(world).await)
}
