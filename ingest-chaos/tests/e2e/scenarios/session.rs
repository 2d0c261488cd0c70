//! Session fixture and full runs through the runner.

use ingest_chaos::cli::ReportFormat;
use ingest_chaos::fixture::SessionFixture;
use ingest_chaos::report::{self, EXIT_FAILED, EXIT_PASSED, ScenarioStatus};
use ingest_chaos::runner::Runner;
use ingest_chaos_core::config::ScenarioKind;
use ingest_chaos_core::types::ObservedEvent;

use crate::helpers::config::{harness_for, harness_with, runner_for};
use crate::helpers::world::{
    API_SERVICE, BUS_SERVICE, CHAIN_SERVICE, Faults, POLLER_SERVICE, STORE_SERVICE, World,
};

fn leftover() -> ObservedEvent {
    ObservedEvent {
        chain: "ethereum".to_owned(),
        tx_hash: "0xdead".to_owned(),
        event_type: "transfer".to_owned(),
        from: "0x01".to_owned(),
        to: "0x02".to_owned(),
        value: "1".to_owned(),
        ..ObservedEvent::default()
    }
}

// ---------------------------------------------------------------------------
// Session fixture
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_e2e_fixture_truncates_store_and_restarts_services() {
    // Given: A store with events from an earlier run
    let world = World::healthy();
    world.seed(leftover()).await;
    let harness = harness_for(&world).await;

    // When: Running session setup
    let fixture = SessionFixture::new(harness.controller(), harness.config());
    let outcome = fixture.setup().await;

    // Then: Store is empty, poller and api restarted in order
    assert!(outcome.truncated);
    assert_eq!(outcome.restarted, vec![POLLER_SERVICE, API_SERVICE]);
    assert!(outcome.warnings.is_empty());
    assert!(world.stored().await.is_empty());
    assert_eq!(
        world.calls().await,
        vec![
            format!("exec {STORE_SERVICE}"),
            format!("stop {POLLER_SERVICE}"),
            format!("start {POLLER_SERVICE}"),
            format!("stop {API_SERVICE}"),
            format!("start {API_SERVICE}"),
        ]
    );
}

#[tokio::test]
async fn test_e2e_fixture_truncate_failure_is_only_a_warning() {
    // Given: A store whose truncate command fails
    let world = World::with_faults(Faults {
        failing_truncate: true,
        ..Faults::default()
    });
    world.seed(leftover()).await;
    let harness = harness_for(&world).await;

    // When: Running session setup
    let fixture = SessionFixture::new(harness.controller(), harness.config());
    let outcome = fixture.setup().await;

    // Then: The failure is recorded, restarts still happen
    assert!(!outcome.truncated);
    assert_eq!(outcome.warnings.len(), 1);
    assert!(outcome.warnings[0].contains(STORE_SERVICE));
    assert_eq!(outcome.restarted.len(), 2);
    assert_eq!(world.stored().await.len(), 1);
}

// ---------------------------------------------------------------------------
// Full runs
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_e2e_full_run_passes_on_healthy_pipeline() {
    // Given: A healthy pipeline with leftover state
    let world = World::healthy();
    world.seed(leftover()).await;
    let runner = runner_for(&world).await;

    // When: Running every scenario
    let run = runner.run(&ScenarioKind::ALL).await;

    // Then: All pass in order and the exit code is 0
    assert!(run.setup_error.is_none());
    assert!(run.session_warnings.is_empty());
    let kinds: Vec<_> = run.scenarios.iter().map(|s| s.scenario).collect();
    assert_eq!(kinds, ScenarioKind::ALL.to_vec());
    for scenario in &run.scenarios {
        assert_eq!(
            scenario.status,
            ScenarioStatus::Passed,
            "{} failed: {:?}",
            scenario.scenario,
            scenario.failure
        );
        assert!(!scenario.steps.is_empty());
    }
    assert_eq!(run.exit_code(), EXIT_PASSED);
    // leftover event truncated by the fixture
    assert!(world.stored().await.iter().all(|e| e.tx_hash != "0xdead"));
}

#[tokio::test]
async fn test_e2e_setup_failure_skips_every_scenario() {
    // Given: A chain node that is down before the run starts
    let world = World::healthy();
    world.set_running(CHAIN_SERVICE, false).await;
    let runner = runner_for(&world).await;

    // When: Running two scenarios
    let run = runner
        .run(&[ScenarioKind::BusDowntime, ScenarioKind::ApiRestart])
        .await;

    // Then: Setup error names the rpc endpoint, nothing ran, exit code 1
    let setup_error = run.setup_error.as_deref().expect("setup error");
    assert!(setup_error.contains("fake://anvil"), "{setup_error}");
    assert!(
        run.scenarios
            .iter()
            .all(|s| s.status == ScenarioStatus::Skipped)
    );
    assert_eq!(run.scenarios.len(), 2);
    assert_eq!(run.exit_code(), EXIT_FAILED);
    // the fixture still ran, no scenario touched the bus
    let calls = world.calls().await;
    assert!(calls.contains(&format!("exec {STORE_SERVICE}")));
    assert!(!calls.contains(&format!("stop {BUS_SERVICE}")));
}

#[tokio::test]
async fn test_e2e_failed_scenario_restores_stopped_services() {
    // Given: A chain that does not come back, so the next scenario's transfer
    //        fails while the bus is stopped
    let world = World::with_faults(Faults {
        chain_stays_down: true,
        ..Faults::default()
    });
    let runner = runner_for(&world).await;

    // When: Running rpc-disconnect then bus-downtime
    let run = runner
        .run(&[ScenarioKind::RpcDisconnect, ScenarioKind::BusDowntime])
        .await;

    // Then: Both fail, later scenarios still ran and the bus was started again
    let rpc = run.scenario(ScenarioKind::RpcDisconnect).expect("rpc report");
    assert_eq!(rpc.status, ScenarioStatus::Failed);
    let bus = run.scenario(ScenarioKind::BusDowntime).expect("bus report");
    assert_eq!(bus.status, ScenarioStatus::Failed);
    assert!(
        bus.failure.as_deref().is_some_and(|f| f.contains("rejected")),
        "{:?}",
        bus.failure
    );
    assert!(world.is_running(BUS_SERVICE).await);
    assert_eq!(run.exit_code(), EXIT_FAILED);
}

#[tokio::test]
async fn test_e2e_json_report_for_failed_run() {
    // Given: A duplicating store and a single selected scenario
    let world = World::with_faults(Faults {
        duplicate_on_api_restart: true,
        ..Faults::default()
    });
    let runner = Runner::new(harness_with(&world, |_| {}).await);

    // When: Running and rendering the JSON report
    let run = runner.run(&[ScenarioKind::ApiRestart]).await;
    let mut out = Vec::new();
    report::write_report(&run, ReportFormat::Json, &mut out).expect("render");

    // Then: The report carries the verdict and the duplicate identifier
    let json: serde_json::Value = serde_json::from_slice(&out).expect("json");
    assert_eq!(json["chain"], "ethereum");
    assert_eq!(json["scenarios"][0]["scenario"], "api-restart");
    assert_eq!(json["scenarios"][0]["status"], "failed");
    let failure = json["scenarios"][0]["failure"].as_str().expect("failure");
    assert!(failure.contains(&format!("{:064x}", 1)), "{failure}");
    assert!(!json["run_id"].as_str().unwrap_or_default().is_empty());
}
