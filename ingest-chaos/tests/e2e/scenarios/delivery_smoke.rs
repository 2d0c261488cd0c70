//! delivery-smoke: structural check of a received event.

use ingest_chaos::report::StepLog;
use ingest_chaos::scenario;
use ingest_chaos_core::config::{AuxProcessConfig, ScenarioKind};
use ingest_chaos_core::error::{HarnessError, InvariantViolation};

use crate::helpers::config::{harness_for, harness_with};
use crate::helpers::world::{Faults, SENDER, World};

#[tokio::test]
async fn test_e2e_smoke_event_matches_transfer() {
    // Given: A healthy pipeline
    let world = World::healthy();
    let harness = harness_for(&world).await;
    let mut steps = StepLog::new(ScenarioKind::DeliverySmoke);

    // When: Running the smoke scenario
    let result = scenario::run(ScenarioKind::DeliverySmoke, &harness, &mut steps).await;

    // Then: The received event matches the transfer field by field
    assert!(result.is_ok(), "scenario should pass: {:?}", result.err());
    let received = world.last_received().await;
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].from, SENDER);
    assert_eq!(received[0].event_type, "transfer");
}

#[tokio::test]
async fn test_e2e_smoke_uses_configured_watched_address() {
    // Given: A fixed watched address
    let world = World::healthy();
    let watched = "0x70997970c51812dc3a010c7d01b50e0d17dc79c8";
    let harness = harness_with(&world, |c| {
        c.scenarios.smoke_watched_address = Some(watched.to_owned());
    })
    .await;
    let mut steps = StepLog::new(ScenarioKind::DeliverySmoke);

    // When: Running the smoke scenario
    let result = scenario::run(ScenarioKind::DeliverySmoke, &harness, &mut steps).await;

    // Then: The transfer went to the watched address
    assert!(result.is_ok(), "scenario should pass: {:?}", result.err());
    assert_eq!(world.last_received().await[0].to, watched);
}

#[tokio::test]
async fn test_e2e_smoke_names_mismatched_fields() {
    // Given: A pipeline that labels native transfers as token transfers
    let world = World::with_faults(Faults {
        corrupt_event_type: true,
        ..Faults::default()
    });
    let harness = harness_for(&world).await;
    let mut steps = StepLog::new(ScenarioKind::DeliverySmoke);

    // When: Running the smoke scenario
    let err = scenario::run(ScenarioKind::DeliverySmoke, &harness, &mut steps)
        .await
        .expect_err("scenario should fail");

    // Then: Exactly the event type is reported
    match err {
        HarnessError::Invariant(InvariantViolation::Structural { identifier, fields }) => {
            assert_eq!(identifier, format!("{:064x}", 1));
            assert_eq!(fields, vec!["event_type".to_owned()]);
        }
        other => panic!("expected structural mismatch, got {other}"),
    }
}

#[cfg(target_os = "linux")]
#[tokio::test]
async fn test_e2e_smoke_terminates_aux_processes_on_failure() {
    // Given: A failing pipeline and one long-running auxiliary process
    let world = World::with_faults(Faults {
        corrupt_event_type: true,
        ..Faults::default()
    });
    let aux = AuxProcessConfig {
        name: "poller".to_owned(),
        program: "sleep".to_owned(),
        args: vec!["30".to_owned()],
        ..AuxProcessConfig::default()
    };
    let harness = harness_with(&world, |c| c.aux_processes = vec![aux]).await;
    let mut steps = StepLog::new(ScenarioKind::DeliverySmoke);

    // When: Running the smoke scenario
    let result = scenario::run(ScenarioKind::DeliverySmoke, &harness, &mut steps).await;

    // Then: The scenario fails and the process is gone
    assert!(result.is_err());
    let spawned = steps
        .steps()
        .iter()
        .find(|s| s.description.starts_with("spawned poller"))
        .expect("spawn step");
    let pid: u32 = spawned
        .description
        .rsplit_once("(pid ")
        .and_then(|(_, rest)| rest.strip_suffix(')'))
        .and_then(|pid| pid.parse().ok())
        .expect("pid in step");
    assert!(!std::path::Path::new(&format!("/proc/{pid}")).exists());
}
