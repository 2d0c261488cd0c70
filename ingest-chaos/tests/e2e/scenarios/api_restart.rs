//! api-restart: query service restarted between two transfers.

use ingest_chaos::report::StepLog;
use ingest_chaos::scenario;
use ingest_chaos_core::config::ScenarioKind;
use ingest_chaos_core::error::{HarnessError, InvariantViolation};

use crate::helpers::config::harness_for;
use crate::helpers::world::{API_SERVICE, Faults, World};

#[tokio::test]
async fn test_e2e_api_restart_keeps_first_transfer_exactly_once() {
    // Given: A pipeline with an idempotent store
    let world = World::healthy();
    let harness = harness_for(&world).await;
    let mut steps = StepLog::new(ScenarioKind::ApiRestart);

    // When: Running the scenario
    let result = scenario::run(ScenarioKind::ApiRestart, &harness, &mut steps).await;

    // Then: It passes and both transfers are stored once
    assert!(result.is_ok(), "scenario should pass: {:?}", result.err());
    assert_eq!(
        world.calls().await,
        vec![format!("stop {API_SERVICE}"), format!("start {API_SERVICE}")]
    );
    let stored = world.stored().await;
    assert_eq!(stored.len(), 2);
    assert!(
        steps
            .steps()
            .last()
            .is_some_and(|s| s.description.contains("exactly once"))
    );
}

#[tokio::test]
async fn test_e2e_api_restart_reports_replayed_duplicate() {
    // Given: A store that re-ingests everything when the API restarts
    let world = World::with_faults(Faults {
        duplicate_on_api_restart: true,
        ..Faults::default()
    });
    let harness = harness_for(&world).await;
    let mut steps = StepLog::new(ScenarioKind::ApiRestart);

    // When: Running the scenario
    let err = scenario::run(ScenarioKind::ApiRestart, &harness, &mut steps)
        .await
        .expect_err("scenario should fail");

    // Then: Transfer A is reported with multiplicity 2
    match err {
        HarnessError::Invariant(InvariantViolation::Duplicated {
            wallet,
            identifier,
            count,
        }) => {
            assert_eq!(wallet, format!("0x{:040x}", 0xa001));
            assert_eq!(identifier, format!("{:064x}", 1));
            assert_eq!(count, 2);
        }
        other => panic!("expected duplicate, got {other}"),
    }
    // transfer B was still verified before the recheck
    assert!(
        steps
            .steps()
            .iter()
            .any(|s| s.description.starts_with("transfer B visible"))
    );
}
