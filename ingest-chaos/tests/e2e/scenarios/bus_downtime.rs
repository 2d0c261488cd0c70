//! bus-downtime: transfer submitted while the message bus is down.

use ingest_chaos::report::StepLog;
use ingest_chaos::scenario;
use ingest_chaos_core::config::ScenarioKind;
use ingest_chaos_core::error::{HarnessError, InvariantViolation};
use tokio::time::Instant;

use crate::helpers::config::{harness_for, harness_with};
use crate::helpers::world::{BUS_SERVICE, Faults, World};

#[tokio::test]
async fn test_e2e_bus_downtime_delivers_after_bus_returns() {
    // Given: A pipeline whose producer retries while the bus is down
    let world = World::healthy();
    let harness = harness_for(&world).await;
    let mut steps = StepLog::new(ScenarioKind::BusDowntime);

    // When: Running the scenario
    let result = scenario::run(ScenarioKind::BusDowntime, &harness, &mut steps).await;

    // Then: The transfer arrives once the bus is back
    assert!(result.is_ok(), "scenario should pass: {:?}", result.err());
    assert_eq!(
        world.calls().await,
        vec![format!("stop {BUS_SERVICE}"), format!("start {BUS_SERVICE}")]
    );
    let stored = world.stored().await;
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].tx_hash, format!("0x{:064x}", 1));
}

#[tokio::test]
async fn test_e2e_bus_downtime_names_dropped_transfer() {
    // Given: A producer that drops events while the bus is down
    let world = World::with_faults(Faults {
        lose_during_bus_outage: true,
        ..Faults::default()
    });
    let harness = harness_for(&world).await;
    let mut steps = StepLog::new(ScenarioKind::BusDowntime);

    // When: Running the scenario
    let err = scenario::run(ScenarioKind::BusDowntime, &harness, &mut steps)
        .await
        .expect_err("scenario should fail");

    // Then: The dropped transfer is named for its recipient
    match err {
        HarnessError::Invariant(InvariantViolation::Missing {
            wallet,
            identifiers,
            ..
        }) => {
            assert_eq!(wallet, format!("0x{:040x}", 0xa001));
            assert_eq!(identifiers, vec![format!("{:064x}", 1)]);
        }
        other => panic!("expected missing identifiers, got {other}"),
    }
    // the bus was restored before polling
    assert!(world.is_running(BUS_SERVICE).await);
}

#[tokio::test]
async fn test_e2e_bus_downtime_waits_for_retry_ceiling() {
    // Given: A producer that never delivers and a retry ceiling of 750ms
    //        (250ms + 500ms) -> poll limit max(1s, 2 x 750ms) = 1.5s
    let world = World::with_faults(Faults {
        lose_during_bus_outage: true,
        ..Faults::default()
    });
    let harness = harness_with(&world, |c| {
        c.upstream_retry.attempts = 3;
        c.upstream_retry.base_ms = 250;
        c.upstream_retry.factor = 2.0;
    })
    .await;
    let mut steps = StepLog::new(ScenarioKind::BusDowntime);

    // When: Running the scenario
    let started = Instant::now();
    let result = scenario::run(ScenarioKind::BusDowntime, &harness, &mut steps).await;

    // Then: The poll lasted the extended limit, not the base visibility timeout
    assert!(result.is_err());
    assert!(
        started.elapsed().as_millis() >= 1_500,
        "gave up after {:?}",
        started.elapsed()
    );
}
