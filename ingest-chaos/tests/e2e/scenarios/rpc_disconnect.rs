//! rpc-disconnect: chain node restart with history reset.

use ingest_chaos::report::StepLog;
use ingest_chaos::scenario;
use ingest_chaos_core::config::ScenarioKind;
use ingest_chaos_core::error::{HarnessError, InvariantViolation};

use crate::helpers::config::{harness_for, harness_with};
use crate::helpers::world::{CHAIN_SERVICE, Faults, World};

#[tokio::test]
async fn test_e2e_rpc_disconnect_passes_on_healthy_pipeline() {
    // Given: A healthy pipeline
    let world = World::healthy();
    let harness = harness_for(&world).await;
    let mut steps = StepLog::new(ScenarioKind::RpcDisconnect);

    // When: Running the scenario
    let result = scenario::run(ScenarioKind::RpcDisconnect, &harness, &mut steps).await;

    // Then: It passes after exactly one chain reset
    assert!(result.is_ok(), "scenario should pass: {:?}", result.err());
    assert_eq!(world.chain_epoch().await, 1);
    assert_eq!(
        world.calls().await,
        vec![format!("stop {CHAIN_SERVICE}"), format!("start {CHAIN_SERVICE}")]
    );
    // 2 before + 2 after, each visible once
    assert_eq!(world.stored().await.len(), 4);

    let descriptions: Vec<_> = steps.steps().iter().map(|s| s.description.as_str()).collect();
    let stop = descriptions
        .iter()
        .position(|d| d.starts_with("stopped"))
        .expect("stop step");
    let before = descriptions
        .iter()
        .position(|d| d.contains("before restart visible"))
        .expect("pre-restart step");
    let after = descriptions
        .iter()
        .position(|d| d.contains("after restart visible"))
        .expect("post-restart step");
    assert!(before < stop && stop < after, "steps out of order: {descriptions:?}");
}

#[tokio::test]
async fn test_e2e_rpc_disconnect_names_transfers_lost_after_reset() {
    // Given: A poller that stops delivering once the chain has been reset
    let world = World::with_faults(Faults {
        lose_after_chain_reset: true,
        ..Faults::default()
    });
    let harness = harness_for(&world).await;
    let mut steps = StepLog::new(ScenarioKind::RpcDisconnect);

    // When: Running the scenario
    let err = scenario::run(ScenarioKind::RpcDisconnect, &harness, &mut steps)
        .await
        .expect_err("scenario should fail");

    // Then: The first post-restart transfer (tx 3 to recipient 3) is reported missing
    match err {
        HarnessError::Invariant(InvariantViolation::Missing {
            wallet,
            identifiers,
            ..
        }) => {
            assert_eq!(wallet, format!("0x{:040x}", 0xa003));
            assert_eq!(identifiers, vec![format!("{:064x}", 3)]);
        }
        other => panic!("expected missing identifiers, got {other}"),
    }
    // pre-restart transfers were still verified
    assert!(
        steps
            .steps()
            .iter()
            .any(|s| s.description.contains("before restart visible"))
    );
}

#[tokio::test]
async fn test_e2e_rpc_disconnect_fails_when_chain_never_returns() {
    // Given: A chain node that does not come back after a restart
    let world = World::with_faults(Faults {
        chain_stays_down: true,
        ..Faults::default()
    });
    let harness = harness_for(&world).await;
    let mut steps = StepLog::new(ScenarioKind::RpcDisconnect);

    // When: Running the scenario
    let err = scenario::run(ScenarioKind::RpcDisconnect, &harness, &mut steps)
        .await
        .expect_err("scenario should fail");

    // Then: The reconnect step reports the unreachable rpc
    assert!(
        matches!(err, HarnessError::Connectivity(ref c) if c.endpoint == "fake://anvil"),
        "unexpected error: {err}"
    );
}

#[tokio::test]
async fn test_e2e_rpc_disconnect_requires_active_poller() {
    // Given: A stopped poller
    let world = World::healthy();
    world.set_running("rust", false).await;
    let harness = harness_with(&world, |c| c.readiness.poller_timeout_secs = 1).await;
    let mut steps = StepLog::new(ScenarioKind::RpcDisconnect);

    // When: Running the scenario
    let err = scenario::run(ScenarioKind::RpcDisconnect, &harness, &mut steps)
        .await
        .expect_err("scenario should fail");

    // Then: Nothing was touched and the readiness check is named
    assert!(
        matches!(
            err,
            HarnessError::Invariant(InvariantViolation::NotObserved { ref what, .. })
                if what.contains("poller activity")
        ),
        "unexpected error: {err}"
    );
    assert!(world.calls().await.is_empty());
}
