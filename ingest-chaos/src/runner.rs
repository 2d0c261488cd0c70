//! Scenario runner -- sequences the session fixture, setup checks and
//! scenarios into one [`RunReport`].
//!
//! Scenarios run strictly one after another; they share the same external
//! services and must not interleave. A setup failure skips every scenario.
//! Teardown always runs.

use ingest_chaos_chain_driver::ChainDriver;
use ingest_chaos_core::config::ScenarioKind;
use ingest_chaos_core::error::HarnessError;
use ingest_chaos_core::metrics as m;
use ingest_chaos_core::types::LifecycleState;
use ingest_chaos_event_oracle::EventSource;
use ingest_chaos_service_control::ServiceRuntime;
use metrics::counter;
use tokio::time::Instant;
use tracing::{error, info, warn};

use crate::fixture::SessionFixture;
use crate::harness::Harness;
use crate::report::{RunReport, ScenarioReport, ScenarioStatus, StepLog};
use crate::scenario;

pub struct Runner<R: ServiceRuntime, D, S> {
    harness: Harness<R, D, S>,
}

impl<R, D, S> Runner<R, D, S>
where
    R: ServiceRuntime,
    D: ChainDriver,
    S: EventSource,
{
    pub fn new(harness: Harness<R, D, S>) -> Self {
        Self { harness }
    }

    pub fn harness(&self) -> &Harness<R, D, S> {
        &self.harness
    }

    /// Runs the session fixture, the setup checks and `scenarios` in order.
    pub async fn run(&self, scenarios: &[ScenarioKind]) -> RunReport {
        let started = Instant::now();
        let run_id = uuid::Uuid::new_v4().to_string();
        let chain = self.harness.config().chain.backend;
        info!(run_id = %run_id, chain = %chain, scenarios = scenarios.len(), "run starting");

        let fixture = SessionFixture::new(self.harness.controller(), self.harness.config());
        let session = fixture.setup().await;

        let mut report = RunReport {
            run_id,
            chain,
            setup_error: None,
            session_warnings: session.warnings,
            scenarios: Vec::with_capacity(scenarios.len()),
            elapsed_ms: 0,
        };

        match self.harness.check_dependencies().await {
            Ok(()) => {
                for &kind in scenarios {
                    let result = self.run_scenario(kind).await;
                    report.scenarios.push(result);
                }
            }
            Err(e) => {
                error!(error = %e, "setup failed, skipping all scenarios");
                report.setup_error = Some(e.to_string());
                report
                    .scenarios
                    .extend(scenarios.iter().copied().map(ScenarioReport::skipped));
            }
        }

        fixture.teardown().await;
        report.elapsed_ms = started.elapsed().as_millis() as u64;
        info!(
            run_id = %report.run_id,
            passed = report.passed(),
            elapsed_ms = report.elapsed_ms,
            "run finished"
        );
        report
    }

    async fn run_scenario(&self, kind: ScenarioKind) -> ScenarioReport {
        info!(scenario = %kind, "scenario starting");
        let mut steps = StepLog::new(kind);
        let result = scenario::run(kind, &self.harness, &mut steps).await;

        if let Err(e) = self.restore_services().await {
            warn!(scenario = %kind, error = %e, "failed to restore services after scenario");
            steps.record(format!("restore failed: {e}"));
        }

        let elapsed_ms = steps.elapsed().as_millis() as u64;
        let (status, failure) = match result {
            Ok(()) => {
                info!(scenario = %kind, elapsed_ms, "scenario passed");
                (ScenarioStatus::Passed, None)
            }
            Err(e) => {
                error!(scenario = %kind, elapsed_ms, error = %e, "scenario failed");
                (ScenarioStatus::Failed, Some(e.to_string()))
            }
        };
        counter!(
            m::SCENARIOS_TOTAL,
            m::LABEL_SCENARIO => kind.as_str(),
            m::LABEL_RESULT => status.as_str()
        )
        .increment(1);

        ScenarioReport {
            scenario: kind,
            status,
            failure,
            elapsed_ms,
            steps: steps.into_steps(),
        }
    }

    /// Starts every service a failed scenario left stopped.
    ///
    /// States come from the engine, not the cached handles. One service that
    /// cannot be restored does not keep the others down; the first error is returned.
    async fn restore_services(&self) -> Result<(), HarnessError> {
        let chain_service = self.harness.config().chain_service();
        let mut first_error = None;
        for handle in self.harness.controller().refresh_all().await {
            if handle.state != LifecycleState::Stopped {
                continue;
            }
            warn!(service = %handle.name, "service left stopped, restarting");
            let restored = async {
                self.harness.controller().start(&handle.name).await?;
                if handle.name == chain_service {
                    self.harness.connect_chain().await?;
                }
                Ok::<(), HarnessError>(())
            }
            .await;
            if let Err(e) = restored {
                warn!(service = %handle.name, error = %e, "failed to restore service");
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}
