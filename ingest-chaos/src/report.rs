//! Run report -- per-scenario verdicts, step logs and exit code mapping.
//!
//! The report is rendered through [`Render`] (text) or `serde_json` (JSON),
//! selected by `--report`.

use std::io::Write;
use std::time::Duration;

use ingest_chaos_core::config::ScenarioKind;
use ingest_chaos_core::types::Chain;
use serde::Serialize;
use tokio::time::Instant;
use tracing::info;

use crate::cli::ReportFormat;

/// Every selected scenario passed.
pub const EXIT_PASSED: u8 = 0;
/// A scenario failed, or setup/teardown raised.
pub const EXIT_FAILED: u8 = 1;
/// Configuration could not be loaded or validated.
pub const EXIT_CONFIG: u8 = 2;

/// Trait for human-readable text rendering.
pub trait Render {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()>;
}

/// Writes `payload` in the requested format.
pub fn write_report<T: Render + Serialize>(
    payload: &T,
    format: ReportFormat,
    w: &mut dyn Write,
) -> std::io::Result<()> {
    match format {
        ReportFormat::Text => payload.render_text(w),
        ReportFormat::Json => {
            serde_json::to_writer_pretty(&mut *w, payload)?;
            writeln!(w)
        }
    }
}

/// One recorded scenario step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Step {
    /// Offset from scenario start.
    pub at_ms: u64,
    pub description: String,
}

/// Ordered step log of a running scenario.
#[derive(Debug)]
pub struct StepLog {
    scenario: ScenarioKind,
    started: Instant,
    steps: Vec<Step>,
}

impl StepLog {
    pub fn new(scenario: ScenarioKind) -> Self {
        Self {
            scenario,
            started: Instant::now(),
            steps: Vec::new(),
        }
    }

    pub fn record(&mut self, description: impl Into<String>) {
        let description = description.into();
        let at_ms = self.started.elapsed().as_millis() as u64;
        info!(scenario = %self.scenario, at_ms, "{description}");
        self.steps.push(Step { at_ms, description });
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn into_steps(self) -> Vec<Step> {
        self.steps
    }
}

/// Scenario verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScenarioStatus {
    Passed,
    Failed,
    /// Not run because setup failed.
    Skipped,
}

impl ScenarioStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    pub scenario: ScenarioKind,
    pub status: ScenarioStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
    pub elapsed_ms: u64,
    pub steps: Vec<Step>,
}

impl ScenarioReport {
    pub fn skipped(scenario: ScenarioKind) -> Self {
        Self {
            scenario,
            status: ScenarioStatus::Skipped,
            failure: None,
            elapsed_ms: 0,
            steps: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: String,
    pub chain: Chain,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub setup_error: Option<String>,
    /// Session fixture problems (never fatal).
    pub session_warnings: Vec<String>,
    pub scenarios: Vec<ScenarioReport>,
    pub elapsed_ms: u64,
}

impl RunReport {
    /// `true` when setup succeeded and every scenario passed.
    pub fn passed(&self) -> bool {
        self.setup_error.is_none()
            && self
                .scenarios
                .iter()
                .all(|s| s.status == ScenarioStatus::Passed)
    }

    pub fn exit_code(&self) -> u8 {
        if self.passed() { EXIT_PASSED } else { EXIT_FAILED }
    }

    pub fn scenario(&self, kind: ScenarioKind) -> Option<&ScenarioReport> {
        self.scenarios.iter().find(|s| s.scenario == kind)
    }
}

impl Render for RunReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        writeln!(w, "ingest-chaos run {} ({})", self.run_id, self.chain)?;
        if let Some(err) = &self.setup_error {
            writeln!(w, "setup failed: {err}")?;
        }
        for warning in &self.session_warnings {
            writeln!(w, "session warning: {warning}")?;
        }
        for s in &self.scenarios {
            writeln!(
                w,
                "  {:<16} {:<8} {:>8} ms",
                s.scenario.as_str(),
                s.status.as_str(),
                s.elapsed_ms
            )?;
            for step in &s.steps {
                writeln!(w, "      +{:>7} ms  {}", step.at_ms, step.description)?;
            }
            if let Some(failure) = &s.failure {
                writeln!(w, "      failure: {failure}")?;
            }
        }
        let passed = self
            .scenarios
            .iter()
            .filter(|s| s.status == ScenarioStatus::Passed)
            .count();
        writeln!(
            w,
            "{} of {} scenario(s) passed in {} ms",
            passed,
            self.scenarios.len(),
            self.elapsed_ms
        )
    }
}
