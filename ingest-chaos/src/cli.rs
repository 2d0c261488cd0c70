//! CLI argument definitions for ingest-chaos.
//!
//! Uses `clap` v4 derive macros to parse command-line arguments.

use std::path::PathBuf;
use std::str::FromStr;

use clap::{Parser, ValueEnum};
use ingest_chaos_core::config::{HarnessConfig, ScenarioKind};
use ingest_chaos_core::error::{ConfigError, HarnessError};
use ingest_chaos_core::types::Chain;

/// Config file looked up when `--config` is not given. A missing file means defaults.
pub const DEFAULT_CONFIG_PATH: &str = "ingest-chaos.toml";

/// Fault-injection conformance harness for a blockchain event-ingestion pipeline.
///
/// Stops, starts and restarts pipeline services while submitting test-chain
/// transfers, then asserts that every transfer is reported exactly once.
#[derive(Parser, Debug)]
#[command(name = "ingest-chaos")]
#[command(version, about, long_about = None)]
pub struct HarnessCli {
    /// Path to ingest-chaos.toml configuration file.
    ///
    /// When given explicitly the file must exist.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Override log level (trace, debug, info, warn, error).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_level: Option<String>,

    /// Override log format (json, pretty).
    #[arg(long)]
    pub log_format: Option<String>,

    /// Scenario to run (repeatable). Overrides `scenarios.enabled`.
    ///
    /// One of: rpc-disconnect, bus-downtime, api-restart, delivery-smoke.
    #[arg(long = "scenario", value_name = "NAME")]
    pub scenarios: Vec<String>,

    /// Override chain backend (ethereum, solana).
    #[arg(long)]
    pub chain: Option<String>,

    /// Run report format printed to stdout.
    #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
    pub report: ReportFormat,

    /// Validate configuration and exit without touching any service.
    #[arg(long)]
    pub validate: bool,
}

/// Run report rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    Text,
    Json,
}

impl HarnessCli {
    /// Loads configuration with CLI flags applied on top.
    ///
    /// Priority: CLI flags > environment variables > config file > defaults.
    pub async fn load_config(&self) -> Result<HarnessConfig, HarnessError> {
        let mut config = match &self.config {
            Some(path) => HarnessConfig::load(path).await?,
            None => HarnessConfig::load_or_default(DEFAULT_CONFIG_PATH).await?,
        };
        self.apply_overrides(&mut config)?;
        config.validate()?;
        Ok(config)
    }

    fn apply_overrides(&self, config: &mut HarnessConfig) -> Result<(), HarnessError> {
        if let Some(level) = &self.log_level {
            config.general.log_level = level.clone();
        }
        if let Some(format) = &self.log_format {
            config.general.log_format = format.clone();
        }
        if let Some(chain) = &self.chain {
            config.chain.backend = Chain::from_str(chain).map_err(|reason| {
                ConfigError::InvalidValue {
                    field: "--chain".to_owned(),
                    reason,
                }
            })?;
        }
        if !self.scenarios.is_empty() {
            config.scenarios.enabled = self
                .scenarios
                .iter()
                .map(|name| {
                    ScenarioKind::from_str(name).map_err(|reason| ConfigError::InvalidValue {
                        field: "--scenario".to_owned(),
                        reason,
                    })
                })
                .collect::<Result<_, _>>()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> HarnessCli {
        HarnessCli::try_parse_from(std::iter::once("ingest-chaos").chain(args.iter().copied()))
            .expect("valid args")
    }

    #[test]
    fn scenario_flag_is_repeatable() {
        let cli = parse(&["--scenario", "bus-downtime", "--scenario", "api-restart"]);
        let mut config = HarnessConfig::default();
        cli.apply_overrides(&mut config).unwrap();
        assert_eq!(
            config.scenarios.enabled,
            vec![ScenarioKind::BusDowntime, ScenarioKind::ApiRestart]
        );
    }

    #[test]
    fn unknown_scenario_is_a_config_error() {
        let cli = parse(&["--scenario", "meteor-strike"]);
        let err = cli
            .apply_overrides(&mut HarnessConfig::default())
            .unwrap_err();
        assert!(matches!(err, HarnessError::Config(_)));
        assert!(err.to_string().contains("meteor-strike"));
    }

    #[test]
    fn chain_and_logging_overrides() {
        let cli = parse(&["--chain", "sol", "--log-level", "debug", "--log-format", "json"]);
        let mut config = HarnessConfig::default();
        cli.apply_overrides(&mut config).unwrap();
        assert_eq!(config.chain.backend, Chain::Solana);
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.general.log_format, "json");
    }

    #[test]
    fn report_defaults_to_text() {
        assert_eq!(parse(&[]).report, ReportFormat::Text);
        assert_eq!(parse(&["--report", "json"]).report, ReportFormat::Json);
    }
}
