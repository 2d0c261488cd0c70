use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;

use ingest_chaos::cli::HarnessCli;
use ingest_chaos::logging::init_tracing;
use ingest_chaos::report::{self, EXIT_CONFIG, EXIT_FAILED, EXIT_PASSED};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = HarnessCli::parse();

    // 설정 에러는 로깅 초기화 전이므로 stderr로 직접 출력
    let config = match cli.load_config().await {
        Ok(config) => config,
        Err(e) => {
            eprintln!("ingest-chaos: configuration error: {e}");
            return ExitCode::from(EXIT_CONFIG);
        }
    };

    if let Err(e) = init_tracing(&config.general) {
        eprintln!("ingest-chaos: {e:#}");
        return ExitCode::from(EXIT_CONFIG);
    }
    ingest_chaos_core::metrics::describe_all();

    if cli.validate {
        tracing::info!("configuration valid");
        return ExitCode::from(EXIT_PASSED);
    }

    match run(&cli, config).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "ingest-chaos aborted");
            eprintln!("ingest-chaos: {e:#}");
            ExitCode::from(EXIT_FAILED)
        }
    }
}

async fn run(cli: &HarnessCli, config: ingest_chaos_core::config::HarnessConfig) -> Result<u8> {
    let scenarios = config.scenarios.enabled.clone();
    tracing::info!(
        chain = %config.chain.backend,
        scenarios = ?scenarios.iter().map(|s| s.as_str()).collect::<Vec<_>>(),
        "ingest-chaos starting"
    );

    let run_report = ingest_chaos::run_live(config, &scenarios)
        .await
        .context("failed to build harness")?;

    let mut stdout = std::io::stdout().lock();
    report::write_report(&run_report, cli.report, &mut stdout)
        .context("failed to write run report")?;
    Ok(run_report.exit_code())
}
