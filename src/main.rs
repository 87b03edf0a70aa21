mod cli;
mod config;
mod credentials;
mod error;
mod gallery;
mod logging;
mod nova;
mod orchestrator;
mod state_machine;
mod ui;

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing::debug;

use cli::Cli;
use config::NovaConfig;
use credentials::Credentials;
use nova::NovaClient;
use orchestrator::{JobOrchestrator, RunOutcome};
use ui::RunProgress;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(err) = logging::init_logging(cli.verbose) {
        eprintln!("{err}");
    }

    match run(cli).await {
        Ok(outcome) if outcome.is_success() => ExitCode::SUCCESS,
        Ok(_) => ExitCode::FAILURE,
        Err(err) => {
            ui::report_error(&err);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<RunOutcome> {
    let verbose = cli.verbose;
    let credentials = Credentials::from_env()?;
    let config = NovaConfig::load()?;
    debug!(?config, "configuration loaded");

    let gallery_root = config.gallery_root();
    let run = cli.into_run_config(gallery_root.as_deref())?;

    let client = NovaClient::new(config.client_settings())?;
    let progress = RunProgress::start(&run.name);
    progress.show_config(&run);

    let orchestrator = JobOrchestrator::new(
        client,
        credentials,
        config.pacing(),
        config.gallery_style(),
        progress,
    );
    let report = match orchestrator.run_with_retry(&run).await {
        Ok(report) => report,
        Err(err) => {
            orchestrator.progress().fail();
            return Err(err.into());
        }
    };

    orchestrator.progress().complete(&report.outcome);
    if verbose {
        orchestrator.progress().print_audit(&report.audit);
    }
    Ok(report.outcome)
}
