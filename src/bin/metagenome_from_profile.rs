use std::process::ExitCode;

use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use metagenome_from_profile::app::{App, RunOutcome};
use metagenome_from_profile::cli;
use metagenome_from_profile::error::PipelineError;
use metagenome_from_profile::options::RunOptions;
use metagenome_from_profile::output::{JsonOutput, TracingSink};
use metagenome_from_profile::references::ReferenceHttpClient;
use metagenome_from_profile::resolver::CommandResolver;
use metagenome_from_profile::simulator::ProcessSimulator;

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(error) = report.downcast_ref::<PipelineError>() {
            return ExitCode::from(error.exit_code());
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn init_tracing(debug: bool) {
    let default_directive = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run() -> miette::Result<()> {
    let cli = match cli::parse_args(std::env::args_os()) {
        Ok(Some(cli)) => cli,
        Ok(None) => {
            print!("{}", cli::render_help());
            return Ok(());
        }
        Err(err) => err.exit(),
    };
    init_tracing(cli.debug);

    let resolver = CommandResolver::new(cli.resolver.clone());
    let simulator = ProcessSimulator::new(cli.simulator.clone());
    let json = cli.json;

    let options = cli.into_options()?;
    log_options(&options);

    let app = App::new(resolver, simulator, ReferenceHttpClient::new()?);

    let summary = if json {
        let summary = app.run(&options, &JsonOutput)?;
        JsonOutput::print_summary(&summary).into_diagnostic()?;
        summary
    } else {
        app.run(&options, &TracingSink)?
    };

    if let RunOutcome::Dispatched { success: false, .. } = summary.outcome {
        tracing::warn!("simulation did not finish cleanly, see the simulator output above");
    }
    Ok(())
}

fn log_options(options: &RunOptions) {
    tracing::info!("Using options:");
    for (name, value) in options.describe() {
        tracing::info!("--{name}: {value}");
    }
}
