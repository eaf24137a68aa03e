// ABOUTME: Entry point for the tideway CLI application.
// ABOUTME: Parses arguments and dispatches to appropriate command handlers.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use std::error::Error as _;
use tideway::deploy::{DeploymentReport, error_chain};
use tideway::error::{Error, Result};
use tideway::output::{Output, OutputMode};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // RUST_LOG wins over the verbose flag when set
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("warn")
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let output = Output::new(if cli.json {
        OutputMode::Json
    } else if cli.quiet {
        OutputMode::Quiet
    } else {
        OutputMode::Normal
    });

    if let Err(e) = run(cli.command, output.clone()).await {
        report_error(&output, &e);
        std::process::exit(1);
    }
}

async fn run(command: Commands, output: Output) -> Result<()> {
    match command {
        Commands::Init { name, force } => commands::init(name.as_deref(), force, &output),
        Commands::Deploy {
            target,
            image,
            profile,
        } => commands::deploy(target, image, profile, output).await,
        Commands::Render {
            target,
            region,
            image,
        } => commands::render(target, region, image),
    }
}

fn report_error(output: &Output, error: &Error) {
    if output.mode() == OutputMode::Json {
        output.error(&error_chain(error));
        return;
    }

    output.error(&error.to_string());

    let mut source = error.source();
    while let Some(cause) = source {
        eprintln!("  caused by: {cause}");
        source = cause.source();
    }

    if let Some(report) = deploy_report(error) {
        for (region, error) in report.failed() {
            eprintln!("  {region}: {}", error_chain(error));
        }
    }
}

fn deploy_report(error: &Error) -> Option<&DeploymentReport> {
    match error {
        Error::Deploy(e) => e.report(),
        _ => None,
    }
}
