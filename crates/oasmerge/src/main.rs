//! oasmerge CLI.
//!
//! `oasmerge generate <FILES>...` bundles every OpenAPI document among the
//! given files and globs, merges them, and prints the result as YAML.

use std::io::Write;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use oasmerge::{generate, render, PipelineError};
use oasmerge_bundler::Config;
use oasmerge_telemetry::TelemetryConfig;

#[derive(Parser, Debug)]
#[command(
    name = "oasmerge",
    about = "Bundle and merge OpenAPI 3.x specs",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Bundle and merge specs, printing the merged document to stdout.
    Generate {
        /// Spec files or glob patterns. Files that are not OpenAPI 3 documents are skipped.
        files: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = oasmerge_telemetry::init(&TelemetryConfig::from_env()) {
        eprintln!("error: {}", e);
        return ExitCode::from(3);
    }

    match cli.command {
        Command::Generate { files } => match run_generate(&files).await {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                if let PipelineError::BundlingProblems { report, .. } = &e {
                    eprint!("{}", report);
                }
                eprintln!("error: {}", e);
                ExitCode::from(e.exit_code())
            }
        },
    }
}

async fn run_generate(files: &[String]) -> Result<(), PipelineError> {
    if files.is_empty() {
        return Err(PipelineError::NoInputFiles);
    }

    let cwd = std::env::current_dir()?;
    let config = Config::discover(&cwd)?;

    let merged = generate(files, &config).await?;
    let yaml = render(&merged)?;

    let mut stdout = std::io::stdout().lock();
    stdout.write_all(yaml.as_bytes())?;
    stdout.flush()?;
    Ok(())
}
