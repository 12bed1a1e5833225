mod analyze;
mod approval;
mod checksum;
mod cli;
mod commands;
mod error;
mod manifest;
mod progress;

use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use pipeline_common::{CancellationToken, cancellation, from_values, limits};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::cli::{Args, Commands};
use crate::error::{CliError, Result};

/// Default deadline for `load`: generous, since hashing a large tree can
/// genuinely take a while.
const DEFAULT_LOAD_TIMEOUT_SECS: u64 = 30 * 60;
/// Default deadline for `manifest`: small file sets are expected to finish
/// in seconds.
const DEFAULT_MANIFEST_TIMEOUT_SECS: u64 = 60;

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    let token = CancellationToken::new();
    {
        let token = token.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                token.cancel();
            }
        });
    }

    match run(args, token).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args, token: CancellationToken) -> Result<()> {
    let default_timeout = match &args.command {
        Commands::Load { .. } => DEFAULT_LOAD_TIMEOUT_SECS,
        Commands::Manifest { .. } => DEFAULT_MANIFEST_TIMEOUT_SECS,
    };
    let timeout = Duration::from_secs(args.timeout_secs.unwrap_or(default_timeout));
    let token = cancellation::with_timeout(&token, timeout);

    match args.command {
        Commands::Load { pattern } => run_load(&pattern, args.workers, args.assume_yes, token).await,
        Commands::Manifest { pattern, outfile } => {
            run_manifest(&pattern, &outfile, args.workers, args.assume_yes, token).await
        }
    }
}

fn worker_count(requested: Option<usize>, total: usize) -> usize {
    requested
        .unwrap_or(limits::DEFAULT_MAP_WORKERS)
        .clamp(1, total.max(1))
}

fn print_checksums(report: &analyze::AnalysisReport) {
    for fc in &report.successes {
        println!("{}  {}", fc.checksum, fc.path.display());
    }
}

async fn run_load(
    pattern: &str,
    workers: Option<usize>,
    assume_yes: bool,
    token: CancellationToken,
) -> Result<()> {
    let paths = commands::expand_pattern(pattern)?;
    let workers = worker_count(workers, paths.len());

    match analyze::analyze_with_policy(paths, workers, assume_yes, token).await {
        Ok(report) => {
            print_checksums(&report);
            if !report.failures.is_empty() {
                info!(failed = report.failures.len(), "completed with partial failures");
            }
            Ok(())
        }
        // The run was cancelled partway through: print whatever was already
        // analyzed before propagating the error, per the "return partial
        // results alongside ctx.Err()" policy.
        Err(CliError::Cancelled { completed, total, report }) => {
            print_checksums(&report);
            info!(completed, total, "run cancelled before completion");
            Err(CliError::Cancelled { completed, total, report })
        }
        Err(e) => Err(e),
    }
}

async fn run_manifest(
    pattern: &str,
    outfile: &std::path::Path,
    workers: Option<usize>,
    assume_yes: bool,
    token: CancellationToken,
) -> Result<()> {
    let paths = commands::expand_pattern(pattern)?;
    let workers = worker_count(workers, paths.len());
    let outcome = analyze::analyze_with_policy(paths, workers, assume_yes, token.clone()).await;

    // On cancellation, still fold and write whatever was already analyzed
    // before surfacing the error, rather than discarding it.
    let (report, cancellation) = match outcome {
        Ok(report) => (report, None),
        Err(CliError::Cancelled { completed, total, report }) => {
            info!(completed, total, "run cancelled before completion; writing partial manifest");
            (*report.clone(), Some(CliError::Cancelled { completed, total, report }))
        }
        Err(e) => return Err(e),
    };

    for failure in &report.failures {
        if let Some(err) = &failure.err {
            error!(path = %failure.value.path.display(), %err, "file analysis failed");
        }
    }

    let stream = from_values(report.successes).run(token.clone());
    let manifest = manifest::reduce_into_manifest(token, stream).await?;
    manifest::write_manifest(outfile, &manifest)?;

    info!(path = %outfile.display(), files = manifest.files.len(), "manifest written");

    match cancellation {
        Some(err) => Err(err),
        None => Ok(()),
    }
}
