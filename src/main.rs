//! CLI entry point for the fetchpool tool.

use std::io::{self, IsTerminal};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use fetchpool_core::{FetchPool, HttpClient, Manifest, RunReport};
use tracing::{debug, info, warn};

mod cli;
mod exit;
mod progress;
mod run_config;

use cli::Args;
use exit::{ProcessExit, determine_exit_outcome};
use run_config::RunSettings;

#[tokio::main]
async fn main() -> ExitCode {
    // Parse CLI arguments first (before tracing, so --help works without logs).
    // Usage errors exit 1 like any other configuration error; clap's own 2
    // would read as a partial run.
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ProcessExit::Failure.into()
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    debug!(?args, "CLI arguments parsed");

    match run(&args).await {
        Ok(outcome) => outcome.into(),
        Err(e) => {
            eprintln!("error: {e:#}");
            ProcessExit::Failure.into()
        }
    }
}

async fn run(args: &Args) -> Result<ProcessExit> {
    let manifest = Manifest::from_path(&args.manifest)?;
    let settings = RunSettings::resolve(args, &manifest)?;
    let jobs = manifest.to_jobs(&settings.output_dir, settings.max_attempts)?;

    if jobs.is_empty() {
        info!(manifest = %args.manifest.display(), "manifest contains no jobs");
        return Ok(ProcessExit::Success);
    }

    info!(
        jobs = jobs.len(),
        workers = settings.pool.worker_count(),
        max_attempts = settings.max_attempts,
        output_dir = %settings.output_dir.display(),
        "fetchpool starting"
    );

    let client = HttpClient::new_with_timeouts(args.connect_timeout_secs, args.read_timeout_secs)
        .context("failed to build HTTP client")?;

    let show_progress = progress::should_show_progress(
        args.no_progress,
        args.quiet,
        io::stderr().is_terminal(),
        progress::is_dumb_terminal(),
    );
    let (events, progress_handle) = progress::spawn_progress_ui(show_progress, jobs.len());

    let pool = FetchPool::start_with_events(
        settings.pool,
        Arc::new(client),
        settings.retry_policy(),
        events,
    );

    let cancel = pool.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling outstanding jobs");
            cancel.cancel();
        }
    });

    let report = pool.run(jobs).await?;

    if let Some(handle) = progress_handle
        && let Err(e) = handle.await
    {
        warn!(error = %e, "progress task panicked");
    }

    print_failures(&report);
    if !args.quiet {
        print_summary(&report);
    }

    Ok(determine_exit_outcome(
        report.completed_count(),
        report.failed_count(),
    ))
}

fn print_failures(report: &RunReport) {
    for failed in report.failures() {
        eprintln!(
            "FAILED {} -> {}: {}",
            failed.job.source(),
            failed.job.destination().display(),
            failed.outcome
        );
    }
}

fn print_summary(report: &RunReport) {
    eprintln!(
        "{} completed, {} failed, {} retried in {:.1}s",
        report.completed_count(),
        report.failed_count(),
        report.stats.retried(),
        report.elapsed.as_secs_f64()
    );
}
