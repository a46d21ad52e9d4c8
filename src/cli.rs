//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use fetchpool_core::download::constants::{CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS};

/// Backoff strategy selectable on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BackoffKind {
    /// Same delay before every retry
    Fixed,
    /// Doubling delay with random jitter
    Exponential,
}

/// Fetch a manifest of files with a bounded worker pool.
///
/// Fetchpool downloads every job in a JSON manifest, verifies SHA-256
/// digests when given, and retries failed attempts with backoff.
///
/// Exit status: 0 when every job completed, 2 when some failed, 1 when all
/// failed or the manifest could not be used.
#[derive(Parser, Debug)]
#[command(name = "fetchpool")]
#[command(author, version, about)]
pub struct Args {
    /// Path to the JSON job manifest
    pub manifest: PathBuf,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,

    /// Number of concurrent workers (1-100) [default: manifest value, else 4]
    #[arg(short = 'w', long, value_parser = clap::value_parser!(u8).range(1..=100))]
    pub workers: Option<u8>,

    /// Total attempts per job, including the first (1-20) [default: manifest value, else 3]
    #[arg(short = 'r', long, value_parser = clap::value_parser!(u8).range(1..=20))]
    pub max_attempts: Option<u8>,

    /// Backoff strategy between attempts [default: manifest value, else fixed]
    #[arg(long, value_enum)]
    pub backoff: Option<BackoffKind>,

    /// Retry delay in milliseconds (base delay for exponential backoff, max 600000)
    #[arg(long, value_parser = clap::value_parser!(u64).range(0..=600_000))]
    pub retry_delay_ms: Option<u64>,

    /// Maximum number of queued jobs waiting for a worker [default: 2 x workers]
    #[arg(long, value_parser = clap::value_parser!(u16).range(1..))]
    pub queue_capacity: Option<u16>,

    /// Directory relative destinations resolve against [default: manifest directory]
    #[arg(short = 'o', long)]
    pub output_dir: Option<PathBuf>,

    /// Ask the server for each file's size before downloading it
    #[arg(long)]
    pub probe: bool,

    /// Disable progress bars
    #[arg(long)]
    pub no_progress: bool,

    /// HTTP connect timeout in seconds
    #[arg(long, default_value_t = CONNECT_TIMEOUT_SECS, value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub connect_timeout_secs: u64,

    /// HTTP whole-request timeout in seconds
    #[arg(long, default_value_t = READ_TIMEOUT_SECS, value_parser = clap::value_parser!(u64).range(1..=86_400))]
    pub read_timeout_secs: u64,
}
