//! Run settings: merge CLI flags over manifest values over built-in defaults.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use fetchpool_core::download::{DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_DELAY, RetryPolicy};
use fetchpool_core::manifest::{Manifest, RetrySettings};
use fetchpool_core::pool::{DEFAULT_WORKERS, PoolConfig};

use crate::cli::{Args, BackoffKind};

/// Effective settings for one run.
#[derive(Debug)]
pub(crate) struct RunSettings {
    pub(crate) pool: PoolConfig,
    pub(crate) retry: RetrySettings,
    pub(crate) max_attempts: u32,
    pub(crate) output_dir: PathBuf,
}

impl RunSettings {
    pub(crate) fn resolve(args: &Args, manifest: &Manifest) -> Result<Self> {
        let workers = args
            .workers
            .map(usize::from)
            .or(manifest.workers)
            .unwrap_or(DEFAULT_WORKERS);
        let mut pool = PoolConfig::new(workers)
            .context("invalid effective worker count")?
            .with_probe_metadata(args.probe);
        if let Some(capacity) = args.queue_capacity {
            pool = pool.with_queue_capacity(usize::from(capacity))?;
        }

        let max_attempts = args
            .max_attempts
            .map(u32::from)
            .or(manifest.max_attempts)
            .unwrap_or(DEFAULT_MAX_ATTEMPTS);

        let output_dir = args
            .output_dir
            .clone()
            .unwrap_or_else(|| manifest_dir(&args.manifest));

        Ok(Self {
            pool,
            retry: resolve_retry(args, manifest.retry.as_ref()),
            max_attempts,
            output_dir,
        })
    }

    pub(crate) fn retry_policy(&self) -> RetryPolicy {
        self.retry.to_policy()
    }
}

/// Directory containing the manifest, `.` for a bare file name.
fn manifest_dir(manifest: &Path) -> PathBuf {
    match manifest.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn default_fixed() -> RetrySettings {
    RetrySettings::Fixed {
        delay_ms: u64::try_from(DEFAULT_RETRY_DELAY.as_millis()).unwrap_or(2000),
    }
}

fn default_exponential() -> RetrySettings {
    RetrySettings::Exponential {
        base_ms: None,
        max_ms: None,
        multiplier: None,
        jitter_ms: None,
    }
}

/// The CLI strategy replaces the manifest's unless they agree, in which
/// case the manifest's tuning is kept. `--retry-delay-ms` then overrides
/// the delay (or base delay) of whichever strategy won.
fn resolve_retry(args: &Args, manifest: Option<&RetrySettings>) -> RetrySettings {
    let mut settings = match (args.backoff, manifest) {
        (None, Some(settings))
        | (Some(BackoffKind::Fixed), Some(settings @ RetrySettings::Fixed { .. }))
        | (Some(BackoffKind::Exponential), Some(settings @ RetrySettings::Exponential { .. })) => {
            settings.clone()
        }
        (Some(BackoffKind::Exponential), _) => default_exponential(),
        (Some(BackoffKind::Fixed) | None, _) => default_fixed(),
    };

    if let Some(ms) = args.retry_delay_ms {
        match &mut settings {
            RetrySettings::Fixed { delay_ms } => *delay_ms = ms,
            RetrySettings::Exponential { base_ms, .. } => *base_ms = Some(ms),
        }
    }
    settings
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::path::Path;

    use clap::Parser;

    use super::*;

    fn manifest(text: &str) -> Manifest {
        Manifest::parse(text, Path::new("m.json")).unwrap()
    }

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["fetchpool", "dir/jobs.json"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_resolve_defaults_without_manifest_values() {
        let settings = RunSettings::resolve(&args(&[]), &manifest(r#"{ "jobs": [] }"#)).unwrap();
        assert_eq!(settings.pool.worker_count(), DEFAULT_WORKERS);
        assert_eq!(settings.max_attempts, DEFAULT_MAX_ATTEMPTS);
        assert_eq!(settings.retry, default_fixed());
        assert_eq!(settings.output_dir, PathBuf::from("dir"));
    }

    #[test]
    fn test_resolve_manifest_values_apply() {
        let m = manifest(
            r#"{ "workers": 7, "max_attempts": 5,
                 "retry": { "strategy": "fixed", "delay_ms": 10 }, "jobs": [] }"#,
        );
        let settings = RunSettings::resolve(&args(&[]), &m).unwrap();
        assert_eq!(settings.pool.worker_count(), 7);
        assert_eq!(settings.max_attempts, 5);
        assert_eq!(settings.retry, RetrySettings::Fixed { delay_ms: 10 });
    }

    #[test]
    fn test_resolve_cli_overrides_manifest() {
        let m = manifest(
            r#"{ "workers": 7, "max_attempts": 5,
                 "retry": { "strategy": "fixed", "delay_ms": 10 }, "jobs": [] }"#,
        );
        let settings = RunSettings::resolve(
            &args(&["-w", "2", "-r", "1", "--retry-delay-ms", "99", "-o", "elsewhere"]),
            &m,
        )
        .unwrap();
        assert_eq!(settings.pool.worker_count(), 2);
        assert_eq!(settings.max_attempts, 1);
        assert_eq!(settings.retry, RetrySettings::Fixed { delay_ms: 99 });
        assert_eq!(settings.output_dir, PathBuf::from("elsewhere"));
    }

    #[test]
    fn test_resolve_invalid_manifest_worker_count() {
        let m = manifest(r#"{ "workers": 0, "jobs": [] }"#);
        assert!(RunSettings::resolve(&args(&[]), &m).is_err());
    }

    #[test]
    fn test_resolve_retry_switches_strategy() {
        let m = manifest(r#"{ "retry": { "strategy": "fixed", "delay_ms": 10 }, "jobs": [] }"#);
        let settings =
            RunSettings::resolve(&args(&["--backoff", "exponential", "--retry-delay-ms", "50"]), &m)
                .unwrap();
        assert!(matches!(
            settings.retry,
            RetrySettings::Exponential { base_ms: Some(50), .. }
        ));
    }

    #[test]
    fn test_resolve_retry_keeps_matching_manifest_tuning() {
        let m = manifest(
            r#"{ "retry": { "strategy": "exponential", "max_ms": 900 }, "jobs": [] }"#,
        );
        let settings = RunSettings::resolve(&args(&["--backoff", "exponential"]), &m).unwrap();
        assert!(matches!(
            settings.retry,
            RetrySettings::Exponential { max_ms: Some(900), .. }
        ));
    }

    #[test]
    fn test_manifest_dir_for_bare_file_name() {
        assert_eq!(manifest_dir(Path::new("jobs.json")), PathBuf::from("."));
    }
}
