//! Progress UI: one bar per active job under an overall counter.

use std::collections::HashMap;

use fetchpool_core::job::JobId;
use fetchpool_core::pool::{EventReceiver, EventSender, PoolEvent, event_channel};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use tokio::task::JoinHandle;
use url::Url;

/// Whether progress bars should be drawn.
pub(crate) fn should_show_progress(
    no_progress: bool,
    quiet: bool,
    stderr_is_terminal: bool,
    dumb_terminal: bool,
) -> bool {
    !no_progress && !quiet && stderr_is_terminal && !dumb_terminal
}

/// `TERM=dumb` terminals can't redraw bars in place.
pub(crate) fn is_dumb_terminal() -> bool {
    std::env::var("TERM").is_ok_and(|term| term.eq_ignore_ascii_case("dumb"))
}

/// Spawns the progress UI when requested.
///
/// Returns the sender to hand to the pool and the render task. The task
/// ends once every sender clone is dropped, i.e. when the pool is done.
pub(crate) fn spawn_progress_ui(
    enabled: bool,
    total_jobs: usize,
) -> (Option<EventSender>, Option<JoinHandle<()>>) {
    if !enabled {
        return (None, None);
    }
    let (tx, rx) = event_channel();
    let handle = tokio::spawn(render(rx, MultiProgress::new(), total_jobs));
    (Some(tx), Some(handle))
}

async fn render(mut events: EventReceiver, multi: MultiProgress, total_jobs: usize) {
    let overall = multi.add(ProgressBar::new(total_jobs as u64));
    overall.set_style(
        ProgressStyle::with_template("{spinner} [{pos}/{len}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    overall.set_message("jobs finished");

    let mut bars: HashMap<JobId, ProgressBar> = HashMap::new();
    while let Some(event) = events.recv().await {
        let id = event.job_id();
        match event {
            PoolEvent::JobStarted {
                source, size_hint, ..
            } => {
                let bar = multi.add(job_bar(size_hint));
                bar.set_message(display_name(&source));
                bars.insert(id, bar);
            }
            PoolEvent::AttemptStarted {
                attempt,
                max_attempts,
                ..
            } => {
                if let Some(bar) = bars.get(&id)
                    && attempt > 1
                {
                    bar.set_position(0);
                    bar.set_prefix(format!("{attempt}/{max_attempts}"));
                }
            }
            PoolEvent::BytesWritten { written, total, .. } => {
                if let Some(bar) = bars.get(&id) {
                    if let Some(total) = total {
                        bar.set_length(total);
                    }
                    bar.set_position(written);
                }
            }
            PoolEvent::AttemptFailed {
                kind,
                retry_in: Some(delay),
                ..
            } => {
                if let Some(bar) = bars.get(&id) {
                    bar.set_prefix(format!("{kind}, retry in {}ms", delay.as_millis()));
                }
            }
            PoolEvent::AttemptFailed { retry_in: None, .. } => {}
            PoolEvent::JobFinished { outcome, .. } => {
                if let Some(bar) = bars.remove(&id) {
                    if !outcome.is_completed() {
                        overall.println(format!("failed: {} ({outcome})", bar.message()));
                    }
                    bar.finish_and_clear();
                    multi.remove(&bar);
                }
                overall.inc(1);
            }
        }
    }

    overall.finish_and_clear();
}

fn job_bar(size_hint: Option<u64>) -> ProgressBar {
    let bar = ProgressBar::new(size_hint.unwrap_or(0));
    bar.set_style(
        ProgressStyle::with_template("  {prefix:>12} {msg:30!} {bytes:>10}/{total_bytes:<10} {bar:25}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    bar
}

/// Last path segment of a URL source, or the source itself.
fn display_name(source: &str) -> String {
    Url::parse(source)
        .ok()
        .and_then(|url| {
            url.path_segments()
                .and_then(|mut segments| segments.next_back().map(str::to_string))
                .filter(|segment| !segment.is_empty())
        })
        .unwrap_or_else(|| source.to_string())
}
