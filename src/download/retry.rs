//! Retry policy with pluggable backoff strategies.
//!
//! The worker only asks two questions of a [`RetryPolicy`]: is there another
//! attempt left, and how long should it wait before making it. The second
//! answer comes from a [`Backoff`] strategy, so constant, exponential or
//! custom delays can be swapped in without touching the worker.
//!
//! # Example
//!
//! ```
//! use fetchpool_core::download::{ExponentialBackoff, RetryDecision, RetryPolicy};
//!
//! let policy = RetryPolicy::new(ExponentialBackoff::default());
//! match policy.decide(1, 3) {
//!     RetryDecision::Retry { delay, attempt } => {
//!         println!("Retrying in {:?} (attempt {})", delay, attempt);
//!     }
//!     RetryDecision::DoNotRetry { reason } => {
//!         println!("Not retrying: {}", reason);
//!     }
//! }
//! ```

use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tracing::{debug, instrument};

use super::constants::DEFAULT_RETRY_DELAY;

/// Default base delay for exponential backoff (1 second).
const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);

/// Default maximum delay cap (32 seconds).
const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(32);

/// Default backoff multiplier (doubles each attempt).
const DEFAULT_BACKOFF_MULTIPLIER: f32 = 2.0;

/// Default maximum jitter added to exponential delays (500ms).
const DEFAULT_MAX_JITTER: Duration = Duration::from_millis(500);

/// Strategy computing the wait before the next attempt.
pub trait Backoff: Debug + Send + Sync {
    /// Returns the delay to wait after `attempt` (1-indexed) failed.
    fn next_delay(&self, attempt: u32) -> Duration;
}

/// Constant delay independent of the attempt number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedDelay {
    delay: Duration,
}

impl FixedDelay {
    /// Creates a fixed backoff of `delay`.
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Default for FixedDelay {
    fn default() -> Self {
        Self::new(DEFAULT_RETRY_DELAY)
    }
}

impl Backoff for FixedDelay {
    fn next_delay(&self, _attempt: u32) -> Duration {
        self.delay
    }
}

/// Exponential backoff with a cap and bounded random jitter.
///
/// ```text
/// delay = min(base_delay * multiplier^(attempt - 1), max_delay) + jitter
/// ```
///
/// With defaults, delays are approximately: 1s, 2s, 4s, 8s ...
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    base_delay: Duration,
    max_delay: Duration,
    multiplier: f32,
    max_jitter: Duration,
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self {
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            multiplier: DEFAULT_BACKOFF_MULTIPLIER,
            max_jitter: DEFAULT_MAX_JITTER,
        }
    }
}

impl ExponentialBackoff {
    /// Creates an exponential backoff with custom settings.
    ///
    /// # Arguments
    ///
    /// * `base_delay` - Delay after the first failed attempt
    /// * `max_delay` - Cap applied before jitter
    /// * `multiplier` - Growth factor per attempt
    /// * `max_jitter` - Upper bound of the random jitter (zero disables it)
    #[must_use]
    pub fn new(base_delay: Duration, max_delay: Duration, multiplier: f32, max_jitter: Duration) -> Self {
        Self {
            base_delay,
            max_delay,
            multiplier,
            max_jitter,
        }
    }

    /// Delay after the first failed attempt.
    #[must_use]
    pub fn base_delay(&self) -> Duration {
        self.base_delay
    }

    /// Cap applied before jitter.
    #[must_use]
    pub fn max_delay(&self) -> Duration {
        self.max_delay
    }

    /// Growth factor per attempt.
    #[must_use]
    pub fn multiplier(&self) -> f32 {
        self.multiplier
    }

    /// Upper bound of the random jitter.
    #[must_use]
    pub fn max_jitter(&self) -> Duration {
        self.max_jitter
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    fn capped_delay(&self, attempt: u32) -> Duration {
        let base_ms = self.base_delay.as_millis() as f64;
        let exponent = f64::from(attempt.saturating_sub(1));
        let delay_ms = base_ms * f64::from(self.multiplier).powf(exponent);
        let capped_ms = delay_ms.min(self.max_delay.as_millis() as f64);
        Duration::from_millis(capped_ms as u64)
    }

    #[allow(clippy::cast_possible_truncation)]
    fn jitter(&self) -> Duration {
        let max_ms = self.max_jitter.as_millis() as u64;
        if max_ms == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::thread_rng().gen_range(0..=max_ms))
    }
}

impl Backoff for ExponentialBackoff {
    fn next_delay(&self, attempt: u32) -> Duration {
        self.capped_delay(attempt) + self.jitter()
    }
}

/// Decision on whether to retry a failed attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry after the specified delay.
    Retry {
        /// How long to wait before retrying.
        delay: Duration,
        /// Which attempt number this will be (1-indexed, so first retry is attempt 2).
        attempt: u32,
    },

    /// Stop; the job's attempt budget is spent.
    DoNotRetry {
        /// Human-readable reason why retry is not attempted.
        reason: String,
    },
}

/// Retry policy shared by every worker in a pool.
///
/// The attempt budget lives on each job; the policy only turns an attempt
/// count into a decision and a delay.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    backoff: Arc<dyn Backoff>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(FixedDelay::default())
    }
}

impl RetryPolicy {
    /// Creates a policy backed by `backoff`.
    #[must_use]
    pub fn new(backoff: impl Backoff + 'static) -> Self {
        Self {
            backoff: Arc::new(backoff),
        }
    }

    /// Creates a constant-delay policy.
    #[must_use]
    pub fn fixed(delay: Duration) -> Self {
        Self::new(FixedDelay::new(delay))
    }

    /// Returns the configured backoff strategy.
    #[must_use]
    pub fn backoff(&self) -> &dyn Backoff {
        self.backoff.as_ref()
    }

    /// Returns the wait before the attempt after `attempt`.
    #[must_use]
    pub fn next_delay(&self, attempt: u32) -> Duration {
        self.backoff.next_delay(attempt)
    }

    /// Determines whether to retry after `attempt` (1-indexed) failed.
    #[instrument(level = "debug", skip(self))]
    pub fn decide(&self, attempt: u32, max_attempts: u32) -> RetryDecision {
        if attempt >= max_attempts {
            debug!(attempt, max = max_attempts, "max attempts reached");
            return RetryDecision::DoNotRetry {
                reason: format!("max attempts ({max_attempts}) exhausted"),
            };
        }

        let delay = self.next_delay(attempt);
        debug!(
            attempt,
            next_attempt = attempt + 1,
            delay_ms = delay.as_millis(),
            "will retry"
        );

        RetryDecision::Retry {
            delay,
            attempt: attempt + 1,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_delay_ignores_attempt_number() {
        let backoff = FixedDelay::new(Duration::from_millis(250));
        assert_eq!(backoff.next_delay(1), Duration::from_millis(250));
        assert_eq!(backoff.next_delay(7), Duration::from_millis(250));
    }

    #[test]
    fn test_fixed_delay_default_is_two_seconds() {
        assert_eq!(FixedDelay::default().next_delay(1), Duration::from_secs(2));
    }

    #[test]
    fn test_exponential_without_jitter_doubles() {
        let backoff = ExponentialBackoff::new(
            Duration::from_secs(1),
            Duration::from_secs(32),
            2.0,
            Duration::ZERO,
        );
        assert_eq!(backoff.next_delay(1), Duration::from_secs(1));
        assert_eq!(backoff.next_delay(2), Duration::from_secs(2));
        assert_eq!(backoff.next_delay(3), Duration::from_secs(4));
    }

    #[test]
    fn test_exponential_respects_max_delay() {
        let backoff = ExponentialBackoff::new(
            Duration::from_secs(1),
            Duration::from_secs(5),
            2.0,
            Duration::ZERO,
        );
        // 6th attempt would be 1 * 2^5 = 32s, but capped at 5s
        assert_eq!(backoff.next_delay(6), Duration::from_secs(5));
    }

    #[test]
    fn test_exponential_jitter_within_bounds() {
        let backoff = ExponentialBackoff::default();
        for _ in 0..100 {
            let delay = backoff.next_delay(1);
            assert!(delay >= Duration::from_secs(1));
            assert!(delay <= Duration::from_millis(1500), "delay {delay:?} exceeds jitter bound");
        }
    }

    #[test]
    fn test_decide_retries_until_budget_spent() {
        let policy = RetryPolicy::fixed(Duration::from_millis(10));

        let decision = policy.decide(1, 3);
        assert_eq!(
            decision,
            RetryDecision::Retry {
                delay: Duration::from_millis(10),
                attempt: 2
            }
        );

        assert!(matches!(policy.decide(2, 3), RetryDecision::Retry { attempt: 3, .. }));

        let decision = policy.decide(3, 3);
        assert!(matches!(decision, RetryDecision::DoNotRetry { .. }));
        if let RetryDecision::DoNotRetry { reason } = decision {
            assert!(reason.contains("exhausted"));
        }
    }

    #[test]
    fn test_decide_single_attempt_never_retries() {
        let policy = RetryPolicy::default();
        assert!(matches!(policy.decide(1, 1), RetryDecision::DoNotRetry { .. }));
    }

    #[test]
    fn test_custom_backoff_is_used() {
        #[derive(Debug)]
        struct Linear;
        impl Backoff for Linear {
            fn next_delay(&self, attempt: u32) -> Duration {
                Duration::from_millis(u64::from(attempt) * 100)
            }
        }

        let policy = RetryPolicy::new(Linear);
        assert_eq!(policy.next_delay(3), Duration::from_millis(300));
        assert!(matches!(
            policy.decide(2, 5),
            RetryDecision::Retry { delay, .. } if delay == Duration::from_millis(200)
        ));
    }
}
