//! Retry policy for transient network errors.

use rand::Rng;
use std::time::Duration;
use tokio_retry2::strategy::FixedInterval;

/// Fixed-interval retry policy.
///
/// The default retries forever, waiting one second between attempts. Sheets
/// are usually fetched unattended, so a flaky connection should delay the
/// run rather than fail it. Set `max_retries` to give up after a number of
/// retries instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Wait between a failed attempt and the next one.
    pub interval: Duration,
    /// Stretch each wait by a random 0-100% of `interval`.
    pub jitter: bool,
    /// Retries allowed after the first attempt. `None` retries forever.
    pub max_retries: Option<usize>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            jitter: false,
            max_retries: None,
        }
    }
}

impl RetryPolicy {
    /// Delays to wait before each retry, in order.
    pub fn delays(&self) -> impl Iterator<Item = Duration> + Send + 'static {
        let jitter = self.jitter;
        FixedInterval::new(self.interval)
            .map(move |delay| if jitter { add_jitter(delay) } else { delay })
            .take(self.max_retries.unwrap_or(usize::MAX))
    }
}

/// Adds a uniformly distributed 0-100% of `delay`, giving a wait between
/// `delay` and `2 * delay`.
fn add_jitter(delay: Duration) -> Duration {
    let jitter_factor: f64 = rand::thread_rng().gen_range(0.0..=1.0);
    Duration::from_secs_f64(delay.as_secs_f64() * (1.0 + jitter_factor))
}
