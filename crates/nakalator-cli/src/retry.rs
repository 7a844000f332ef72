//! Retry policies
//!
//! Two levels of retry are used during a run:
//! - [`Backoff`] retries a single HTTP call on transport failures (connection
//!   refused, timeout) with exponential delays inside a time budget.
//! - [`RetryPolicy`] bounds the upload rounds that re-send files which came
//!   back without a checksum.

use crate::error::Result;
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Exponential backoff for transport errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    /// Delay before the first retry
    pub initial_delay: Duration,

    /// Upper bound for one delay
    pub max_delay: Duration,

    /// Total time allowed across attempts
    pub budget: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(16),
            budget: Duration::from_secs(60),
        }
    }
}

impl Backoff {
    /// A single attempt, no retry
    pub fn none() -> Self {
        Self {
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            budget: Duration::ZERO,
        }
    }
}

/// Run `op` until it succeeds, fails with a non-transient error, or the
/// backoff budget runs out. The last error is returned.
pub async fn retry_transient<T, F, Fut>(backoff: &Backoff, what: &str, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let started = Instant::now();
    let mut delay = backoff.initial_delay;
    let mut attempt: u32 = 1;

    loop {
        match op().await {
            Ok(value) => {
                if attempt > 1 {
                    debug!(what, attempt, "Succeeded after retry");
                }
                return Ok(value);
            },
            Err(e) if e.is_transient() && started.elapsed() + delay < backoff.budget => {
                warn!(
                    what,
                    attempt,
                    backoff_ms = delay.as_millis() as u64,
                    error = %e,
                    "Transport error, retrying..."
                );
                tokio::time::sleep(delay).await;
                delay = (delay * 2).min(backoff.max_delay);
                attempt += 1;
            },
            Err(e) => return Err(e),
        }
    }
}

/// Bounds on the rounds re-sending files that got no checksum
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retry rounds after the first one
    pub max_rounds: u32,

    /// Wall-clock limit for the whole upload of a job
    pub max_elapsed: Duration,

    /// Pause before each retry round
    pub round_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_rounds: 10,
            max_elapsed: Duration::from_secs(30 * 60),
            round_delay: Duration::from_secs(5),
        }
    }
}
