//! Outbound rate limiting.
//!
//! Implements a token bucket in front of every outbound write:
//! - Tokens are added at a fixed rate per second, up to the burst size
//! - Each write costs 1 token
//! - If no token is available, the writer waits until one is
//!
//! Unlike inbound flood protection, nothing is ever rejected; senders queue.

use std::future::Future;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

/// Longest single wait; very slow rates would otherwise overflow a `Duration`.
const MAX_WAIT: Duration = Duration::from_secs(24 * 60 * 60);

/// Token bucket state.
#[derive(Debug)]
struct TokenBucket {
    tokens: f64,
    last_check: Instant,
    rate: f64,
    capacity: f64,
}

impl TokenBucket {
    /// Create a full bucket.
    ///
    /// # Arguments
    /// * `rate` - Tokens added per second
    /// * `capacity` - Maximum token capacity (burst size)
    fn new(rate: f64, capacity: f64) -> Self {
        Self {
            tokens: capacity,
            last_check: Instant::now(),
            rate,
            capacity,
        }
    }

    /// Try to take a token.
    ///
    /// Returns `Ok(())` if a token was consumed, or how long until one will be
    /// available.
    fn take(&mut self) -> Result<(), Duration> {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_check).as_secs_f64();
        self.last_check = now;

        // Add tokens for elapsed time
        self.tokens = (self.tokens + elapsed * self.rate).min(self.capacity);

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            Ok(())
        } else {
            let wait = (1.0 - self.tokens) / self.rate;
            Err(Duration::try_from_secs_f64(wait).map_or(MAX_WAIT, |w| w.min(MAX_WAIT)))
        }
    }
}

/// Serializing gate for outbound writes.
///
/// Callers pass through one at a time, in the order they arrived; the lock is
/// held across both the wait for a token and the operation itself.
#[derive(Debug)]
pub struct Throttler {
    gate: Mutex<Option<TokenBucket>>,
    limited: bool,
}

impl Throttler {
    /// A burst or rate of zero disables the bucket (ordering still applies).
    pub fn new(burst: u32, rate: f64) -> Self {
        let bucket = (burst > 0 && rate > 0.0).then(|| TokenBucket::new(rate, f64::from(burst)));
        Self {
            limited: bucket.is_some(),
            gate: Mutex::new(bucket),
        }
    }

    /// No limits, only ordering.
    pub fn unlimited() -> Self {
        Self::new(0, 0.0)
    }

    pub fn is_limited(&self) -> bool {
        self.limited
    }

    /// Wait for a token, then run `op`.
    pub async fn throttle<F, Fut, T>(&self, op: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let mut gate = self.gate.lock().await;
        if let Some(bucket) = gate.as_mut() {
            while let Err(wait) = bucket.take() {
                tracing::trace!(wait_ms = wait.as_millis() as u64, "throttled");
                tokio::time::sleep(wait).await;
            }
        }
        op().await
    }
}

impl Default for Throttler {
    fn default() -> Self {
        Self::unlimited()
    }
}
