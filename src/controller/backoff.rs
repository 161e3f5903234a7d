//! # Backoff
//!
//! Rate limiters deciding how long a failed key waits before it is retried.
//!
//! The controller combines two limiters and waits for the longer of the two:
//!
//! - [`ItemExponentialBackoff`]: per-key delay doubling on every failure
//!   (5ms, 10ms, 20ms, ... capped at 1000s by default)
//! - [`TokenBucket`]: an overall admission rate shared by all keys
//!   (10 per second with a burst of 100 by default)
//!
//! ## Usage
//!
//! ```rust
//! use robot_operator::controller::backoff::{ItemExponentialBackoff, RateLimiter};
//! use std::time::Duration;
//!
//! let limiter = ItemExponentialBackoff::new(Duration::from_millis(5), Duration::from_secs(1000));
//! let key = "default/r1".to_string();
//! assert_eq!(limiter.when(&key), Duration::from_millis(5));
//! assert_eq!(limiter.when(&key), Duration::from_millis(10));
//! limiter.forget(&key);
//! assert_eq!(limiter.when(&key), Duration::from_millis(5));
//! ```

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

/// Decides the retry delay for an item
pub trait RateLimiter<T>: Send + Sync {
    /// Delay before the item may be processed again; records a failure
    fn when(&self, item: &T) -> Duration;

    /// Stop tracking the item (success or permanent drop)
    fn forget(&self, item: &T);

    /// Number of failures recorded for the item since the last `forget`
    fn num_requeues(&self, item: &T) -> u32;
}

/// Per-item exponential backoff
///
/// Each failure doubles the item's delay, starting at `base` and capped at `max`.
pub struct ItemExponentialBackoff<T> {
    base: Duration,
    max: Duration,
    failures: Mutex<HashMap<T, u32>>,
}

impl<T> fmt::Debug for ItemExponentialBackoff<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ItemExponentialBackoff")
            .field("base", &self.base)
            .field("max", &self.max)
            .finish_non_exhaustive()
    }
}

impl<T> ItemExponentialBackoff<T> {
    #[must_use]
    pub fn new(base: Duration, max: Duration) -> Self {
        Self {
            base,
            max,
            failures: Mutex::new(HashMap::new()),
        }
    }

    /// Delay for an item that has already failed `failures` times
    #[must_use]
    pub fn delay_for(&self, failures: u32) -> Duration {
        // 2^31 * base overflows long before it is useful; clamp the exponent
        let factor = 2u32.checked_pow(failures.min(31)).unwrap_or(u32::MAX);
        self.base
            .checked_mul(factor)
            .map_or(self.max, |delay| delay.min(self.max))
    }
}

impl<T> RateLimiter<T> for ItemExponentialBackoff<T>
where
    T: Clone + Eq + Hash + Send,
{
    fn when(&self, item: &T) -> Duration {
        let Ok(mut failures) = self.failures.lock() else {
            return self.max;
        };
        let count = failures.entry(item.clone()).or_insert(0);
        let delay = self.delay_for(*count);
        *count = count.saturating_add(1);
        delay
    }

    fn forget(&self, item: &T) {
        if let Ok(mut failures) = self.failures.lock() {
            failures.remove(item);
        }
    }

    fn num_requeues(&self, item: &T) -> u32 {
        self.failures
            .lock()
            .ok()
            .and_then(|failures| failures.get(item).copied())
            .unwrap_or(0)
    }
}

/// Overall token bucket shared by every item
///
/// Each call to `when` reserves a token; once the burst is spent callers are
/// spaced out at `qps`.
#[derive(Debug)]
pub struct TokenBucket {
    qps: f64,
    burst: f64,
    state: Mutex<BucketState>,
}

#[derive(Debug)]
struct BucketState {
    tokens: f64,
    last: Instant,
}

impl TokenBucket {
    #[must_use]
    pub fn new(qps: f64, burst: u32) -> Self {
        let burst = f64::from(burst.max(1));
        Self {
            qps: qps.max(f64::MIN_POSITIVE),
            burst,
            state: Mutex::new(BucketState {
                tokens: burst,
                last: Instant::now(),
            }),
        }
    }

    /// Reserve one token and return how long the caller has to wait for it
    pub fn reserve(&self) -> Duration {
        let Ok(mut state) = self.state.lock() else {
            return Duration::ZERO;
        };
        let now = Instant::now();
        let elapsed = now.saturating_duration_since(state.last).as_secs_f64();
        state.tokens = (state.tokens + elapsed * self.qps).min(self.burst);
        state.last = now;
        state.tokens -= 1.0;
        if state.tokens >= 0.0 {
            Duration::ZERO
        } else {
            Duration::from_secs_f64(-state.tokens / self.qps)
        }
    }
}

impl<T> RateLimiter<T> for TokenBucket {
    fn when(&self, _item: &T) -> Duration {
        self.reserve()
    }

    fn forget(&self, _item: &T) {}

    fn num_requeues(&self, _item: &T) -> u32 {
        0
    }
}

/// Waits for the longest delay of all inner limiters
pub struct MaxOf<T> {
    limiters: Vec<Box<dyn RateLimiter<T>>>,
}

impl<T> fmt::Debug for MaxOf<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MaxOf")
            .field("limiters", &self.limiters.len())
            .finish()
    }
}

impl<T> MaxOf<T> {
    #[must_use]
    pub fn new(limiters: Vec<Box<dyn RateLimiter<T>>>) -> Self {
        Self { limiters }
    }
}

impl<T> RateLimiter<T> for MaxOf<T> {
    fn when(&self, item: &T) -> Duration {
        self.limiters
            .iter()
            .map(|limiter| limiter.when(item))
            .max()
            .unwrap_or(Duration::ZERO)
    }

    fn forget(&self, item: &T) {
        for limiter in &self.limiters {
            limiter.forget(item);
        }
    }

    fn num_requeues(&self, item: &T) -> u32 {
        self.limiters
            .iter()
            .map(|limiter| limiter.num_requeues(item))
            .max()
            .unwrap_or(0)
    }
}

/// Per-item exponential backoff combined with an overall token bucket
#[must_use]
pub fn controller_rate_limiter<T>(
    base: Duration,
    max: Duration,
    qps: f64,
    burst: u32,
) -> MaxOf<T>
where
    T: Clone + Eq + Hash + Send + 'static,
{
    MaxOf::new(vec![
        Box::new(ItemExponentialBackoff::new(base, max)),
        Box::new(TokenBucket::new(qps, burst)),
    ])
}
