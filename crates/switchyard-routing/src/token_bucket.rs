//! Lock-free token bucket
//!
//! The bucket never stores a token count. It keeps a single virtual-time
//! pointer: taking `n` tokens moves the pointer forward by `n * time_per_token`,
//! and the pointer is never allowed to fall further behind `now` than one full
//! burst. A take succeeds only if the moved pointer does not pass `now`.
//!
//! ```rust
//! use switchyard_routing::TokenBucket;
//!
//! // 3 tokens, one regenerated every minute
//! let bucket = TokenBucket::new(3, 60_000_000);
//! assert!(bucket.take(1).is_ok());
//! assert!(bucket.take(2).is_ok());
//! assert!(bucket.take(1).is_err());
//! ```

use once_cell::sync::Lazy;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Instant, SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// Source of the current time in microseconds
pub trait Clock: Send + Sync {
    fn now_micros(&self) -> u64;
}

/// Process anchor: the first observed instant and its wall-clock time
static ANCHOR: Lazy<(Instant, u64)> = Lazy::new(|| {
    let wall = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as u64)
        .unwrap_or_default();
    (Instant::now(), wall)
});

/// Monotonic clock anchored to wall-clock microseconds at first use
#[derive(Debug, Clone, Copy, Default)]
pub struct MonotonicClock;

impl Clock for MonotonicClock {
    fn now_micros(&self) -> u64 {
        let (start, wall) = *ANCHOR;
        wall.saturating_add(start.elapsed().as_micros() as u64)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Not enough tokens in the bucket")]
pub struct NoTokens;

/// Virtual-time token bucket
#[derive(Debug)]
pub struct TokenBucket<C: Clock = MonotonicClock> {
    time_pointer: AtomicU64,
    time_per_token: u64,
    time_per_burst: u64,
    clock: C,
}

impl TokenBucket<MonotonicClock> {
    /// Create a bucket holding `burst` tokens, each regenerated every
    /// `time_per_token_micros`
    pub fn new(burst: u32, time_per_token_micros: u64) -> Self {
        Self::with_clock(burst, time_per_token_micros, MonotonicClock)
    }
}

impl<C: Clock> TokenBucket<C> {
    pub fn with_clock(burst: u32, time_per_token_micros: u64, clock: C) -> Self {
        let time_per_token = time_per_token_micros.max(1);

        Self {
            time_pointer: AtomicU64::new(0),
            time_per_token,
            time_per_burst: (burst as u64).saturating_mul(time_per_token),
            clock,
        }
    }

    /// Take `n` tokens, or fail without changing the bucket
    pub fn take(&self, n: u32) -> Result<(), NoTokens> {
        let time_needed = (n as u64).saturating_mul(self.time_per_token);
        let mut old = self.time_pointer.load(Ordering::Acquire);

        loop {
            let now = self.clock.now_micros();
            let min_pointer = now.saturating_sub(self.time_per_burst);
            let new = old.max(min_pointer).saturating_add(time_needed);

            if new > now {
                return Err(NoTokens);
            }

            match self.time_pointer.compare_exchange_weak(
                old,
                new,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return Ok(()),
                Err(current) => old = current,
            }
        }
    }

    /// Estimated number of available tokens
    pub fn tokens(&self) -> f64 {
        let now = self.clock.now_micros();
        let pointer = self
            .time_pointer
            .load(Ordering::Acquire)
            .max(now.saturating_sub(self.time_per_burst));

        now.saturating_sub(pointer) as f64 / self.time_per_token as f64
    }

    pub fn has_tokens(&self) -> bool {
        self.tokens() >= 1.0
    }
}
