//! Rate limit cooldown tracking

use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Longest cooldown honored; longer ones are clamped
pub const MAX_COOLDOWN: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Remembers until when a model is rate limited
#[derive(Debug, Default)]
pub struct RateLimitTracker {
    reset_at: Mutex<Option<Instant>>,
}

impl RateLimitTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start (or replace) a cooldown lasting `duration` from now
    pub fn set_limited(&self, duration: Duration) {
        let reset_at = Instant::now() + duration.min(MAX_COOLDOWN);
        *self
            .reset_at
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(reset_at);
    }

    /// Whether the cooldown is still active; an expired cooldown is cleared
    pub fn limited(&self) -> bool {
        let mut reset_at = self
            .reset_at
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        match *reset_at {
            Some(at) if Instant::now() < at => true,
            Some(_) => {
                *reset_at = None;
                false
            }
            None => false,
        }
    }

    /// Remaining cooldown, if any
    pub fn reset_in(&self) -> Option<Duration> {
        self.reset_at
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .and_then(|at| at.checked_duration_since(Instant::now()))
            .filter(|remaining| !remaining.is_zero())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_limited_by_default() {
        let tracker = RateLimitTracker::new();
        assert!(!tracker.limited());
        assert!(tracker.reset_in().is_none());
    }

    #[test]
    fn test_limited_until_cooldown_expires() {
        let tracker = RateLimitTracker::new();
        tracker.set_limited(Duration::from_millis(30));

        assert!(tracker.limited());
        let remaining = tracker.reset_in().unwrap();
        assert!(remaining <= Duration::from_millis(30));

        std::thread::sleep(Duration::from_millis(40));
        assert!(!tracker.limited());
        assert!(tracker.reset_in().is_none());
    }

    #[test]
    fn test_new_cooldown_replaces_old() {
        let tracker = RateLimitTracker::new();
        tracker.set_limited(Duration::from_secs(60));
        tracker.set_limited(Duration::ZERO);

        assert!(!tracker.limited());
    }

    #[test]
    fn test_huge_cooldown_is_clamped() {
        let tracker = RateLimitTracker::new();
        tracker.set_limited(Duration::MAX);

        assert!(tracker.limited());
        assert!(tracker.reset_in().unwrap() <= MAX_COOLDOWN);
    }
}
