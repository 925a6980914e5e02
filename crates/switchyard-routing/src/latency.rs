//! Exponentially weighted moving average with warm-up
//!
//! The first `warmup_samples` samples only accumulate. The next sample seeds
//! the average with their mean and is then folded in, so a single early
//! outlier cannot dominate the estimate.

use std::sync::RwLock;

#[derive(Debug)]
struct State {
    value: f64,
    sum: f64,
    count: u8,
}

#[derive(Debug)]
pub struct MovingAverage {
    decay: f64,
    warmup_samples: u8,
    state: RwLock<State>,
}

impl MovingAverage {
    /// `decay` is the weight of each new sample, in `(0, 1]`
    pub fn new(decay: f64, warmup_samples: u8) -> Self {
        Self {
            decay,
            warmup_samples,
            state: RwLock::new(State {
                value: 0.0,
                sum: 0.0,
                count: 0,
            }),
        }
    }

    pub fn add(&self, sample: f64) {
        let mut state = self
            .state
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if state.count < self.warmup_samples {
            state.count += 1;
            state.sum += sample;
            return;
        }

        if state.count == self.warmup_samples {
            state.count = state.count.saturating_add(1);
            state.value = if self.warmup_samples == 0 {
                sample
            } else {
                state.sum / self.warmup_samples as f64
            };
        }

        state.value = sample * self.decay + state.value * (1.0 - self.decay);
    }

    /// Current estimate, `0.0` until warmed up
    pub fn value(&self) -> f64 {
        let state = self
            .state
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if state.count > self.warmup_samples {
            state.value
        } else {
            0.0
        }
    }

    /// Force the estimate and mark it warmed up
    pub fn set(&self, value: f64) {
        let mut state = self
            .state
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        state.value = value;
        state.count = self.warmup_samples.saturating_add(1);
    }

    pub fn warmed_up(&self) -> bool {
        self.state
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .count
            > self.warmup_samples
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warmup_then_decay() {
        let avg = MovingAverage::new(0.9, 3);

        avg.add(100.0);
        avg.add(100.0);
        avg.add(150.0);
        assert!(!avg.warmed_up());
        assert_eq!(avg.value(), 0.0);

        avg.add(160.0);
        assert!(avg.warmed_up());
        assert!((avg.value() - 155.6667).abs() < 1e-4);
    }

    #[test]
    fn test_steady_state_decay() {
        let avg = MovingAverage::new(0.5, 1);
        avg.add(10.0);
        avg.add(20.0);
        // mean 10, then 20 * 0.5 + 10 * 0.5
        assert!((avg.value() - 15.0).abs() < f64::EPSILON);

        avg.add(25.0);
        assert!((avg.value() - 20.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_zero_warmup_seeds_from_first_sample() {
        let avg = MovingAverage::new(0.06, 0);
        avg.add(42.0);

        assert!(avg.warmed_up());
        assert!((avg.value() - 42.0).abs() < 1e-9);
    }

    #[test]
    fn test_set_marks_warmed_up() {
        let avg = MovingAverage::new(0.06, 3);
        avg.set(7.5);

        assert!(avg.warmed_up());
        assert_eq!(avg.value(), 7.5);

        avg.add(7.5);
        assert!((avg.value() - 7.5).abs() < 1e-9);
    }
}
