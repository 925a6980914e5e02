//! Least-latency routing
//!
//! Two phases:
//! - **Warm-up**: while some healthy models have no warmed-up latency
//!   estimate, requests round-robin over those cold models only.
//! - **Steady state**: any healthy model whose schedule expired is picked
//!   before the others, earliest expiry first with ties in pool order, so a
//!   model that once looked slow gets measured again. When no schedule has
//!   expired the lowest latency wins.
//!
//! Picking a model pushes its schedule `latency_update_interval` into the
//! future, clamped to [`MAX_LATENCY_UPDATE_INTERVAL_SECS`].

use super::{LatencySource, ModelIterator, ModelPool, RoutingStrategy, StrategyError};
use crate::config::MAX_LATENCY_UPDATE_INTERVAL_SECS;
use crate::model::Model;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

struct ModelSchedule<M: Model> {
    model: Arc<M>,
    expire_at: Mutex<Instant>,
}

impl<M: Model> ModelSchedule<M> {
    fn expire_at(&self) -> Instant {
        *self
            .expire_at
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn update(&self) {
        let interval = self
            .model
            .latency_update_interval()
            .min(Duration::from_secs(MAX_LATENCY_UPDATE_INTERVAL_SECS));

        *self
            .expire_at
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Instant::now() + interval;
    }
}

pub struct LeastLatencyRouting<M: Model> {
    schedules: Arc<Vec<ModelSchedule<M>>>,
    warmup_cursor: Arc<AtomicUsize>,
    latency: LatencySource,
}

impl<M: Model> LeastLatencyRouting<M> {
    pub fn new(models: ModelPool<M>, latency: LatencySource) -> Self {
        let now = Instant::now();
        let schedules = models
            .iter()
            .map(|model| ModelSchedule {
                model: Arc::clone(model),
                expire_at: Mutex::new(now),
            })
            .collect();

        Self {
            schedules: Arc::new(schedules),
            warmup_cursor: Arc::new(AtomicUsize::new(0)),
            latency,
        }
    }
}

impl<M: Model> RoutingStrategy<M> for LeastLatencyRouting<M> {
    fn name(&self) -> &'static str {
        "least_latency"
    }

    fn iterator(&self) -> Box<dyn ModelIterator<M>> {
        Box::new(LeastLatencyIterator {
            schedules: Arc::clone(&self.schedules),
            warmup_cursor: Arc::clone(&self.warmup_cursor),
            latency: self.latency,
        })
    }
}

struct LeastLatencyIterator<M: Model> {
    schedules: Arc<Vec<ModelSchedule<M>>>,
    warmup_cursor: Arc<AtomicUsize>,
    latency: LatencySource,
}

impl<M: Model> LeastLatencyIterator<M> {
    fn latency_of(&self, schedule: &ModelSchedule<M>) -> f64 {
        self.latency.of(schedule.model.as_ref()).value()
    }
}

impl<M: Model> ModelIterator<M> for LeastLatencyIterator<M> {
    fn next(&mut self) -> Result<Arc<M>, StrategyError> {
        let cold: Vec<&ModelSchedule<M>> = self
            .schedules
            .iter()
            .filter(|s| s.model.healthy() && !self.latency.of(s.model.as_ref()).warmed_up())
            .collect();

        if !cold.is_empty() {
            let idx = self.warmup_cursor.fetch_add(1, Ordering::AcqRel) % cold.len();
            let schedule = cold[idx];
            schedule.update();

            return Ok(Arc::clone(&schedule.model));
        }

        let now = Instant::now();
        let mut candidate: Option<(&ModelSchedule<M>, Instant)> = None;

        for schedule in self.schedules.iter().filter(|s| s.model.healthy()) {
            let expire_at = schedule.expire_at();

            let Some((current, current_expire_at)) = candidate else {
                candidate = Some((schedule, expire_at));
                continue;
            };

            let expired = expire_at <= now;

            // Among expired schedules the earliest expiry wins
            if current_expire_at <= now {
                if expired && expire_at < current_expire_at {
                    candidate = Some((schedule, expire_at));
                }
                continue;
            }

            if expired || self.latency_of(schedule) < self.latency_of(current) {
                candidate = Some((schedule, expire_at));
            }
        }

        let (schedule, _) = candidate.ok_or(StrategyError::NoHealthyModels)?;
        schedule.update();

        Ok(Arc::clone(&schedule.model))
    }
}
