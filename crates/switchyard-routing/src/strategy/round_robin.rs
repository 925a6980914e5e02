//! Round-robin routing
//!
//! All requests share one cursor. The cursor advances on every step,
//! including steps that land on an unhealthy model, and a pull gives up after
//! one full pass over the pool.

use super::{ModelIterator, ModelPool, RoutingStrategy, StrategyError};
use crate::model::Model;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

pub struct RoundRobinRouting<M: Model> {
    models: ModelPool<M>,
    cursor: Arc<AtomicUsize>,
}

impl<M: Model> RoundRobinRouting<M> {
    pub fn new(models: ModelPool<M>) -> Self {
        Self {
            models,
            cursor: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl<M: Model> RoutingStrategy<M> for RoundRobinRouting<M> {
    fn name(&self) -> &'static str {
        "round_robin"
    }

    fn iterator(&self) -> Box<dyn ModelIterator<M>> {
        Box::new(RoundRobinIterator {
            models: Arc::clone(&self.models),
            cursor: Arc::clone(&self.cursor),
        })
    }
}

struct RoundRobinIterator<M: Model> {
    models: ModelPool<M>,
    cursor: Arc<AtomicUsize>,
}

impl<M: Model> ModelIterator<M> for RoundRobinIterator<M> {
    fn next(&mut self) -> Result<Arc<M>, StrategyError> {
        let len = self.models.len();

        for _ in 0..len {
            // fetch_add wraps on overflow
            let idx = self.cursor.fetch_add(1, Ordering::AcqRel) % len;
            let model = &self.models[idx];

            if model.healthy() {
                return Ok(Arc::clone(model));
            }
        }

        Err(StrategyError::NoHealthyModels)
    }
}
