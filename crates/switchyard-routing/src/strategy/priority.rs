//! Priority routing
//!
//! Always prefers models in configuration order. Every pull scans from the
//! start of the pool, so a recovered high-priority model is picked again as
//! soon as it is healthy.

use super::{ModelIterator, ModelPool, RoutingStrategy, StrategyError};
use crate::model::Model;
use std::sync::Arc;

pub struct PriorityRouting<M: Model> {
    models: ModelPool<M>,
}

impl<M: Model> PriorityRouting<M> {
    pub fn new(models: ModelPool<M>) -> Self {
        Self { models }
    }
}

impl<M: Model> RoutingStrategy<M> for PriorityRouting<M> {
    fn name(&self) -> &'static str {
        "priority"
    }

    fn iterator(&self) -> Box<dyn ModelIterator<M>> {
        Box::new(PriorityIterator {
            models: Arc::clone(&self.models),
        })
    }
}

struct PriorityIterator<M: Model> {
    models: ModelPool<M>,
}

impl<M: Model> ModelIterator<M> for PriorityIterator<M> {
    fn next(&mut self) -> Result<Arc<M>, StrategyError> {
        self.models
            .iter()
            .find(|model| model.healthy())
            .cloned()
            .ok_or(StrategyError::NoHealthyModels)
    }
}
