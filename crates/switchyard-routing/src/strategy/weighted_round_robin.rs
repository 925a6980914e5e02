//! Smooth weighted round-robin routing
//!
//! Every decision adds each healthy model's weight to its current weight,
//! picks the model with the highest current weight and subtracts the total
//! healthy weight from it. Over `sum(weights)` decisions each model is picked
//! exactly `weight` times, interleaved rather than in bursts.
//!
//! Zero-weight models take part in the bookkeeping but are never picked.

use super::{ModelIterator, ModelPool, RoutingStrategy, StrategyError};
use crate::model::Model;
use std::sync::{Arc, Mutex};

struct WeightedModel<M: Model> {
    model: Arc<M>,
    current_weight: i64,
}

pub struct WeightedRoundRobinRouting<M: Model> {
    state: Arc<Mutex<Vec<WeightedModel<M>>>>,
}

impl<M: Model> WeightedRoundRobinRouting<M> {
    pub fn new(models: ModelPool<M>) -> Self {
        let state = models
            .iter()
            .map(|model| WeightedModel {
                model: Arc::clone(model),
                current_weight: 0,
            })
            .collect();

        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }
}

impl<M: Model> RoutingStrategy<M> for WeightedRoundRobinRouting<M> {
    fn name(&self) -> &'static str {
        "weighted_round_robin"
    }

    fn iterator(&self) -> Box<dyn ModelIterator<M>> {
        Box::new(WeightedRoundRobinIterator {
            state: Arc::clone(&self.state),
        })
    }
}

struct WeightedRoundRobinIterator<M: Model> {
    state: Arc<Mutex<Vec<WeightedModel<M>>>>,
}

impl<M: Model> ModelIterator<M> for WeightedRoundRobinIterator<M> {
    fn next(&mut self) -> Result<Arc<M>, StrategyError> {
        let mut state = self
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let mut total: i64 = 0;
        let mut best: Option<(usize, i64)> = None;

        for (idx, entry) in state.iter_mut().enumerate() {
            if !entry.model.healthy() {
                continue;
            }

            let weight = entry.model.weight() as i64;
            entry.current_weight += weight;
            total += weight;

            if weight == 0 {
                continue;
            }

            // Strict comparison: the first model wins ties
            if best.is_none_or(|(_, best_weight)| entry.current_weight > best_weight) {
                best = Some((idx, entry.current_weight));
            }
        }

        let (idx, _) = best.ok_or(StrategyError::NoHealthyModels)?;
        let chosen = &mut state[idx];
        chosen.current_weight -= total;

        Ok(Arc::clone(&chosen.model))
    }
}
