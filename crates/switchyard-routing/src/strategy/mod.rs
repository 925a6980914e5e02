//! Routing strategies for model selection
//!
//! A strategy decides which model of a router's pool serves a request. Every
//! request gets a fresh [`ModelIterator`]; each `next()` call returns the next
//! healthy candidate, so failover is simply "pull again".
//!
//! ## Strategies
//!
//! - **Priority**: the first healthy model in configuration order
//! - **Round-Robin**: equal distribution across healthy models
//! - **Weighted Round-Robin**: smooth weighted distribution based on model weights
//! - **Least Latency**: the healthy model with the lowest latency estimate,
//!   with periodic re-probing of every model
//!
//! ```rust
//! use std::sync::Arc;
//! use switchyard_routing::{
//!     LatencySource, Model, ModelHandle, RoutingStrategyKind, build_strategy,
//! };
//!
//! fn first_pick(models: Vec<Arc<ModelHandle>>) -> Option<String> {
//!     let strategy = build_strategy(
//!         RoutingStrategyKind::Priority,
//!         Arc::new(models),
//!         LatencySource::Chat,
//!     );
//!     strategy.iterator().next().ok().map(|model| model.id().to_string())
//! }
//! ```
//!
//! ## Thread Safety
//!
//! Strategies are shared by every request of a router. Priority and
//! round-robin only use atomics; weighted round-robin takes one mutex per
//! decision; least-latency locks each model schedule separately.

mod least_latency;
mod priority;
mod round_robin;
mod weighted_round_robin;

pub use least_latency::LeastLatencyRouting;
pub use priority::PriorityRouting;
pub use round_robin::RoundRobinRouting;
pub use weighted_round_robin::WeightedRoundRobinRouting;

use crate::latency::MovingAverage;
use crate::model::Model;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Shared, immutable pool of models
pub type ModelPool<M> = Arc<Vec<Arc<M>>>;

/// Strategy errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StrategyError {
    #[error("No healthy models available")]
    NoHealthyModels,
}

impl From<StrategyError> for switchyard_core::Error {
    fn from(err: StrategyError) -> Self {
        match err {
            StrategyError::NoHealthyModels => switchyard_core::Error::NoHealthyModels,
        }
    }
}

/// Yields candidate models for one request
pub trait ModelIterator<M: Model>: Send {
    fn next(&mut self) -> Result<Arc<M>, StrategyError>;
}

/// Model selection policy shared by all requests of a router
pub trait RoutingStrategy<M: Model>: Send + Sync {
    fn name(&self) -> &'static str;

    /// Start a new selection sequence
    fn iterator(&self) -> Box<dyn ModelIterator<M>>;
}

/// Configured routing strategy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutingStrategyKind {
    #[default]
    Priority,
    RoundRobin,
    WeightedRoundRobin,
    LeastLatency,
}

impl RoutingStrategyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoutingStrategyKind::Priority => "priority",
            RoutingStrategyKind::RoundRobin => "round_robin",
            RoutingStrategyKind::WeightedRoundRobin => "weighted_round_robin",
            RoutingStrategyKind::LeastLatency => "least_latency",
        }
    }
}

impl fmt::Display for RoutingStrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which latency estimate a least-latency strategy compares
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LatencySource {
    Chat,
    ChatStream,
}

impl LatencySource {
    pub(crate) fn of<M: Model>(self, model: &M) -> &MovingAverage {
        match self {
            LatencySource::Chat => model.chat_latency(),
            LatencySource::ChatStream => model.chat_stream_latency(),
        }
    }
}

/// Build a strategy over `models`
pub fn build_strategy<M: Model>(
    kind: RoutingStrategyKind,
    models: ModelPool<M>,
    latency: LatencySource,
) -> Arc<dyn RoutingStrategy<M>> {
    match kind {
        RoutingStrategyKind::Priority => Arc::new(PriorityRouting::new(models)),
        RoutingStrategyKind::RoundRobin => Arc::new(RoundRobinRouting::new(models)),
        RoutingStrategyKind::WeightedRoundRobin => {
            Arc::new(WeightedRoundRobinRouting::new(models))
        }
        RoutingStrategyKind::LeastLatency => Arc::new(LeastLatencyRouting::new(models, latency)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeModel, pool};

    #[test]
    fn test_strategy_kind_serde() {
        let kind: RoutingStrategyKind = serde_json::from_str("\"weighted_round_robin\"").unwrap();
        assert_eq!(kind, RoutingStrategyKind::WeightedRoundRobin);
        assert_eq!(
            serde_json::to_string(&RoutingStrategyKind::LeastLatency).unwrap(),
            "\"least_latency\""
        );
        assert_eq!(RoutingStrategyKind::default(), RoutingStrategyKind::Priority);
        assert!(serde_json::from_str::<RoutingStrategyKind>("\"random\"").is_err());
    }

    #[test]
    fn test_build_strategy_names() {
        let models = pool(vec![FakeModel::new("a")]);

        for (kind, name) in [
            (RoutingStrategyKind::Priority, "priority"),
            (RoutingStrategyKind::RoundRobin, "round_robin"),
            (RoutingStrategyKind::WeightedRoundRobin, "weighted_round_robin"),
            (RoutingStrategyKind::LeastLatency, "least_latency"),
        ] {
            let strategy = build_strategy(kind, Arc::clone(&models), LatencySource::Chat);
            assert_eq!(strategy.name(), name);
            assert_eq!(strategy.iterator().next().unwrap().id(), "a");
        }
    }

    #[test]
    fn test_empty_pool_has_no_healthy_models() {
        let models = pool(vec![]);

        for kind in [
            RoutingStrategyKind::Priority,
            RoutingStrategyKind::RoundRobin,
            RoutingStrategyKind::WeightedRoundRobin,
            RoutingStrategyKind::LeastLatency,
        ] {
            let strategy = build_strategy(kind, Arc::clone(&models), LatencySource::Chat);
            assert_eq!(
                strategy.iterator().next().err(),
                Some(StrategyError::NoHealthyModels)
            );
        }
    }

    #[test]
    fn test_strategy_error_into_core_error() {
        let err: switchyard_core::Error = StrategyError::NoHealthyModels.into();
        assert!(matches!(err, switchyard_core::Error::NoHealthyModels));
    }
}
