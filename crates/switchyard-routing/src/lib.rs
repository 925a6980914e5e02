//! Switchyard Routing Engine
//!
//! This crate provides the routing and resiliency logic for Switchyard:
//! - Per-model health tracking (error budgets, rate limits, revoked keys)
//! - Latency estimation with moving averages
//! - Routing strategies (priority, round robin, weighted round robin, least latency)
//! - Language routers with exponential-backoff failover for chat and streaming
//! - Router and model configuration

pub mod config;
pub mod health;
pub mod latency;
pub mod manager;
pub mod model;
pub mod provider_config;
pub mod rate_limit;
pub mod retry;
pub mod router;
pub mod strategy;
pub mod token_bucket;

#[cfg(test)]
pub(crate) mod testing;

// Re-export commonly used types
pub use config::{
    ClientConfig, LatencyConfig, ModelConfig, RetryConfig, RouterConfig, RoutersConfig,
};
pub use health::{BudgetUnit, ErrorBudget, ErrorBudgetError, HealthTracker};
pub use latency::MovingAverage;
pub use manager::{ClientFactory, RouterManager};
pub use model::{Model, ModelHandle, ModelStream};
pub use provider_config::{
    AnthropicConfig, OllamaConfig, OpenAiConfig, ProviderConfig, ProviderConfigError,
};
pub use rate_limit::RateLimitTracker;
pub use retry::{ExpRetry, ExpRetryIterator};
pub use router::{ChatStreamReceiver, ChatStreamResult, LangRouter};
pub use strategy::{
    LatencySource, LeastLatencyRouting, ModelIterator, ModelPool, PriorityRouting,
    RoundRobinRouting, RoutingStrategy, RoutingStrategyKind, StrategyError,
    WeightedRoundRobinRouting, build_strategy,
};
pub use token_bucket::{Clock, MonotonicClock, NoTokens, TokenBucket};
