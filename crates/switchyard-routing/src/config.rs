//! Router and model configuration
//!
//! ```yaml
//! language:
//!   - id: default
//!     strategy: priority
//!     retry:
//!       max_retries: 3
//!       min_delay_ms: 2000
//!     models:
//!       - id: openai
//!         error_budget: 10/m
//!         provider:
//!           type: openai
//!           api_key: $OPENAI_API_KEY
//!           model: gpt-4o-mini
//! ```

use crate::health::ErrorBudget;
use crate::latency::MovingAverage;
use crate::provider_config::ProviderConfig;
use crate::strategy::RoutingStrategyKind;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;
use switchyard_core::{Error, Result};

/// Upper bound for `latency.update_interval_secs` (one day)
pub const MAX_LATENCY_UPDATE_INTERVAL_SECS: u64 = 24 * 60 * 60;

/// Latency estimation settings of a model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatencyConfig {
    /// Weight of each new sample, in (0, 1]
    #[serde(default = "default_decay")]
    pub decay: f64,

    /// Samples averaged before the moving average kicks in
    #[serde(default = "default_warmup_samples")]
    pub warmup_samples: u8,

    /// How long a least-latency pick keeps the model out of rotation
    #[serde(default = "default_update_interval_secs")]
    pub update_interval_secs: u64,
}

fn default_decay() -> f64 {
    0.06
}

fn default_warmup_samples() -> u8 {
    3
}

fn default_update_interval_secs() -> u64 {
    30
}

impl Default for LatencyConfig {
    fn default() -> Self {
        Self {
            decay: default_decay(),
            warmup_samples: default_warmup_samples(),
            update_interval_secs: default_update_interval_secs(),
        }
    }
}

impl LatencyConfig {
    pub fn moving_average(&self) -> MovingAverage {
        MovingAverage::new(self.decay, self.warmup_samples)
    }

    pub fn update_interval(&self) -> Duration {
        Duration::from_secs(self.update_interval_secs)
    }
}

/// Provider client settings of a model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    10
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl ClientConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Exponential backoff between routing attempts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_base_multiplier")]
    pub base_multiplier: u32,

    #[serde(default = "default_min_delay_ms")]
    pub min_delay_ms: u64,

    /// Unbounded when null
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: Option<u64>,
}

fn default_max_retries() -> u32 {
    3
}

fn default_base_multiplier() -> u32 {
    2
}

fn default_min_delay_ms() -> u64 {
    2000
}

fn default_max_delay_ms() -> Option<u64> {
    Some(5000)
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_multiplier: default_base_multiplier(),
            min_delay_ms: default_min_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

impl RetryConfig {
    pub fn min_delay(&self) -> Duration {
        Duration::from_millis(self.min_delay_ms)
    }

    pub fn max_delay(&self) -> Option<Duration> {
        self.max_delay_ms.map(Duration::from_millis)
    }
}

fn default_true() -> bool {
    true
}

fn default_weight() -> u32 {
    1
}

/// A model in a router pool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Model ID, unique within the router
    pub id: String,

    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Relative share for weighted round-robin
    #[serde(default = "default_weight")]
    pub weight: u32,

    #[serde(default)]
    pub error_budget: ErrorBudget,

    #[serde(default)]
    pub latency: LatencyConfig,

    #[serde(default)]
    pub client: ClientConfig,

    pub provider: ProviderConfig,
}

impl ModelConfig {
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(Error::ConfigValidation("Model ID cannot be empty".to_string()));
        }

        if !(self.latency.decay > 0.0 && self.latency.decay <= 1.0) {
            return Err(Error::ConfigValidation(format!(
                "Model '{}': latency decay must be in (0, 1], got {}",
                self.id, self.latency.decay
            )));
        }

        if self.latency.warmup_samples == u8::MAX {
            return Err(Error::ConfigValidation(format!(
                "Model '{}': latency warmup_samples must be below {}",
                self.id,
                u8::MAX
            )));
        }

        if self.latency.update_interval_secs > MAX_LATENCY_UPDATE_INTERVAL_SECS {
            return Err(Error::ConfigValidation(format!(
                "Model '{}': latency update_interval_secs must be at most {}, got {}",
                self.id, MAX_LATENCY_UPDATE_INTERVAL_SECS, self.latency.update_interval_secs
            )));
        }

        if self.client.timeout_secs == 0 {
            return Err(Error::ConfigValidation(format!(
                "Model '{}': client timeout must be positive",
                self.id
            )));
        }

        Ok(())
    }
}

/// A language router
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouterConfig {
    /// Router ID, unique across routers
    pub id: String,

    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default)]
    pub strategy: RoutingStrategyKind,

    #[serde(default)]
    pub retry: RetryConfig,

    pub models: Vec<ModelConfig>,
}

impl RouterConfig {
    pub fn enabled_models(&self) -> impl Iterator<Item = &ModelConfig> {
        self.models.iter().filter(|model| model.enabled)
    }

    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(Error::ConfigValidation("Router ID cannot be empty".to_string()));
        }

        if self.enabled_models().next().is_none() {
            return Err(Error::ConfigValidation(format!(
                "Router '{}' must have at least one enabled model",
                self.id
            )));
        }

        let mut seen = HashSet::new();
        for model in &self.models {
            if !seen.insert(model.id.as_str()) {
                return Err(Error::ConfigValidation(format!(
                    "Router '{}': duplicate model ID '{}'",
                    self.id, model.id
                )));
            }
            model.validate()?;
        }

        if self.retry.base_multiplier < 1 {
            return Err(Error::ConfigValidation(format!(
                "Router '{}': retry base_multiplier must be at least 1",
                self.id
            )));
        }

        if let Some(max_delay_ms) = self.retry.max_delay_ms {
            if max_delay_ms < self.retry.min_delay_ms {
                return Err(Error::ConfigValidation(format!(
                    "Router '{}': retry max_delay_ms ({}) is below min_delay_ms ({})",
                    self.id, max_delay_ms, self.retry.min_delay_ms
                )));
            }
        }

        if self.strategy == RoutingStrategyKind::WeightedRoundRobin
            && self.enabled_models().all(|model| model.weight == 0)
        {
            return Err(Error::ConfigValidation(format!(
                "Router '{}': weighted round robin needs at least one model with a positive weight",
                self.id
            )));
        }

        Ok(())
    }
}

/// All routers of a gateway, grouped by kind
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoutersConfig {
    #[serde(default)]
    pub language: Vec<RouterConfig>,
}

impl RoutersConfig {
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for router in &self.language {
            if !seen.insert(router.id.as_str()) {
                return Err(Error::ConfigValidation(format!(
                    "Duplicate router ID '{}'",
                    router.id
                )));
            }
            router.validate()?;
        }

        Ok(())
    }

    /// Resolve environment variable references in every provider config
    pub fn resolve_env_vars(&mut self) -> Result<()> {
        for router in &mut self.language {
            for model in &mut router.models {
                model.provider.resolve_env_vars().map_err(|e| {
                    Error::Config(format!(
                        "Router '{}', model '{}': {}",
                        router.id, model.id, e
                    ))
                })?;
            }
        }

        Ok(())
    }
}
