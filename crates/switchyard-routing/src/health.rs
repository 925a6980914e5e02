//! Model health tracking
//!
//! A model is healthy unless one of three things happened:
//! - its provider rejected the credentials (permanent until restart)
//! - its provider rate limited it and the cooldown has not expired yet
//! - it burned through its error budget
//!
//! The error budget is a token bucket: every non-classified failure takes one
//! token, and tokens regenerate at the configured rate.

use crate::rate_limit::RateLimitTracker;
use crate::token_bucket::TokenBucket;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use switchyard_core::Error;
use thiserror::Error;
use tracing::debug;

/// Cooldown applied when a provider rate limits without a retry hint
pub const DEFAULT_RATE_LIMIT_COOLDOWN: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BudgetUnit {
    #[serde(rename = "ms")]
    Millisecond,
    #[serde(rename = "s")]
    Second,
    #[serde(rename = "m")]
    Minute,
    #[serde(rename = "h")]
    Hour,
}

impl BudgetUnit {
    fn micros(&self) -> u64 {
        match self {
            BudgetUnit::Millisecond => 1_000,
            BudgetUnit::Second => 1_000_000,
            BudgetUnit::Minute => 60_000_000,
            BudgetUnit::Hour => 3_600_000_000,
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            BudgetUnit::Millisecond => "ms",
            BudgetUnit::Second => "s",
            BudgetUnit::Minute => "m",
            BudgetUnit::Hour => "h",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ErrorBudgetError {
    #[error("Invalid error budget format '{0}', expected '<budget>/<unit>' (e.g. '10/m')")]
    InvalidFormat(String),

    #[error("Invalid error budget value '{0}', must be a positive integer")]
    InvalidBudget(String),

    #[error("Invalid error budget unit '{0}', expected one of: ms, s, m, h")]
    InvalidUnit(String),
}

/// Number of errors a model may produce per time unit, e.g. `10/m`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ErrorBudget {
    budget: u32,
    unit: BudgetUnit,
}

impl ErrorBudget {
    pub fn new(budget: u32, unit: BudgetUnit) -> Result<Self, ErrorBudgetError> {
        if budget == 0 {
            return Err(ErrorBudgetError::InvalidBudget(budget.to_string()));
        }
        Ok(Self { budget, unit })
    }

    /// Maximum number of tokens in the budget
    pub fn budget(&self) -> u32 {
        self.budget
    }

    pub fn unit(&self) -> BudgetUnit {
        self.unit
    }

    /// Time it takes to regenerate one token, in microseconds
    pub fn time_per_token_micros(&self) -> u64 {
        self.unit.micros() / self.budget as u64
    }
}

impl Default for ErrorBudget {
    fn default() -> Self {
        Self {
            budget: 10,
            unit: BudgetUnit::Minute,
        }
    }
}

impl FromStr for ErrorBudget {
    type Err = ErrorBudgetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (budget, unit) = s
            .trim()
            .split_once('/')
            .ok_or_else(|| ErrorBudgetError::InvalidFormat(s.to_string()))?;

        let budget: u32 = budget
            .trim()
            .parse()
            .map_err(|_| ErrorBudgetError::InvalidBudget(budget.to_string()))?;

        let unit = match unit.trim() {
            "ms" => BudgetUnit::Millisecond,
            "s" => BudgetUnit::Second,
            "m" => BudgetUnit::Minute,
            "h" => BudgetUnit::Hour,
            other => return Err(ErrorBudgetError::InvalidUnit(other.to_string())),
        };

        Self::new(budget, unit)
    }
}

impl TryFrom<String> for ErrorBudget {
    type Error = ErrorBudgetError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ErrorBudget> for String {
    fn from(value: ErrorBudget) -> Self {
        value.to_string()
    }
}

impl fmt::Display for ErrorBudget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.budget, self.unit.as_str())
    }
}

/// Health of a single model
#[derive(Debug)]
pub struct HealthTracker {
    unauthorized: AtomicBool,
    err_budget: TokenBucket,
    rate_limit: RateLimitTracker,
}

impl HealthTracker {
    pub fn new(budget: &ErrorBudget) -> Self {
        Self {
            unauthorized: AtomicBool::new(false),
            err_budget: TokenBucket::new(budget.budget(), budget.time_per_token_micros()),
            rate_limit: RateLimitTracker::new(),
        }
    }

    /// Record a model error
    pub fn track_err(&self, err: &Error) {
        match err {
            Error::Unauthorized(_) => {
                self.unauthorized.store(true, Ordering::Release);
            }
            Error::RateLimited { retry_after } => {
                let cooldown = retry_after.unwrap_or(DEFAULT_RATE_LIMIT_COOLDOWN);
                self.rate_limit.set_limited(cooldown);
            }
            _ => {
                if self.err_budget.take(1).is_err() {
                    debug!("Error budget already exhausted");
                }
            }
        }
    }

    pub fn healthy(&self) -> bool {
        !self.unauthorized() && !self.rate_limit.limited() && self.err_budget.has_tokens()
    }

    pub fn unauthorized(&self) -> bool {
        self.unauthorized.load(Ordering::Acquire)
    }

    /// Remaining rate limit cooldown, if any
    pub fn rate_limit_reset_in(&self) -> Option<Duration> {
        self.rate_limit.reset_in()
    }

    /// Estimated number of errors the model may still produce
    pub fn remaining_budget(&self) -> f64 {
        self.err_budget.tokens()
    }
}
