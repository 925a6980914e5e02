//! Provider configuration
//!
//! Each model points at exactly one provider backend. The set of backends is
//! closed: a `ClientFactory` turns the typed parameters into a concrete
//! `ChatClient` when routers are built. Secrets support environment variable
//! references (`$VAR_NAME` or `${VAR_NAME}`).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// OpenAI (and compatible) chat completions API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenAiConfig {
    /// API key (supports env var syntax: $VAR_NAME or ${VAR_NAME})
    pub api_key: String,

    /// Provider model name, e.g. "gpt-4o-mini"
    pub model: String,

    #[serde(default)]
    pub base_url: Option<String>,

    /// Custom headers to add to requests (supports env vars in values)
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

/// Anthropic messages API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnthropicConfig {
    /// API key (supports env var syntax: $VAR_NAME or ${VAR_NAME})
    pub api_key: String,

    pub model: String,

    #[serde(default)]
    pub base_url: Option<String>,

    #[serde(default = "default_anthropic_version")]
    pub api_version: String,

    #[serde(default)]
    pub headers: HashMap<String, String>,
}

fn default_anthropic_version() -> String {
    "2023-06-01".to_string()
}

/// Self-hosted Ollama server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OllamaConfig {
    pub model: String,

    #[serde(default)]
    pub base_url: Option<String>,
}

/// Provider backend of a model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProviderConfig {
    OpenAI(OpenAiConfig),
    Anthropic(AnthropicConfig),
    Ollama(OllamaConfig),
}

impl ProviderConfig {
    pub fn provider_name(&self) -> &'static str {
        match self {
            ProviderConfig::OpenAI(_) => "openai",
            ProviderConfig::Anthropic(_) => "anthropic",
            ProviderConfig::Ollama(_) => "ollama",
        }
    }

    /// Get default base URL for this provider
    pub fn default_base_url(&self) -> &'static str {
        match self {
            ProviderConfig::OpenAI(_) => "https://api.openai.com/v1",
            ProviderConfig::Anthropic(_) => "https://api.anthropic.com",
            ProviderConfig::Ollama(_) => "http://localhost:11434",
        }
    }

    /// Get the effective base URL (configured or default)
    pub fn effective_base_url(&self) -> &str {
        let configured = match self {
            ProviderConfig::OpenAI(c) => c.base_url.as_deref(),
            ProviderConfig::Anthropic(c) => c.base_url.as_deref(),
            ProviderConfig::Ollama(c) => c.base_url.as_deref(),
        };

        configured.unwrap_or_else(|| self.default_base_url())
    }

    /// Provider-side model name
    pub fn model_name(&self) -> &str {
        match self {
            ProviderConfig::OpenAI(c) => &c.model,
            ProviderConfig::Anthropic(c) => &c.model,
            ProviderConfig::Ollama(c) => &c.model,
        }
    }

    /// Resolve environment variables in configuration
    /// Replaces $VAR_NAME or ${VAR_NAME} with actual env var values
    pub fn resolve_env_vars(&mut self) -> Result<(), ProviderConfigError> {
        match self {
            ProviderConfig::OpenAI(c) => {
                c.api_key = resolve_env_var(&c.api_key)?;
                resolve_headers(&mut c.headers)
            }
            ProviderConfig::Anthropic(c) => {
                c.api_key = resolve_env_var(&c.api_key)?;
                resolve_headers(&mut c.headers)
            }
            ProviderConfig::Ollama(_) => Ok(()),
        }
    }
}

fn resolve_headers(headers: &mut HashMap<String, String>) -> Result<(), ProviderConfigError> {
    for (key, value) in headers.iter_mut() {
        *value = resolve_env_var(value).map_err(|e| ProviderConfigError::EnvVarResolution {
            header: key.clone(),
            source: Box::new(e),
        })?;
    }

    Ok(())
}

/// Resolve a single environment variable reference
/// Supports: $VAR_NAME or ${VAR_NAME}
/// If no $ prefix, returns value as-is
fn resolve_env_var(value: &str) -> Result<String, ProviderConfigError> {
    let trimmed = value.trim();

    if let Some(var_name) = trimmed.strip_prefix('$') {
        let var_name = var_name
            .strip_prefix('{')
            .and_then(|s| s.strip_suffix('}'))
            .unwrap_or(var_name);

        std::env::var(var_name).map_err(|_| ProviderConfigError::EnvVarNotFound {
            var_name: var_name.to_string(),
        })
    } else {
        Ok(value.to_string())
    }
}

/// Provider configuration errors
#[derive(Debug, Error)]
pub enum ProviderConfigError {
    #[error("Environment variable not found: {var_name}")]
    EnvVarNotFound { var_name: String },

    #[error("Failed to resolve environment variable in header '{header}'")]
    EnvVarResolution {
        header: String,
        #[source]
        source: Box<ProviderConfigError>,
    },
}
