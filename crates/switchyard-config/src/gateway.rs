//! Gateway configuration file

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use switchyard_core::{Error, Result};
use switchyard_observability::{LogFormat, LoggingConfig};
use switchyard_routing::RoutersConfig;
use tracing::{debug, error};

/// Overrides `logging.level`
pub const ENV_LOG_LEVEL: &str = "SWITCHYARD_LOG_LEVEL";

/// Overrides `logging.format` ("text" or "json")
pub const ENV_LOG_FORMAT: &str = "SWITCHYARD_LOG_FORMAT";

/// Top-level gateway configuration
///
/// ```yaml
/// logging:
///   level: info
///   format: json
/// routers:
///   language:
///     - id: default
///       models:
///         - id: local
///           provider:
///             type: ollama
///             model: llama3
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub routers: RoutersConfig,
}

impl GatewayConfig {
    /// Read, override from the environment, resolve secrets and validate
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let mut config = Self::from_file(path)?;
        config.merge_env()?;
        config.routers.resolve_env_vars()?;
        config.validate()?;

        Ok(config)
    }

    /// Parse a configuration file
    ///
    /// Files ending in `.toml` are read as TOML, anything else as YAML. A
    /// leading `~` expands to the home directory.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = expand_home(path.as_ref())?;

        let contents = std::fs::read_to_string(&path).map_err(|e| {
            error!("Failed to read config file {:?}: {}", path, e);
            Error::Io(e)
        })?;

        let config = if path.extension().and_then(|s| s.to_str()) == Some("toml") {
            toml::from_str(&contents)
                .map_err(|e| Error::Config(format!("Invalid TOML: {}", e)))?
        } else {
            // Default to YAML
            serde_yaml::from_str(&contents)
                .map_err(|e| Error::Config(format!("Invalid YAML: {}", e)))?
        };

        debug!("Loaded config file {:?}", path);
        Ok(config)
    }

    /// Merge environment variables into config (env vars take precedence)
    pub fn merge_env(&mut self) -> Result<()> {
        if let Ok(val) = std::env::var(ENV_LOG_LEVEL) {
            self.logging.level = val;
        }

        if let Ok(val) = std::env::var(ENV_LOG_FORMAT) {
            self.logging.format = val
                .parse::<LogFormat>()
                .map_err(|e| Error::ConfigValidation(format!("{}: {}", ENV_LOG_FORMAT, e)))?;
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        self.logging
            .validate()
            .map_err(|e| Error::ConfigValidation(e.to_string()))?;

        self.routers.validate()
    }
}

/// Expand a leading `~` to the current user's home directory
pub fn expand_home(path: &Path) -> Result<PathBuf> {
    match path.strip_prefix("~") {
        Ok(rest) => {
            let home = dirs::home_dir()
                .ok_or_else(|| Error::Config("Could not determine home directory".to_string()))?;
            Ok(home.join(rest))
        }
        Err(_) => Ok(path.to_path_buf()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;
    use switchyard_routing::{ProviderConfig, RoutingStrategyKind};
    use tempfile::NamedTempFile;

    const YAML: &str = r#"
logging:
  level: debug
  format: json
routers:
  language:
    - id: default
      strategy: least_latency
      models:
        - id: openai
          error_budget: 5/s
          provider:
            type: openai
            api_key: sk-test
            model: gpt-4o-mini
        - id: local
          provider:
            type: ollama
            model: llama3
"#;

    const TOML: &str = r#"
[logging]
level = "warn"

[[routers.language]]
id = "default"
strategy = "round_robin"

[[routers.language.models]]
id = "local"
weight = 3

[routers.language.models.provider]
type = "ollama"
model = "llama3"
"#;

    fn write_config(contents: &str, suffix: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    fn clear_env() {
        unsafe {
            std::env::remove_var(ENV_LOG_LEVEL);
            std::env::remove_var(ENV_LOG_FORMAT);
        }
    }

    #[test]
    fn test_from_yaml_file() {
        let file = write_config(YAML, ".yaml");
        let config = GatewayConfig::from_file(file.path()).unwrap();

        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, LogFormat::Json);

        let router = &config.routers.language[0];
        assert_eq!(router.strategy, RoutingStrategyKind::LeastLatency);
        assert_eq!(router.models.len(), 2);
        assert_eq!(router.models[0].error_budget.to_string(), "5/s");
        assert!(matches!(router.models[1].provider, ProviderConfig::Ollama(_)));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_toml_file() {
        let file = write_config(TOML, ".toml");
        let config = GatewayConfig::from_file(file.path()).unwrap();

        assert_eq!(config.logging.level, "warn");
        assert_eq!(config.logging.format, LogFormat::Text);

        let router = &config.routers.language[0];
        assert_eq!(router.strategy, RoutingStrategyKind::RoundRobin);
        assert_eq!(router.models[0].weight, 3);
        assert_eq!(router.models[0].provider.model_name(), "llama3");
    }

    #[test]
    fn test_missing_file() {
        let err = GatewayConfig::from_file("/nonexistent/switchyard.yaml").unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_invalid_yaml() {
        let file = write_config("routers: [not, a, map", ".yaml");
        let err = GatewayConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, Error::Config(ref msg) if msg.starts_with("Invalid YAML")));
    }

    #[test]
    fn test_unknown_provider_rejected() {
        let yaml = YAML.replace("type: ollama", "type: mainframe");
        let file = write_config(&yaml, ".yml");
        assert!(matches!(
            GatewayConfig::from_file(file.path()),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_expand_home() {
        let home = dirs::home_dir().unwrap();
        assert_eq!(
            expand_home(Path::new("~/.switchyard/config.yaml")).unwrap(),
            home.join(".switchyard/config.yaml")
        );
        assert_eq!(
            expand_home(Path::new("/etc/switchyard.yaml")).unwrap(),
            PathBuf::from("/etc/switchyard.yaml")
        );
    }

    #[test]
    fn test_validate_rejects_bad_log_level() {
        let mut config = GatewayConfig::default();
        config.logging.level = "switchyard=verbose".to_string();

        assert!(matches!(config.validate(), Err(Error::ConfigValidation(_))));
    }

    #[test]
    fn test_validate_rejects_duplicate_routers() {
        let file = write_config(YAML, ".yaml");
        let mut config = GatewayConfig::from_file(file.path()).unwrap();
        let duplicate = config.routers.language[0].clone();
        config.routers.language.push(duplicate);

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("Duplicate router ID"));
    }

    #[test]
    #[serial]
    fn test_merge_env_overrides_logging() {
        unsafe {
            std::env::set_var(ENV_LOG_LEVEL, "trace");
            std::env::set_var(ENV_LOG_FORMAT, "JSON");
        }

        let mut config = GatewayConfig::default();
        config.merge_env().unwrap();
        clear_env();

        assert_eq!(config.logging.level, "trace");
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    #[serial]
    fn test_merge_env_rejects_unknown_format() {
        unsafe {
            std::env::set_var(ENV_LOG_FORMAT, "xml");
        }

        let mut config = GatewayConfig::default();
        let result = config.merge_env();
        clear_env();

        assert!(matches!(result, Err(Error::ConfigValidation(_))));
    }

    #[test]
    #[serial]
    fn test_load_resolves_secrets() {
        clear_env();
        unsafe {
            std::env::set_var("SWITCHYARD_TEST_OPENAI_KEY", "sk-from-env");
        }

        let yaml = YAML.replace("sk-test", "${SWITCHYARD_TEST_OPENAI_KEY}");
        let file = write_config(&yaml, ".yaml");
        let config = GatewayConfig::load(file.path()).unwrap();

        unsafe {
            std::env::remove_var("SWITCHYARD_TEST_OPENAI_KEY");
        }

        match &config.routers.language[0].models[0].provider {
            ProviderConfig::OpenAI(openai) => assert_eq!(openai.api_key, "sk-from-env"),
            other => panic!("unexpected provider: {:?}", other),
        }
    }

    #[test]
    #[serial]
    fn test_load_fails_on_missing_secret() {
        clear_env();
        let yaml = YAML.replace("sk-test", "$SWITCHYARD_TEST_UNSET_KEY");
        let file = write_config(&yaml, ".yaml");

        let err = GatewayConfig::load(file.path()).unwrap_err();
        assert!(err.to_string().contains("SWITCHYARD_TEST_UNSET_KEY"));
    }
}
