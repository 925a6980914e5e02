//! Switchyard CLI
//!
//! Command-line interface for inspecting Switchyard gateway configurations

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use switchyard_config::GatewayConfig;
use switchyard_observability::init_logging;
use switchyard_routing::{ExpRetry, RouterConfig};
use tracing::info;

#[derive(Parser)]
#[command(name = "switchyard")]
#[command(about = "Switchyard - LLM gateway routing engine", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load and validate a gateway configuration, then summarize its routers
    Check {
        /// Path to the configuration file (YAML or TOML)
        #[arg(long, env = "SWITCHYARD_CONFIG", default_value = "~/.switchyard/config.yaml")]
        config: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Check { config } => check(config),
    }
}

fn check(path: PathBuf) -> anyhow::Result<()> {
    let config = GatewayConfig::load(&path)
        .with_context(|| format!("Invalid configuration {}", path.display()))?;

    init_logging(&config.logging)?;
    info!(path = %path.display(), "Configuration is valid");

    for router in &config.routers.language {
        print!("{}", summarize(router));
    }

    Ok(())
}

fn summarize(router: &RouterConfig) -> String {
    let mut out = format!(
        "router {} ({}{})\n",
        router.id,
        router.strategy,
        if router.enabled { "" } else { ", disabled" }
    );

    let retry = ExpRetry::from_config(&router.retry);
    let delays: Vec<String> = (0..retry.max_retries())
        .map(|attempt| format!("{}ms", retry.delay(attempt).as_millis()))
        .collect();
    out.push_str(&format!(
        "  retries: {} [{}]\n",
        retry.max_retries(),
        delays.join(", ")
    ));

    for model in &router.models {
        out.push_str(&format!(
            "  - {} -> {}/{} weight={} error_budget={} timeout={}s{}\n",
            model.id,
            model.provider.provider_name(),
            model.provider.model_name(),
            model.weight,
            model.error_budget,
            model.client.timeout_secs,
            if model.enabled { "" } else { " (disabled)" }
        ));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_check() {
        let cli =
            Cli::try_parse_from(["switchyard", "check", "--config", "gateway.toml"]).unwrap();
        let Commands::Check { config } = cli.command;
        assert_eq!(config, PathBuf::from("gateway.toml"));
    }

    #[test]
    fn test_summarize_router() {
        let router: RouterConfig = serde_yaml::from_str(
            r#"
id: default
strategy: weighted_round_robin
retry:
  max_retries: 2
  min_delay_ms: 100
  max_delay_ms: 1000
models:
  - id: local
    weight: 2
    provider:
      type: ollama
      model: llama3
  - id: spare
    enabled: false
    provider:
      type: ollama
      model: mistral
"#,
        )
        .unwrap();

        let summary = summarize(&router);
        assert!(summary.starts_with("router default (weighted_round_robin)\n"));
        assert!(summary.contains("retries: 2 [100ms, 200ms]"));
        assert!(
            summary.contains("- local -> ollama/llama3 weight=2 error_budget=10/m timeout=10s\n")
        );
        assert!(summary.contains(
            "- spare -> ollama/mistral weight=1 error_budget=10/m timeout=10s (disabled)"
        ));
    }
}
