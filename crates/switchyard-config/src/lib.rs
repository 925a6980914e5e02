//! Gateway configuration loading for Switchyard
//!
//! Reads the gateway configuration from a YAML or TOML file, applies
//! environment variable overrides and validates the result.
//!
//! # Example
//! ```no_run
//! # use switchyard_config::GatewayConfig;
//! # fn example() -> switchyard_core::Result<()> {
//! let config = GatewayConfig::load("~/.switchyard/config.yaml")?;
//! println!("{} language routers", config.routers.language.len());
//! # Ok(())
//! # }
//! ```

mod gateway;

pub use gateway::{ENV_LOG_FORMAT, ENV_LOG_LEVEL, GatewayConfig, expand_home};
