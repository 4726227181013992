//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;

use crate::config::schema::{NetworkKind, OrchestratorConfig};
use crate::config::validation::{validate_config, ValidationError};

/// Environment variable selecting the network (overrides the file).
pub const NETWORK_ENV_VAR: &str = "NETWORK";

/// Environment variable overriding the ledger API base URL.
pub const API_URL_ENV_VAR: &str = "LEDGER_API_URL";

/// Error type for configuration loading.
///
/// Every variant is fatal: it is raised before the first network call.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Validation(Vec<ValidationError>),
    Env { var: String, message: String },
    Wallets(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
            ConfigError::Env { var, message } => write!(f, "Environment {}: {}", var, message),
            ConfigError::Wallets(msg) => write!(f, "Wallet file error: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Load and validate configuration from a TOML file.
///
/// Precedence for the network is `network` (command line), then `NETWORK`,
/// then the file. An `api_url` from the file belongs to the file's network
/// and is dropped when either override switches networks; `LEDGER_API_URL`
/// always applies.
pub fn load_config(path: &Path, network: Option<NetworkKind>) -> Result<OrchestratorConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    let config: OrchestratorConfig = toml::from_str(&content).map_err(ConfigError::Parse)?;
    finalize(config, network)
}

/// Build a configuration without a file: defaults plus overrides.
pub fn load_default(network: Option<NetworkKind>) -> Result<OrchestratorConfig, ConfigError> {
    finalize(OrchestratorConfig::default(), network)
}

fn finalize(
    mut config: OrchestratorConfig,
    network: Option<NetworkKind>,
) -> Result<OrchestratorConfig, ConfigError> {
    apply_overrides(&mut config, network, |var| std::env::var(var).ok())?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Apply the command-line network and the `NETWORK` / `LEDGER_API_URL`
/// environment overrides using the given lookup.
pub fn apply_overrides<F>(
    config: &mut OrchestratorConfig,
    network: Option<NetworkKind>,
    lookup: F,
) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let file_network = config.network.kind;

    if let Some(value) = lookup(NETWORK_ENV_VAR) {
        config.network.kind = value
            .parse::<NetworkKind>()
            .map_err(|message| ConfigError::Env {
                var: NETWORK_ENV_VAR.to_string(),
                message,
            })?;
    }
    if let Some(kind) = network {
        config.network.kind = kind;
    }
    if config.network.kind != file_network {
        config.network.api_url = None;
    }

    if let Some(url) = lookup(API_URL_ENV_VAR) {
        config.network.api_url = Some(url);
    }
    Ok(())
}
