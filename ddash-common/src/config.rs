//! Configuration loading and resolution
//!
//! Every setting is resolved with the same priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! The default TOML location is optional: a missing or unreadable file there
//! is logged and the remaining tiers apply. A file named with `--config` must
//! load, otherwise resolution fails.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Environment variable holding the listen port
pub const ENV_PORT: &str = "PORT";
/// Environment variable holding the bind host
pub const ENV_BIND: &str = "DDASH_BIND";
/// Environment variable holding the tracking store path
pub const ENV_DATA_FILE: &str = "DDASH_DATA_FILE";

/// Compiled defaults used when no other tier supplies a value
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub port: u16,
    pub bind: String,
    pub data_file: PathBuf,
    pub log_level: String,
}

impl Default for CompiledDefaults {
    fn default() -> Self {
        Self {
            port: 3001,
            bind: "127.0.0.1".to_string(),
            data_file: PathBuf::from("tracking-data.json"),
            log_level: "info".to_string(),
        }
    }
}

/// Logging section of the TOML file
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LoggingConfig {
    pub level: Option<String>,
}

/// On-disk TOML configuration. Every key is optional.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TomlConfig {
    pub port: Option<u16>,
    pub bind: Option<String>,
    pub data_file: Option<PathBuf>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Values supplied on the command line
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub port: Option<u16>,
    pub bind: Option<String>,
    pub data_file: Option<PathBuf>,
    pub config_file: Option<PathBuf>,
}

/// Fully resolved service configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    pub port: u16,
    pub bind: String,
    pub data_file: PathBuf,
    pub log_level: String,
}

impl ServiceConfig {
    /// `host:port` string suitable for `TcpListener::bind`
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}

/// Parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)?;
    let config = toml::from_str(&content)?;
    Ok(config)
}

/// Default config file location: `<config_dir>/ddash/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("ddash").join("config.toml"))
}

/// Resolves a [`ServiceConfig`] from CLI, environment, TOML and defaults
pub struct ConfigResolver {
    defaults: CompiledDefaults,
}

impl ConfigResolver {
    pub fn new() -> Self {
        Self {
            defaults: CompiledDefaults::default(),
        }
    }

    pub fn with_defaults(defaults: CompiledDefaults) -> Self {
        Self { defaults }
    }

    /// Resolve the configuration.
    ///
    /// An explicitly requested config file (`--config`) that cannot be loaded
    /// is an error; the implicit default location is optional.
    pub fn resolve(&self, cli: &CliOverrides) -> Result<ServiceConfig> {
        let toml = match &cli.config_file {
            Some(path) => load_toml_config(path).map_err(|e| {
                Error::Config(format!("Failed to load {}: {}", path.display(), e))
            })?,
            None => self.load_default_toml(),
        };

        Ok(self.merge(cli, &toml))
    }

    fn load_default_toml(&self) -> TomlConfig {
        let Some(path) = default_config_path() else {
            return TomlConfig::default();
        };

        if !path.exists() {
            debug!("No config file at {}, using defaults", path.display());
            return TomlConfig::default();
        }

        match load_toml_config(&path) {
            Ok(config) => config,
            Err(e) => {
                warn!("Ignoring config file {}: {}", path.display(), e);
                TomlConfig::default()
            }
        }
    }

    /// Merge the tiers, highest priority first
    pub fn merge(&self, cli: &CliOverrides, toml: &TomlConfig) -> ServiceConfig {
        let port = cli
            .port
            .or_else(env_port)
            .or(toml.port)
            .unwrap_or(self.defaults.port);

        let bind = cli
            .bind
            .clone()
            .or_else(|| env_string(ENV_BIND))
            .or_else(|| toml.bind.clone())
            .unwrap_or_else(|| self.defaults.bind.clone());

        let data_file = cli
            .data_file
            .clone()
            .or_else(|| env_string(ENV_DATA_FILE).map(PathBuf::from))
            .or_else(|| toml.data_file.clone())
            .unwrap_or_else(|| self.defaults.data_file.clone());

        let log_level = toml
            .logging
            .level
            .clone()
            .unwrap_or_else(|| self.defaults.log_level.clone());

        ServiceConfig {
            port,
            bind,
            data_file,
            log_level,
        }
    }
}

impl Default for ConfigResolver {
    fn default() -> Self {
        Self::new()
    }
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn env_port() -> Option<u16> {
    let raw = env_string(ENV_PORT)?;
    match raw.trim().parse::<u16>() {
        Ok(port) => Some(port),
        Err(_) => {
            warn!("Ignoring invalid {}={:?}", ENV_PORT, raw);
            None
        }
    }
}
