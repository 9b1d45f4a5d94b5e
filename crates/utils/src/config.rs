use std::{
    env, fs, io,
    path::{Path, PathBuf},
};

use serde::Deserialize;
use thiserror::Error;

/// Location of the facade configuration file.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/sendmail-facade/facade.toml";

/// Environment variable overriding [`DEFAULT_CONFIG_PATH`].
pub const CONFIG_PATH_ENV: &str = "SENDMAIL_FACADE_CONFIG";

/// Location of the sender routing table.
pub const DEFAULT_TRANSPORTS_PATH: &str = "/etc/sendmail-facade/transports.json";

/// Top-level configuration of the sendmail facade.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Config {
    /// Path of the JSON routing table mapping senders to transports.
    #[serde(default = "default_transports")]
    pub transports: PathBuf,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            transports: default_transports(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Loads the configuration from [`config_path`], using the defaults
    /// when no configuration file exists.
    pub fn load() -> Result<Self, ConfigError> {
        let path = config_path();
        if !path.exists() {
            return Ok(Self::default());
        }
        load_config(&path)
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Forward informational records to the system log.
    #[serde(default = "default_true")]
    pub syslog: bool,

    /// Tag attached to records forwarded to the system log.
    #[serde(default = "default_syslog_ident")]
    pub syslog_ident: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            syslog: default_true(),
            syslog_ident: default_syslog_ident(),
        }
    }
}

/// Returns the configuration file path, honouring [`CONFIG_PATH_ENV`].
pub fn config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

/// Loads configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An I/O error occurred reading the file.
    #[error("Config I/O error: {0}")]
    Io(#[from] io::Error),

    /// A parse error occurred deserializing TOML.
    #[error("Config parse error: {0}")]
    Parse(#[from] toml::de::Error),
}

fn default_transports() -> PathBuf {
    PathBuf::from(DEFAULT_TRANSPORTS_PATH)
}

fn default_true() -> bool {
    true
}

fn default_syslog_ident() -> String {
    "sendmail-facade".to_string()
}
