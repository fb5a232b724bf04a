//! Environment-sourced exposition configuration, read once at startup.

use std::env;

use crate::error::{Error, Result};

pub const ENV_PORT: &str = "PROMETHEUS_PORT";
pub const ENV_PATH: &str = "PROMETHEUS_PATH";
pub const ENV_NAMESPACE: &str = "PROMETHEUS_NAMESPACE";
pub const ENV_SUBSYSTEM: &str = "PROMETHEUS_SUBSYSTEM";

pub const DEFAULT_PATH: &str = "/metrics";
pub const DEFAULT_SUBSYSTEM: &str = "dnsd";

#[derive(Clone, Debug)]
pub struct Config {
    /// Exposition listener port; `None` leaves the listener off.
    pub port: Option<u16>,
    /// HTTP path serving the snapshot.
    pub path: String,
    /// Optional prefix applied to every metric name.
    pub namespace: String,
    /// Second prefix applied to every metric name.
    pub subsystem: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: None,
            path: DEFAULT_PATH.to_string(),
            namespace: String::new(),
            subsystem: DEFAULT_SUBSYSTEM.to_string(),
        }
    }
}

impl Config {
    /// Reads `PROMETHEUS_*` from the process environment. An unset or empty
    /// port disables exposition; a set but non-numeric port is a startup
    /// error, not a silent disable.
    pub fn from_env() -> Result<Config> {
        Self::from_vars(
            env_nonempty(ENV_PORT),
            env_nonempty(ENV_PATH),
            env_nonempty(ENV_NAMESPACE),
            env_nonempty(ENV_SUBSYSTEM),
        )
    }

    pub(crate) fn from_vars(
        port: Option<String>,
        path: Option<String>,
        namespace: Option<String>,
        subsystem: Option<String>,
    ) -> Result<Config> {
        let port = match port {
            Some(value) => Some(
                value
                    .parse::<u16>()
                    .map_err(|source| Error::InvalidPort { value, source })?,
            ),
            None => None,
        };
        Ok(Config {
            port,
            path: path.unwrap_or_else(|| DEFAULT_PATH.to_string()),
            namespace: namespace.unwrap_or_default(),
            subsystem: subsystem.unwrap_or_else(|| DEFAULT_SUBSYSTEM.to_string()),
        })
    }
}

fn env_nonempty(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.is_empty())
}
