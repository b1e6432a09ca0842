//! Gateway configuration, read once from the environment at startup.

use crate::models::Host;
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_LISTEN: &str = "0.0.0.0:8000";
pub const DEFAULT_QUERY_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("environment variable {key} is required")]
    Missing { key: &'static str },

    #[error("environment variable {key}={value:?} is invalid: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Rendering of an unavailable metric in the response document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnavailableAs {
    #[default]
    Zero,
    Null,
}

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub prometheus_url: String,
    pub hosts: Vec<Host>,
    pub listen: SocketAddr,
    pub query_timeout: Duration,
    pub unavailable_as: UnavailableAs,
}

impl GatewayConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let prometheus_url = lookup("PROMETHEUS_URL")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .ok_or(ConfigError::Missing { key: "PROMETHEUS_URL" })?;

        let hosts = parse_hosts(&lookup("NODES").unwrap_or_default());
        if hosts.is_empty() {
            return Err(ConfigError::Missing { key: "NODES" });
        }

        let listen_raw = lookup("GATEWAY_LISTEN").unwrap_or_else(|| DEFAULT_LISTEN.to_string());
        let listen = listen_raw
            .trim()
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::Invalid {
                key: "GATEWAY_LISTEN",
                value: listen_raw.clone(),
                reason: e.to_string(),
            })?;

        let query_timeout = match lookup("QUERY_TIMEOUT_SECS") {
            None => Duration::from_secs(DEFAULT_QUERY_TIMEOUT_SECS),
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    return Err(ConfigError::Invalid {
                        key: "QUERY_TIMEOUT_SECS",
                        value: raw,
                        reason: "expected a positive number of seconds".into(),
                    })
                }
            },
        };

        let unavailable_as = match lookup("UNAVAILABLE_AS").as_deref().map(str::trim) {
            None | Some("") | Some("zero") => UnavailableAs::Zero,
            Some("null") => UnavailableAs::Null,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    key: "UNAVAILABLE_AS",
                    value: other.to_string(),
                    reason: "expected `zero` or `null`".into(),
                })
            }
        };

        Ok(Self {
            prometheus_url,
            hosts,
            listen,
            query_timeout,
            unavailable_as,
        })
    }
}

/// Parses `instance[=label],...`. Blank entries are skipped; only the text
/// between the first and second `=` is used as label.
pub fn parse_hosts(raw: &str) -> Vec<Host> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .filter_map(|entry| {
            let mut parts = entry.split('=');
            let instance = parts.next()?.trim();
            if instance.is_empty() {
                return None;
            }
            let label = parts.next().map(|l| l.trim().to_string());
            Some(Host::new(instance, label))
        })
        .collect()
}
