use parks::errors::{ErrorKind, ParksError, ParksResult};
use std::time::Duration;

pub const DEFAULT_IP: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub const ENV_IP: &str = "PARKS_IP";
pub const ENV_PORT: &str = "PARKS_PORT";
pub const ENV_REQUEST_TIMEOUT_MS: &str = "PARKS_REQUEST_TIMEOUT_MS";

/// Settings of the HTTP listener.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub ip: String,
    pub port: u16,
    pub request_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            ip: DEFAULT_IP.to_string(),
            port: DEFAULT_PORT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> ParksResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> ParksResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut config = Self::default();
        if let Some(ip) = value(ENV_IP) {
            config.ip = ip;
        }
        if let Some(port) = value(ENV_PORT) {
            config.port = port.parse::<u16>().map_err(|e| invalid(ENV_PORT, &port, e))?;
        }
        if let Some(timeout) = value(ENV_REQUEST_TIMEOUT_MS) {
            let millis = timeout
                .parse::<u64>()
                .map_err(|e| invalid(ENV_REQUEST_TIMEOUT_MS, &timeout, e))?;
            config.request_timeout = Duration::from_millis(millis);
        }
        Ok(config)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.ip, self.port)
    }
}

fn invalid(key: &str, raw: &str, err: impl std::fmt::Display) -> ParksError {
    ParksError::new(
        &format!("invalid value '{}' for {}: {}", raw, key, err),
        ErrorKind::ConfigError,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.bind_addr(), "0.0.0.0:8080");
    }

    #[test]
    fn test_reads_values() {
        let config = ServerConfig::from_lookup(|key| match key {
            ENV_IP => Some("127.0.0.1".to_string()),
            ENV_PORT => Some("3000".to_string()),
            ENV_REQUEST_TIMEOUT_MS => Some("250".to_string()),
            _ => None,
        })
        .unwrap();
        assert_eq!(config.bind_addr(), "127.0.0.1:3000");
        assert_eq!(config.request_timeout, Duration::from_millis(250));
    }

    #[test]
    fn test_invalid_port() {
        let err = ServerConfig::from_lookup(|key| (key == ENV_PORT).then(|| "99999".to_string()))
            .unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::ConfigError);
        assert!(err.message().contains(ENV_PORT));
    }
}
