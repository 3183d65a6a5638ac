//! Run configuration.

use radacct_types::EndpointError;
use serde::{Deserialize, Deserializer};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Problems that make a run impossible before any event is generated.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: concurrency must be at least 1")]
    ZeroConcurrency,

    #[error("Invalid configuration: max interim updates per endpoint must be at least 1")]
    ZeroMaxInterim,

    #[error("Invalid configuration: lane capacity must be at least 1")]
    ZeroLaneCapacity,

    #[error("Invalid configuration: send timeout must be positive")]
    ZeroSendTimeout,

    #[error("Invalid configuration: target host is empty")]
    EmptyHost,

    #[error("Invalid configuration: {count} endpoints overflow the address space")]
    AddressSpaceExhausted { count: usize },

    #[error("Invalid configuration: session count overflows for endpoint {ordinal}")]
    SessionCountOverflow { ordinal: usize },

    #[error("Invalid configuration: {0}")]
    Endpoint(#[from] EndpointError),

    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Configuration for a load-test run.
///
/// Missing keys in a TOML file fall back to the defaults below.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    /// Accounting server host name or address.
    pub host: String,

    /// Accounting server UDP port.
    pub port: u16,

    /// RADIUS shared secret.
    pub secret: String,

    /// Called-Station-Id attached to every request.
    pub called_station_id: String,

    /// Prefix of each Acct-Session-Id; the endpoint's hardware address follows.
    pub session_id_prefix: String,

    /// Number of simulated endpoints.
    pub endpoint_count: usize,

    /// Minimum interim updates per endpoint.
    pub min_interim_per_endpoint: u32,

    /// Modulus for the extra interim updates per endpoint. Must be at least 1.
    pub max_interim_per_endpoint: u32,

    /// Number of lanes, and therefore concurrent workers.
    pub concurrency: usize,

    /// Events a lane holds before the generator has to wait.
    pub lane_capacity: usize,

    /// Deadline for a single send.
    #[serde(deserialize_with = "deserialize_duration")]
    pub send_timeout: Duration,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 1813,
            secret: "secret".to_string(),
            called_station_id: "02:00:00:00:00:01".to_string(),
            session_id_prefix: "acct-tester-".to_string(),
            endpoint_count: 1,
            min_interim_per_endpoint: 0,
            max_interim_per_endpoint: 20,
            concurrency: 1,
            lane_capacity: 100,
            send_timeout: Duration::from_secs(5),
        }
    }
}

impl RunConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a TOML document.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    /// Read and parse a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    /// Set the target server.
    pub fn with_target(mut self, host: impl Into<String>, port: u16) -> Self {
        self.host = host.into();
        self.port = port;
        self
    }

    /// Set the shared secret.
    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = secret.into();
        self
    }

    /// Set the number of simulated endpoints.
    pub fn with_endpoint_count(mut self, count: usize) -> Self {
        self.endpoint_count = count;
        self
    }

    /// Set the interim update bounds.
    pub fn with_interim_bounds(mut self, min: u32, max: u32) -> Self {
        self.min_interim_per_endpoint = min;
        self.max_interim_per_endpoint = max;
        self
    }

    /// Set the number of concurrent workers.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Set the per-lane queue capacity.
    pub fn with_lane_capacity(mut self, capacity: usize) -> Self {
        self.lane_capacity = capacity;
        self
    }

    /// Set the per-send deadline.
    pub fn with_send_timeout(mut self, timeout: Duration) -> Self {
        self.send_timeout = timeout;
        self
    }

    /// `host:port` of the accounting server.
    pub fn target(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Check the values that would otherwise fail mid-run.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.concurrency == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }
        if self.max_interim_per_endpoint == 0 {
            return Err(ConfigError::ZeroMaxInterim);
        }
        if self.lane_capacity == 0 {
            return Err(ConfigError::ZeroLaneCapacity);
        }
        if self.send_timeout.is_zero() {
            return Err(ConfigError::ZeroSendTimeout);
        }
        if self.host.trim().is_empty() {
            return Err(ConfigError::EmptyHost);
        }
        Ok(())
    }
}

/// Accepts human-readable durations such as `"5s"` or `"250ms"`.
fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    humantime::parse_duration(&s).map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = RunConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.target(), "127.0.0.1:1813");
        assert_eq!(config.max_interim_per_endpoint, 20);
        assert_eq!(config.lane_capacity, 100);
    }

    #[test]
    fn test_validate_rejects_zero_values() {
        let config = RunConfig::new().with_concurrency(0);
        assert!(matches!(config.validate(), Err(ConfigError::ZeroConcurrency)));

        let config = RunConfig::new().with_interim_bounds(0, 0);
        assert!(matches!(config.validate(), Err(ConfigError::ZeroMaxInterim)));

        let config = RunConfig::new().with_lane_capacity(0);
        assert!(matches!(config.validate(), Err(ConfigError::ZeroLaneCapacity)));

        let config = RunConfig::new().with_send_timeout(Duration::ZERO);
        assert!(matches!(config.validate(), Err(ConfigError::ZeroSendTimeout)));

        let config = RunConfig::new().with_target(" ", 1813);
        assert!(matches!(config.validate(), Err(ConfigError::EmptyHost)));
    }

    #[test]
    fn test_toml_partial_uses_defaults() {
        let config = RunConfig::from_toml_str(
            r#"
            host = "radius.example"
            endpoint_count = 500
            concurrency = 8
            send_timeout = "250ms"
            "#,
        )
        .unwrap();

        assert_eq!(config.host, "radius.example");
        assert_eq!(config.endpoint_count, 500);
        assert_eq!(config.concurrency, 8);
        assert_eq!(config.send_timeout, Duration::from_millis(250));
        assert_eq!(config.port, 1813);
        assert_eq!(config.session_id_prefix, "acct-tester-");
    }

    #[test]
    fn test_toml_rejects_unknown_keys() {
        let result = RunConfig::from_toml_str("hots = \"typo\"");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_toml_rejects_bad_duration() {
        let result = RunConfig::from_toml_str("send_timeout = \"soon\"");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_from_toml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "port = 11813\nsecret = \"testing123\"").unwrap();

        let config = RunConfig::from_toml_file(file.path()).unwrap();
        assert_eq!(config.port, 11813);
        assert_eq!(config.secret, "testing123");
    }

    #[test]
    fn test_missing_file() {
        let result = RunConfig::from_toml_file("/nonexistent/radacct.toml");
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }
}
