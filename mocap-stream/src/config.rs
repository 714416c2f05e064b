//! Listener configuration
//!
//! Loads from a TOML file. Every field has a default, so an empty file (or
//! `ListenerConfig::default()`) listens on `0.0.0.0:31455`.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use std::time::Duration;

/// Default UDP port the capture application streams to
pub const DEFAULT_PORT: u16 = 31455;

/// Largest payload a UDP datagram can carry
pub const MAX_UDP_DATAGRAM: usize = 65535;

/// Receive loop configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Local interface to bind
    ///
    /// Examples:
    /// - `0.0.0.0` - All interfaces
    /// - `127.0.0.1` - Localhost only
    pub bind_address: String,

    /// UDP port (0 picks an ephemeral port)
    pub port: u16,

    /// Read timeout of the receive thread; bounds stop latency only when
    /// the wake-up datagram sent by `stop()` fails
    pub poll_interval_ms: u64,

    /// Receive buffer size; longer datagrams are truncated by the OS and
    /// then fail to decode
    pub max_datagram_size: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            poll_interval_ms: 50,
            max_datagram_size: MAX_UDP_DATAGRAM,
        }
    }
}

impl ListenerConfig {
    /// Default config with a port override
    pub fn with_port(port: u16) -> Self {
        Self {
            port,
            ..Self::default()
        }
    }

    /// Load configuration from TOML file
    ///
    /// # Example
    /// ```no_run
    /// use mocap_stream::config::ListenerConfig;
    ///
    /// let config = ListenerConfig::from_file("mocap.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parse and validate configuration from a TOML string
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: ListenerConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Reject values the receive loop cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_ms == 0 {
            // A zero read timeout means "block forever" to the OS, which
            // would make stop() hang on a silent port.
            return Err(Error::InvalidConfig(
                "poll_interval_ms must be greater than zero".into(),
            ));
        }
        if self.max_datagram_size == 0 {
            return Err(Error::InvalidConfig(
                "max_datagram_size must be greater than zero".into(),
            ));
        }
        self.socket_addr()?;
        Ok(())
    }

    /// Resolve `bind_address` and `port` into a socket address
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        let ip: IpAddr = self.bind_address.parse().map_err(|e| {
            Error::InvalidConfig(format!("Invalid bind address {}: {}", self.bind_address, e))
        })?;
        Ok(SocketAddr::new(ip, self.port))
    }

    /// Poll interval as a duration
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ListenerConfig::default();
        assert_eq!(config.port, 31455);
        assert_eq!(config.bind_address, "0.0.0.0");
        assert_eq!(config.poll_interval(), Duration::from_millis(50));
        assert!(config.validate().is_ok());
        assert_eq!(
            config.socket_addr().unwrap(),
            "0.0.0.0:31455".parse::<SocketAddr>().unwrap()
        );
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = ListenerConfig::from_toml_str("port = 40000\n").unwrap();
        assert_eq!(config.port, 40000);
        assert_eq!(config.bind_address, "0.0.0.0");
        assert_eq!(config.max_datagram_size, MAX_UDP_DATAGRAM);
    }

    #[test]
    fn test_toml_deserialization() {
        let toml_content = r#"
bind_address = "127.0.0.1"
port = 0
poll_interval_ms = 10
max_datagram_size = 2048
"#;
        let config = ListenerConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.bind_address, "127.0.0.1");
        assert_eq!(config.port, 0);
        assert_eq!(config.poll_interval_ms, 10);
        assert_eq!(config.max_datagram_size, 2048);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(
            ListenerConfig::from_toml_str("poll_interval_ms = 0"),
            Err(Error::InvalidConfig(_))
        ));
        assert!(matches!(
            ListenerConfig::from_toml_str("max_datagram_size = 0"),
            Err(Error::InvalidConfig(_))
        ));
        assert!(matches!(
            ListenerConfig::from_toml_str("bind_address = \"not-an-ip\""),
            Err(Error::InvalidConfig(_))
        ));
        assert!(matches!(
            ListenerConfig::from_toml_str("port = \"abc\""),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mocap.toml");

        let config = ListenerConfig {
            bind_address: "127.0.0.1".to_string(),
            ..ListenerConfig::with_port(32000)
        };
        config.to_file(&path).unwrap();

        let loaded = ListenerConfig::from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }
}
