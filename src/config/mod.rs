//! Configuration management
//!
//! Handles loading, validation, and merging of configuration from:
//! - TOML files
//! - Environment variables
//! - CLI arguments
//!
//! The resulting [`Config`] is built once at startup and shared read-only
//! by the router, the store, and the transport bootstrap.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

pub mod types;

pub use types::{LoggingConfig, SecurityConfig, ServerConfig, StorageConfig};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Listener configuration
    pub server: ServerConfig,
    /// Security configuration
    pub security: SecurityConfig,
    /// Storage configuration
    pub storage: StorageConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Values supplied on the command line or through `CLIPSYNC_*` variables.
///
/// Every field is optional; `None` keeps whatever the file or defaults set.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    /// Bind host
    pub host: Option<String>,
    /// Listen port
    pub port: Option<u16>,
    /// Auth token
    pub token: Option<String>,
    /// TLS toggle
    pub https: Option<bool>,
    /// Certificate path
    pub cert_path: Option<PathBuf>,
    /// Private key path
    pub key_path: Option<PathBuf>,
    /// Snapshot path
    pub data_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .context(format!("Failed to read config file: {}", path))?;

        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from file, or defaults if it does not exist.
    ///
    /// The flag is false when defaults were used. Unreadable, malformed, or
    /// invalid files are still errors.
    pub fn load_or_default(path: &str) -> Result<(Self, bool)> {
        if !std::path::Path::new(path).exists() {
            return Ok((Self::default_config(), false));
        }
        Ok((Self::load(path)?, true))
    }

    /// Create default configuration
    pub fn default_config() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8765,
                request_timeout_secs: 30,
                max_body_bytes: 50 * 1024 * 1024,
            },
            security: SecurityConfig {
                token: String::new(),
                https: true,
                cert_path: PathBuf::from("clipsync.crt"),
                key_path: PathBuf::from("clipsync.key"),
                cert_generator: "openssl".to_string(),
            },
            storage: StorageConfig {
                data_path: PathBuf::from("clipsync_data.json"),
            },
            logging: LoggingConfig::default(),
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        self.listen_addr().context("Invalid listen address")?;

        if self.server.request_timeout_secs == 0 {
            anyhow::bail!("request_timeout_secs must be greater than zero");
        }

        if self.server.max_body_bytes == 0 {
            anyhow::bail!("max_body_bytes must be greater than zero");
        }

        match self.security.cert_generator.as_str() {
            "openssl" | "builtin" => {}
            other => anyhow::bail!("Invalid certificate generator: {}", other),
        }

        if self.storage.data_path.as_os_str().is_empty() {
            anyhow::bail!("Storage data_path cannot be empty");
        }

        Ok(())
    }

    /// Override config with CLI arguments / environment
    pub fn with_overrides(mut self, overrides: Overrides) -> Self {
        if let Some(host) = overrides.host {
            self.server.host = host;
        }
        if let Some(port) = overrides.port {
            self.server.port = port;
        }
        if let Some(token) = overrides.token {
            self.security.token = token;
        }
        if let Some(https) = overrides.https {
            self.security.https = https;
        }
        if let Some(cert_path) = overrides.cert_path {
            self.security.cert_path = cert_path;
        }
        if let Some(key_path) = overrides.key_path {
            self.security.key_path = key_path;
        }
        if let Some(data_path) = overrides.data_path {
            self.storage.data_path = data_path;
        }

        self
    }

    /// Socket address the listener binds to
    pub fn listen_addr(&self) -> Result<SocketAddr> {
        let addr = format!("{}:{}", self.server.host, self.server.port);
        addr.parse::<SocketAddr>()
            .context(format!("Cannot parse '{}' as a socket address", addr))
    }

    /// Per-request timeout
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }

    /// Token required on API requests, if auth is enabled
    pub fn token(&self) -> Option<&str> {
        if self.security.token.is_empty() {
            None
        } else {
            Some(&self.security.token)
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default_config();
        assert_eq!(config.server.port, 8765);
        assert!(config.security.https);
        assert!(config.token().is_none());
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_invalid_address() {
        let mut config = Config::default_config();
        config.server.host = "not an address".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_invalid_generator() {
        let mut config = Config::default_config();
        config.security.cert_generator = "makecert".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_overrides_apply_only_set_fields() {
        let config = Config::default_config().with_overrides(Overrides {
            port: Some(9000),
            token: Some("secret".to_string()),
            https: Some(false),
            ..Default::default()
        });

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.token(), Some("secret"));
        assert!(!config.security.https);
        assert_eq!(config.storage.data_path, PathBuf::from("clipsync_data.json"));
    }

    #[test]
    fn test_load_partial_toml() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("clipsync.toml");
        std::fs::write(
            &path,
            r#"
[server]
host = "127.0.0.1"
port = 9100

[security]
token = "abc"
cert_path = "/tmp/c.crt"
key_path = "/tmp/c.key"

[storage]
data_path = "/tmp/data.json"
"#,
        )
        .unwrap();

        let config = Config::load(path.to_str().unwrap()).unwrap();
        assert_eq!(config.server.port, 9100);
        assert_eq!(config.server.max_body_bytes, 50 * 1024 * 1024);
        assert!(config.security.https);
        assert_eq!(config.security.cert_generator, "openssl");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("absent.toml");

        let (config, found) = Config::load_or_default(path.to_str().unwrap()).unwrap();
        assert!(!found);
        assert_eq!(config.server.port, Config::default_config().server.port);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "[server\nport = ").unwrap();

        assert!(Config::load_or_default(path.to_str().unwrap()).is_err());
    }
}
