//! Configuration type definitions

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Listener configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to bind (e.g., "0.0.0.0")
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Seconds a single request may take before the connection is aborted
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Largest accepted request body in bytes
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_max_body_bytes() -> usize {
    50 * 1024 * 1024
}

/// Security and authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// Shared token required on API requests (empty = auth disabled)
    #[serde(default)]
    pub token: String,

    /// Serve over TLS
    #[serde(default = "default_true")]
    pub https: bool,

    /// Path to TLS certificate file
    pub cert_path: PathBuf,

    /// Path to TLS private key file
    pub key_path: PathBuf,

    /// Certificate generator used when no key pair exists ("openssl", "builtin")
    #[serde(default = "default_cert_generator")]
    pub cert_generator: String,
}

fn default_true() -> bool {
    true
}

fn default_cert_generator() -> String {
    "openssl".to_string()
}

/// Entry storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Path of the JSON snapshot
    pub data_path: PathBuf,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level ("trace", "debug", "info", "warn", "error")
    pub level: String,

    /// Directory for rolling log files (None = console only)
    pub log_dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_dir: None,
        }
    }
}
