//! TLS configuration and management
//!
//! Loads the PEM key pair into a rustls server configuration (TLS 1.2 and
//! 1.3, ring provider) and hands out acceptors for the listener.

use anyhow::{Context, Result};
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::ServerConfig;
use std::path::Path;
use std::sync::Arc;
use tokio_rustls::TlsAcceptor;
use tracing::{debug, info};

/// TLS configuration wrapper
#[derive(Clone)]
pub struct TlsConfig {
    /// Certificate chain
    cert_chain: Vec<CertificateDer<'static>>,

    /// rustls ServerConfig
    server_config: Arc<ServerConfig>,
}

impl TlsConfig {
    /// Create TLS config from PEM files
    pub fn from_files(cert_path: &Path, key_path: &Path) -> Result<Self> {
        info!("Loading TLS configuration from files");
        debug!("Certificate: {:?}", cert_path);
        debug!("Private key: {:?}", key_path);

        let cert_file =
            std::fs::File::open(cert_path).context("Failed to open certificate file")?;
        let mut cert_reader = std::io::BufReader::new(cert_file);
        let certs = rustls_pemfile::certs(&mut cert_reader)
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to parse certificate")?;

        if certs.is_empty() {
            anyhow::bail!("No certificates found in file");
        }

        // PKCS#8, PKCS#1 (openssl RSA) and SEC1 keys are all accepted
        let key_file = std::fs::File::open(key_path).context("Failed to open private key file")?;
        let mut key_reader = std::io::BufReader::new(key_file);
        let private_key: PrivateKeyDer<'static> = rustls_pemfile::private_key(&mut key_reader)
            .context("Failed to parse private key")?
            .ok_or_else(|| anyhow::anyhow!("No private key found in file"))?;

        let provider = Arc::new(rustls::crypto::ring::default_provider());
        let mut server_config = ServerConfig::builder_with_provider(provider)
            .with_protocol_versions(&[&rustls::version::TLS13, &rustls::version::TLS12])
            .context("Failed to configure TLS versions")?
            .with_no_client_auth()
            .with_single_cert(certs.clone(), private_key)
            .context("Failed to configure certificate")?;

        server_config.alpn_protocols = vec![b"http/1.1".to_vec()];

        info!("TLS configuration created successfully");

        Ok(Self {
            cert_chain: certs,
            server_config: Arc::new(server_config),
        })
    }

    /// Get rustls ServerConfig
    pub fn server_config(&self) -> Arc<ServerConfig> {
        self.server_config.clone()
    }

    /// Get certificate chain
    pub fn certificates(&self) -> &[CertificateDer<'static>] {
        &self.cert_chain
    }

    /// Acceptor wrapping accepted TCP streams
    pub fn acceptor(&self) -> TlsAcceptor {
        TlsAcceptor::from(self.server_config())
    }
}
