//! Security module coordination
//!
//! Coordinates token authorization, certificate provisioning, and TLS.

use tracing::{info, warn};

pub mod auth;
pub mod certificates;
pub mod tls;

pub use auth::{TokenAuthenticator, TOKEN_HEADER};
pub use certificates::{
    BuiltinProvisioner, CertificateProvisioner, OpensslProvisioner, SubjectAltNames,
};
pub use tls::TlsConfig;

use crate::config::SecurityConfig;

/// Provisioner selected by `security.cert_generator`
pub fn provisioner_for(config: &SecurityConfig) -> Box<dyn CertificateProvisioner> {
    match config.cert_generator.as_str() {
        "builtin" => Box::new(BuiltinProvisioner),
        _ => Box::new(OpensslProvisioner::new()),
    }
}

/// Resolve the TLS configuration for the listener.
///
/// Returns `None` when TLS is disabled, when provisioning fails, or when
/// the key pair cannot be loaded; the caller then serves plaintext.
pub fn prepare_tls(
    config: &SecurityConfig,
    provisioner: &dyn CertificateProvisioner,
) -> Option<TlsConfig> {
    if !config.https {
        info!("TLS disabled by configuration");
        return None;
    }

    if !provisioner.ensure(&config.cert_path, &config.key_path) {
        warn!("No usable certificate, falling back to plaintext HTTP");
        return None;
    }

    match TlsConfig::from_files(&config.cert_path, &config.key_path) {
        Ok(tls) => {
            info!(
                "TLS enabled with {} certificate(s) from {:?}",
                tls.certificates().len(),
                config.cert_path
            );
            Some(tls)
        }
        Err(e) => {
            warn!("Failed to load TLS key pair ({:#}), falling back to plaintext HTTP", e);
            None
        }
    }
}
