//! Certificate provisioning
//!
//! Makes sure a TLS key pair exists before the listener starts. Existing
//! files are used as-is; otherwise a self-signed certificate covering the
//! loopback address, the LAN address, `localhost`, and the hostname is
//! generated, either with the `openssl` command line tool or in-process
//! with `rcgen`.

use anyhow::{Context, Result};
use rcgen::{
    Certificate, CertificateParams, DistinguishedName, DnType, IsCa, KeyUsagePurpose, SanType,
};
use std::fs;
use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{info, warn};

use crate::utils::network;

/// Validity of generated certificates
pub const VALIDITY_DAYS: u32 = 3650;

/// RSA modulus size requested from openssl
pub const RSA_KEY_BITS: u32 = 2048;

const COMMON_NAME: &str = "ClipSync";
const ORGANIZATION: &str = "HomeNetwork";

/// Ensures a certificate and private key exist on disk
#[cfg_attr(test, mockall::automock)]
pub trait CertificateProvisioner: Send + Sync {
    /// Returns `true` when both files are present afterwards.
    ///
    /// Failures are logged, never raised; on failure no freshly written
    /// cert/key file is left behind.
    fn ensure(&self, cert_path: &Path, key_path: &Path) -> bool;
}

/// Names and addresses a generated certificate is valid for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectAltNames {
    /// IP address entries
    pub ips: Vec<IpAddr>,
    /// DNS name entries
    pub dns: Vec<String>,
}

impl SubjectAltNames {
    /// Loopback, `localhost`, plus the given LAN address and hostname
    pub fn new(local_ip: IpAddr, hostname: &str) -> Self {
        let mut ips = vec![IpAddr::V4(Ipv4Addr::LOCALHOST)];
        if !ips.contains(&local_ip) {
            ips.push(local_ip);
        }

        let mut dns = vec!["localhost".to_string()];
        if !hostname.is_empty() && !dns.iter().any(|d| d == hostname) {
            dns.push(hostname.to_string());
        }

        Self { ips, dns }
    }

    /// Detect the LAN address and hostname of this machine
    pub fn detect() -> Self {
        Self::new(network::local_ip(), &network::hostname())
    }
}

/// Render the `openssl req` configuration for a self-signed certificate
pub fn openssl_config(names: &SubjectAltNames) -> String {
    let mut cnf = format!(
        "[req]\n\
         prompt             = no\n\
         default_bits       = {bits}\n\
         distinguished_name = dn\n\
         x509_extensions    = v3_req\n\
         [dn]\n\
         CN = {cn}\n\
         O  = {org}\n\
         [v3_req]\n\
         subjectAltName = @alt\n\
         basicConstraints = CA:FALSE\n\
         keyUsage = digitalSignature, keyEncipherment\n\
         [alt]\n",
        bits = RSA_KEY_BITS,
        cn = COMMON_NAME,
        org = ORGANIZATION,
    );

    for (i, ip) in names.ips.iter().enumerate() {
        cnf.push_str(&format!("IP.{}  = {}\n", i + 1, ip));
    }
    for (i, name) in names.dns.iter().enumerate() {
        cnf.push_str(&format!("DNS.{} = {}\n", i + 1, name));
    }

    cnf
}

/// Generates certificates by running the `openssl` tool
#[derive(Debug, Clone)]
pub struct OpensslProvisioner {
    program: PathBuf,
}

impl OpensslProvisioner {
    /// Use `openssl` from `PATH`
    pub fn new() -> Self {
        Self::with_program("openssl")
    }

    /// Use a specific openssl binary
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn generate(&self, cert_path: &Path, key_path: &Path, names: &SubjectAltNames) -> Result<()> {
        create_parent_dirs(cert_path, key_path)?;

        let cnf_path = cert_path.with_extension("cnf");
        fs::write(&cnf_path, openssl_config(names))
            .context("Failed to write openssl configuration")?;

        let output = Command::new(&self.program)
            .arg("req")
            .arg("-x509")
            .arg("-nodes")
            .args(["-days", &VALIDITY_DAYS.to_string()])
            .args(["-newkey", &format!("rsa:{}", RSA_KEY_BITS)])
            .arg("-keyout")
            .arg(key_path)
            .arg("-out")
            .arg(cert_path)
            .arg("-config")
            .arg(&cnf_path)
            .output();

        let _ = fs::remove_file(&cnf_path);

        let output = output.with_context(|| {
            format!(
                "Failed to run {:?} (install openssl or provide cert/key files)",
                self.program
            )
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stderr: String = stderr.trim().chars().take(200).collect();
            anyhow::bail!("openssl exited with {}: {}", output.status, stderr);
        }

        if !cert_path.exists() || !key_path.exists() {
            anyhow::bail!("openssl reported success but did not write both files");
        }

        restrict_key_permissions(key_path)?;
        Ok(())
    }
}

impl Default for OpensslProvisioner {
    fn default() -> Self {
        Self::new()
    }
}

impl CertificateProvisioner for OpensslProvisioner {
    fn ensure(&self, cert_path: &Path, key_path: &Path) -> bool {
        ensure_with(cert_path, key_path, |names| {
            self.generate(cert_path, key_path, names)
        })
    }
}

/// Generates certificates in-process with `rcgen` (ECDSA P-256)
#[derive(Debug, Clone, Default)]
pub struct BuiltinProvisioner;

impl BuiltinProvisioner {
    /// Generate a self-signed certificate, returning `(cert_pem, key_pem)`
    pub fn generate_self_signed(
        names: &SubjectAltNames,
        validity_days: u32,
    ) -> Result<(String, String)> {
        let mut params = CertificateParams::default();

        let mut distinguished_name = DistinguishedName::new();
        distinguished_name.push(DnType::CommonName, COMMON_NAME);
        distinguished_name.push(DnType::OrganizationName, ORGANIZATION);
        params.distinguished_name = distinguished_name;

        params.subject_alt_names = names
            .ips
            .iter()
            .map(|ip| SanType::IpAddress(*ip))
            .chain(names.dns.iter().map(|d| SanType::DnsName(d.clone())))
            .collect();

        params.is_ca = IsCa::ExplicitNoCa;
        params.key_usages = vec![
            KeyUsagePurpose::DigitalSignature,
            KeyUsagePurpose::KeyEncipherment,
        ];

        params.not_before = time::OffsetDateTime::now_utc();
        params.not_after =
            time::OffsetDateTime::now_utc() + time::Duration::days(validity_days as i64);

        let cert = Certificate::from_params(params).context("Failed to generate certificate")?;

        let cert_pem = cert
            .serialize_pem()
            .context("Failed to serialize certificate")?;
        let key_pem = cert.serialize_private_key_pem();

        Ok((cert_pem, key_pem))
    }

    fn generate(&self, cert_path: &Path, key_path: &Path, names: &SubjectAltNames) -> Result<()> {
        let (cert_pem, key_pem) = Self::generate_self_signed(names, VALIDITY_DAYS)?;

        create_parent_dirs(cert_path, key_path)?;
        fs::write(cert_path, cert_pem.as_bytes()).context("Failed to write certificate")?;
        fs::write(key_path, key_pem.as_bytes()).context("Failed to write private key")?;
        restrict_key_permissions(key_path)?;

        Ok(())
    }
}

impl CertificateProvisioner for BuiltinProvisioner {
    fn ensure(&self, cert_path: &Path, key_path: &Path) -> bool {
        ensure_with(cert_path, key_path, |names| {
            self.generate(cert_path, key_path, names)
        })
    }
}

/// Shared flow: short-circuit on existing files, generate otherwise, and
/// roll back files created by a failed attempt.
fn ensure_with<F>(cert_path: &Path, key_path: &Path, generate: F) -> bool
where
    F: FnOnce(&SubjectAltNames) -> Result<()>,
{
    let cert_existed = cert_path.exists();
    let key_existed = key_path.exists();

    if cert_existed && key_existed {
        info!("Certificate found: {:?}", cert_path);
        return true;
    }

    info!("Creating self-signed certificate at {:?}", cert_path);
    let names = SubjectAltNames::detect();

    match generate(&names) {
        Ok(()) => {
            info!(
                "Certificate created, valid {} days for {:?} {:?}",
                VALIDITY_DAYS, names.ips, names.dns
            );
            true
        }
        Err(e) => {
            warn!("Certificate generation failed: {:#}", e);
            if !cert_existed {
                let _ = fs::remove_file(cert_path);
            }
            if !key_existed {
                let _ = fs::remove_file(key_path);
            }
            false
        }
    }
}

fn create_parent_dirs(cert_path: &Path, key_path: &Path) -> Result<()> {
    for path in [cert_path, key_path] {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create directory {:?}", parent))?;
            }
        }
    }
    Ok(())
}

fn restrict_key_permissions(key_path: &Path) -> Result<()> {
    // Unix: owner-only (mode 600)
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = fs::metadata(key_path)?.permissions();
        perms.set_mode(0o600);
        fs::set_permissions(key_path, perms)?;
    }
    #[cfg(not(unix))]
    let _ = key_path;
    Ok(())
}
