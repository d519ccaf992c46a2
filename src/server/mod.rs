//! Server Implementation Module
//!
//! Binds the listening socket, decides between plaintext and TLS, and
//! serves each accepted connection on its own task with HTTP/1.1
//! keep-alive.
//!
//! # Architecture
//!
//! ```text
//! ClipServer
//!   ├─> CertificateProvisioner (self-signed key pair, once at startup)
//!   ├─> TlsAcceptor (optional, rustls)
//!   └─> Router (axum)
//!         ├─> TokenAuthenticator
//!         ├─> EntryClassifier
//!         └─> EntryStore (JSON snapshot)
//! ```
//!
//! # Example
//!
//! ```no_run
//! use clipsync::config::Config;
//! use clipsync::server::ClipServer;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::default_config();
//!     let server = ClipServer::new(config).await?;
//!     server.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Timeouts
//!
//! A request that is not answered within `server.request_timeout_secs`
//! aborts its connection without a response. The same bound applies to
//! TLS handshakes and to idle keep-alive connections waiting for the next
//! request head.

mod body;
mod error;
mod router;
mod ui;

pub use body::read_limited;
pub use error::ApiError;
pub use router::{create_router, AppState, EntriesResponse, PushRequest, PushResponse};

use anyhow::{Context, Result};
use axum::Router;
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper_util::rt::{TokioIo, TokioTimer};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio::time::error::Elapsed;
use tokio_rustls::TlsAcceptor;
use tower::ServiceExt;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::security::{self, CertificateProvisioner, TlsConfig};
use crate::utils::network;

/// Clipboard sync server
pub struct ClipServer {
    config: Arc<Config>,
    listener: TcpListener,
    state: Arc<AppState>,
    router: Router,
    tls: Option<TlsConfig>,
}

impl ClipServer {
    /// Create a server using the provisioner named in the configuration
    pub async fn new(config: Config) -> Result<Self> {
        let provisioner = security::provisioner_for(&config.security);
        Self::with_provisioner(config, provisioner.as_ref()).await
    }

    /// Create a server with an explicit certificate provisioner.
    ///
    /// Provisioning runs at most once, here. If it fails the server still
    /// starts, in plaintext mode.
    pub async fn with_provisioner(
        config: Config,
        provisioner: &dyn CertificateProvisioner,
    ) -> Result<Self> {
        info!("Initializing ClipSync server");
        config.validate()?;

        let tls = security::prepare_tls(&config.security, provisioner);

        let addr = config.listen_addr()?;
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind {}", addr))?;

        let state = Arc::new(AppState::from_config(&config));
        let router = create_router(state.clone());

        Ok(Self {
            config: Arc::new(config),
            listener,
            state,
            router,
            tls,
        })
    }

    /// Address the listener is bound to
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener
            .local_addr()
            .context("Failed to read listener address")
    }

    /// Whether connections are wrapped in TLS
    pub fn is_tls(&self) -> bool {
        self.tls.is_some()
    }

    /// Run until the process is stopped
    pub async fn run(self) -> Result<()> {
        self.run_until(std::future::pending()).await
    }

    /// Run until `shutdown` resolves
    pub async fn run_until<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        self.log_banner();

        let acceptor = self.tls.as_ref().map(TlsConfig::acceptor);
        let timeout = self.config.request_timeout();

        tokio::pin!(shutdown);

        loop {
            let (stream, peer) = tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown requested, no longer accepting connections");
                    return Ok(());
                }
                accepted = self.listener.accept() => match accepted {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        warn!("Failed to accept connection: {}", e);
                        tokio::time::sleep(Duration::from_millis(100)).await;
                        continue;
                    }
                },
            };

            debug!("Accepted connection from {}", peer);
            let router = self.router.clone();
            let acceptor = acceptor.clone();

            tokio::spawn(async move {
                match acceptor {
                    Some(acceptor) => {
                        serve_tls(acceptor, stream, peer, router, timeout).await;
                    }
                    None => serve_connection(stream, peer, router, timeout).await,
                }
            });
        }
    }

    fn log_banner(&self) {
        let scheme = if self.is_tls() { "https" } else { "http" };
        let port = self
            .local_addr()
            .map(|a| a.port())
            .unwrap_or(self.config.server.port);

        info!("╔════════════════════════════════════════════════════════════╗");
        info!("║          ClipSync is running                               ║");
        info!("╚════════════════════════════════════════════════════════════╝");
        info!("  Local:    {}://localhost:{}", scheme, port);
        info!("  Network:  {}://{}:{}", scheme, network::local_ip(), port);
        info!(
            "  Mode:     {}",
            if self.is_tls() {
                "HTTPS (self-signed)"
            } else {
                "HTTP"
            }
        );
        info!("  Auth:     {}", self.state.auth.redacted());
        info!("  Data:     {:?}", self.config.storage.data_path);
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        if self.is_tls() {
            info!("Browsers will warn once about the self-signed certificate");
        }
        if !self.state.auth.is_enabled() {
            warn!("No access token set, anyone on the network can read and push entries");
        }
    }
}

async fn serve_tls(
    acceptor: TlsAcceptor,
    stream: tokio::net::TcpStream,
    peer: SocketAddr,
    router: Router,
    timeout: Duration,
) {
    match tokio::time::timeout(timeout, acceptor.accept(stream)).await {
        Ok(Ok(tls_stream)) => serve_connection(tls_stream, peer, router, timeout).await,
        Ok(Err(e)) => debug!("TLS handshake with {} failed: {}", peer, e),
        Err(_) => debug!("TLS handshake with {} timed out", peer),
    }
}

/// Serve HTTP/1.1 on one connection until the peer closes it, it idles
/// out, or a request exceeds `timeout`.
async fn serve_connection<S>(stream: S, peer: SocketAddr, router: Router, timeout: Duration)
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let service = service_fn(move |request: hyper::Request<Incoming>| {
        let router = router.clone();
        async move {
            let response = tokio::time::timeout(timeout, router.oneshot(request))
                .await
                .map_err(|elapsed| {
                    warn!("Request from {} timed out, closing connection", peer);
                    elapsed
                })?;

            match response {
                Ok(response) => Ok::<_, Elapsed>(response),
                Err(never) => match never {},
            }
        }
    });

    let result = hyper::server::conn::http1::Builder::new()
        .timer(TokioTimer::new())
        .header_read_timeout(timeout)
        .keep_alive(true)
        .serve_connection(TokioIo::new(stream), service)
        .await;

    if let Err(e) = result {
        debug!("Connection from {} ended with error: {}", peer, e);
    }
}
