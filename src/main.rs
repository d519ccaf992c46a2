//! ClipSync - personal clipboard sync server
//!
//! Entry point for the server binary.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

use clipsync::config::{Config, Overrides};
use clipsync::server::ClipServer;

/// Command-line arguments for clipsync
#[derive(Parser, Debug)]
#[command(name = "clipsync")]
#[command(version, about = "Personal clipboard sync server", long_about = None)]
pub struct Args {
    /// Configuration file path
    #[arg(short, long, env = "CLIPSYNC_CONFIG")]
    pub config: Option<String>,

    /// Bind address
    #[arg(long, env = "CLIPSYNC_HOST")]
    pub host: Option<String>,

    /// Listen port
    #[arg(short, long, env = "CLIPSYNC_PORT")]
    pub port: Option<u16>,

    /// Access token (empty disables auth)
    #[arg(long, env = "CLIPSYNC_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Serve over HTTPS (1/0, true/false, yes/no)
    #[arg(long, env = "CLIPSYNC_HTTPS", value_parser = parse_flag)]
    pub https: Option<bool>,

    /// TLS certificate path
    #[arg(long, env = "CLIPSYNC_CERT")]
    pub cert: Option<PathBuf>,

    /// TLS private key path
    #[arg(long, env = "CLIPSYNC_KEY")]
    pub key: Option<PathBuf>,

    /// Entry snapshot path
    #[arg(long, env = "CLIPSYNC_DATA")]
    pub data: Option<PathBuf>,

    /// Verbose logging (can be specified multiple times)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Log format (json|pretty|compact)
    #[arg(long, default_value = "pretty")]
    pub log_format: String,

    /// Write logs to file (in addition to stdout)
    #[arg(long)]
    pub log_file: Option<String>,
}

impl Args {
    fn overrides(&self) -> Overrides {
        Overrides {
            host: self.host.clone(),
            port: self.port,
            token: self.token.clone(),
            https: self.https,
            cert_path: self.cert.clone(),
            key_path: self.key.clone(),
            data_path: self.data.clone(),
        }
    }
}

fn parse_flag(value: &str) -> Result<bool, String> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(format!("expected 1/0, true/false or yes/no, got '{}'", other)),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let (config, config_found) = match load_config(&args) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("{}", clipsync::utils::format_user_error(&e));
            return Err(e);
        }
    };

    // Held until exit so buffered log lines are flushed
    let _log_guard = init_logging(&args, &config)?;

    info!("clipsync v{}", env!("CARGO_PKG_VERSION"));
    if !config_found {
        if let Some(path) = &args.config {
            warn!("Config file {} not found, using defaults", path);
        }
    }
    tracing::debug!("Config: {:?}", config);

    let server = match ClipServer::new(config).await {
        Ok(s) => s,
        Err(e) => {
            eprintln!("{}", clipsync::utils::format_user_error(&e));
            return Err(e);
        }
    };

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    server.run_until(shutdown).await?;

    info!("ClipSync stopped");
    Ok(())
}

/// Resolve the effective config; the flag is false when a named file was
/// missing and defaults were used instead.
fn load_config(args: &Args) -> Result<(Config, bool)> {
    let (config, found) = match &args.config {
        Some(path) => Config::load_or_default(path)?,
        None => (Config::default_config(), true),
    };

    let config = config.with_overrides(args.overrides());
    config.validate()?;
    Ok((config, found))
}

fn init_logging(
    args: &Args,
    config: &Config,
) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    use std::fs::File;

    let log_level = match args.verbose {
        0 => config.logging.level.as_str(),
        1 => "debug",
        _ => "trace",
    };

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!("clipsync={level},warn", level = log_level))
    });

    let stdout_layer = match args.log_format.as_str() {
        "json" => tracing_subscriber::fmt::layer().json().boxed(),
        "compact" => tracing_subscriber::fmt::layer().compact().boxed(),
        _ => tracing_subscriber::fmt::layer().pretty().boxed(),
    };

    let mut guard = None;
    let file_layer = if let Some(log_file_path) = &args.log_file {
        let file = File::create(log_file_path)?;
        Some(
            tracing_subscriber::fmt::layer()
                .with_writer(file)
                .with_ansi(false)
                .boxed(),
        )
    } else if let Some(log_dir) = &config.logging.log_dir {
        let appender = tracing_appender::rolling::daily(log_dir, "clipsync.log");
        let (writer, worker_guard) = tracing_appender::non_blocking(appender);
        guard = Some(worker_guard);
        Some(
            tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .boxed(),
        )
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    if let Some(path) = &args.log_file {
        info!("Logging to file: {}", path);
    }

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flag() {
        assert_eq!(parse_flag("1"), Ok(true));
        assert_eq!(parse_flag("Yes"), Ok(true));
        assert_eq!(parse_flag("0"), Ok(false));
        assert_eq!(parse_flag(""), Ok(false));
        assert!(parse_flag("maybe").is_err());
    }

    #[test]
    fn test_missing_config_file_falls_back() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nope.toml");
        let args = Args::parse_from([
            "clipsync",
            "--config",
            path.to_str().unwrap(),
            "--port",
            "9001",
        ]);

        let (config, found) = load_config(&args).unwrap();
        assert!(!found);
        assert_eq!(config.server.port, 9001);
    }

    #[test]
    fn test_invalid_config_file_is_fatal() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[security]\ncert_generator = \"mystery\"\n").unwrap();
        let args = Args::parse_from(["clipsync", "--config", path.to_str().unwrap()]);

        assert!(load_config(&args).is_err());
    }

    #[test]
    fn test_args_map_to_overrides() {
        let args = Args::parse_from([
            "clipsync", "--port", "9000", "--https", "no", "--token", "t0k",
        ]);
        let overrides = args.overrides();
        assert_eq!(overrides.port, Some(9000));
        assert_eq!(overrides.https, Some(false));
        assert_eq!(overrides.token.as_deref(), Some("t0k"));
        assert!(overrides.host.is_none());
    }
}
