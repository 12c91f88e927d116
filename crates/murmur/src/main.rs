//! # murmur
//!
//! Chat relay binary: resolves settings, installs logging and metrics, and
//! runs the `WebSocket` server until SIGINT or SIGTERM.

#![deny(unsafe_code)]

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use murmur_core::LogFormat;
use murmur_server::{MurmurServer, ServerConfig};
use murmur_settings::MurmurSettings;
use tracing::{info, warn};

/// Broadcast chat relay over `WebSocket`.
#[derive(Parser, Debug)]
#[command(name = "murmur", version, about = "Broadcast chat relay over WebSocket")]
struct Cli {
    /// Settings file (defaults to `~/.murmur/settings.json`).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Host to bind.
    #[arg(long)]
    host: Option<String>,

    /// Port to bind (0 for auto-assign).
    #[arg(long)]
    port: Option<u16>,

    /// Messages retained and replayed to new clients.
    #[arg(long)]
    history_capacity: Option<usize>,

    /// Log level or `EnvFilter` directive (overridden by `RUST_LOG`).
    #[arg(long)]
    log_level: Option<String>,

    /// Log output format: compact or json.
    #[arg(long)]
    log_format: Option<LogFormat>,
}

impl Cli {
    /// Apply flags over file and environment settings.
    fn apply(&self, settings: &mut MurmurSettings) {
        if let Some(host) = &self.host {
            settings.server.host.clone_from(host);
        }
        if let Some(port) = self.port {
            settings.server.port = port;
        }
        if let Some(capacity) = self.history_capacity {
            settings.history.capacity = capacity;
        }
        if let Some(level) = &self.log_level {
            settings.logging.level.clone_from(level);
        }
        if let Some(format) = self.log_format {
            settings.logging.format = format;
        }
    }
}

/// Defaults, then the settings file, then `MURMUR_*`, then flags.
fn resolve_settings(cli: &Cli) -> Result<MurmurSettings> {
    let path = cli
        .config
        .clone()
        .unwrap_or_else(murmur_settings::settings_path);
    let mut settings = murmur_settings::load_settings_from_path(&path)
        .with_context(|| format!("failed to load settings from {}", path.display()))?;
    cli.apply(&mut settings);
    Ok(settings)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut settings = resolve_settings(&cli)?;
    let adjustments = settings.validate();
    murmur_core::logging::init_subscriber(&settings.logging.level, settings.logging.format);
    for adjustment in &adjustments {
        warn!("{adjustment}");
    }

    let mut server = MurmurServer::new(ServerConfig::from(&settings));
    match murmur_server::metrics::install_recorder() {
        Ok(handle) => server = server.with_metrics(handle),
        Err(e) => warn!(error = %e, "metrics recorder unavailable, /metrics disabled"),
    }

    let (addr, handle) = server.listen().await.context("failed to start server")?;
    println!("murmur listening on ws://{addr}");

    wait_for_signal().await?;

    info!("shutting down");
    if !server.shutdown_gracefully(handle).await {
        warn!("server did not stop within the shutdown timeout");
    }
    info!("shutdown complete");
    Ok(())
}

#[cfg(unix)]
async fn wait_for_signal() -> Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut terminate =
        signal(SignalKind::terminate()).context("failed to install SIGTERM handler")?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result.context("failed to listen for ctrl-c")?,
        _ = terminate.recv() => info!("received SIGTERM"),
    }
    Ok(())
}

#[cfg(not(unix))]
async fn wait_for_signal() -> Result<()> {
    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl-c")
}
