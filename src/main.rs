use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

mod api;
mod balancer;
mod config;
mod daemon;
mod executor;
mod inventory;
mod platform;
mod state;

#[cfg(test)]
mod tests;

use config::AppConfig;
use daemon::{Balancer, RunMode};
use platform::{OvirtClient, Platform};

/// Keeps oVirt storage domains below an occupancy threshold by moving disks between them.
#[derive(Debug, Parser)]
#[command(name = "storage-balancer", version, about)]
struct Cli {
    /// Run a single balancing pass, then exit.
    #[arg(long, conflicts_with_all = ["daemon", "show_occupation"])]
    one_run: bool,

    /// Balance continuously (default).
    #[arg(long, conflicts_with = "show_occupation")]
    daemon: bool,

    /// Only show current storage domain occupation, then exit.
    #[arg(long)]
    show_occupation: bool,

    /// Path of the configuration file.
    #[arg(long)]
    config: Option<String>,

    /// Log the balancing decisions in detail.
    #[arg(long)]
    debug: bool,
}

impl Cli {
    const fn mode(&self) -> RunMode {
        if self.one_run {
            RunMode::OneRun
        } else if self.show_occupation {
            RunMode::ShowOccupation
        } else {
            RunMode::Daemon
        }
    }
}

fn init_tracing(debug: bool) {
    let default_filter = if debug { "storage_balancer=debug" } else { "storage_balancer=info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    if std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json")) {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref())?;

    init_tracing(config.debug || cli.debug);
    info!("Storage Balancer v{} starting up", env!("CARGO_PKG_VERSION"));
    for notice in &config.notices {
        warn!("{}", notice);
    }
    info!(
        "Configuration loaded: uri={}, threshold={:?}, datacenter={:?}, policy={}",
        config.uri, config.threshold, config.datacenter, config.power_policy
    );

    let client = OvirtClient::new(&config).context("Cannot set up the engine connection")?;
    client
        .test_connection()
        .await
        .context("Cannot connect to the engine. Check URI, USERNAME, PASSWORD and CA_PATH")?;

    let config = Arc::new(config);
    let platform: Arc<dyn Platform> = Arc::new(client);
    let balancer = Arc::new(Balancer::new(platform, Arc::clone(&config))?);

    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            shutdown_signal().await;
            shutdown.cancel();
        }
    });

    let mode = cli.mode();
    let status_server = (mode == RunMode::Daemon && config.status_port != 0).then(|| {
        tokio::spawn(api::serve(Arc::clone(&balancer), config.status_port, shutdown.clone()))
    });

    let result = balancer.run(mode, &shutdown).await;

    shutdown.cancel();
    if let Some(handle) = status_server {
        handle.await.ok();
    }
    drop(balancer);

    info!("Engine connection released, Storage Balancer shut down");
    result
}

/// Wait for SIGTERM or SIGINT for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { warn!("Received Ctrl+C, shutting down..."); },
        () = terminate => { warn!("Received SIGTERM, shutting down..."); },
    }
}
