//! Mailbox share-link gate.
//!
//! ```text
//!     Client ──▶ share router ──▶ AccessGuard ──▶ sanitizer ──▶ Client
//!                                    │    │
//!                      RateLimiter ◀─┘    └─▶ ShareRecordStore
//!                                    │
//!                                    └──▶ AccessLogger ──▶ sinks
//!
//!     Owner ──▶ admin router (Bearer key) ──▶ ShareRecordStore
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use mailshare_gate::config::{load_config, watcher::ConfigWatcher, GateConfig};
use mailshare_gate::lifecycle::{wait_for_signal, Shutdown};
use mailshare_gate::observability::{logging::init_logging, metrics::init_metrics};
use mailshare_gate::HttpServer;

#[derive(Parser)]
#[command(name = "mailshare-gate")]
#[command(about = "Anonymous mailbox share-link gate", long_about = None)]
struct Args {
    /// TOML configuration file. Defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => GateConfig::default(),
    };

    init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "mailshare-gate starting");

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    // Keep the watcher alive for the life of the process.
    let (_watcher, config_updates) = match &args.config {
        Some(path) => {
            let (watcher, updates) = ConfigWatcher::new(path);
            (Some(watcher.run()?), updates)
        }
        None => (None, mpsc::unbounded_channel().1),
    };

    let listener = TcpListener::bind(config.listener.bind_address.as_str()).await?;
    tracing::info!(
        address = %listener.local_addr()?,
        request_timeout_secs = config.timeouts.request_secs,
        "Listening for connections"
    );

    let shutdown = Shutdown::new();
    let server = HttpServer::build(config, &shutdown).await?;
    let serve = tokio::spawn(server.run(listener, config_updates, shutdown.subscribe()));

    wait_for_signal().await;
    shutdown.trigger();
    serve.await??;

    tracing::info!("Shutdown complete");
    Ok(())
}
