//! Event Sync Gateway
//!
//! An HTTP service that accepts event-synchronization requests, forwards
//! them to an unreliable downstream dependency with bounded
//! exponential-backoff retries, and reports outcome and health via
//! standard observability endpoints.
//!
//! # Architecture Overview
//!
//! ```text
//!                    ┌────────────────────────────────────────────────┐
//!                    │                 SYNC GATEWAY                   │
//!                    │                                                │
//!  POST /api/event/  │  ┌─────────┐   ┌────────────┐   ┌──────────┐  │
//!  sync ─────────────┼─▶│  http   │──▶│ resilience │──▶│ upstream │──┼──▶ Downstream
//!                    │  │ server  │   │  invoker   │   │  client  │  │    dependency
//!  GET /health ──────┼─▶│ +req-id │   │ (backoff)  │   │ (timeout)│  │
//!                    │  └─────────┘   └────────────┘   └──────────┘  │
//!                    │                                                │
//!                    │  ┌──────────────────────────────────────────┐  │
//!                    │  │          Cross-Cutting Concerns          │  │
//!                    │  │  ┌────────┐ ┌────────┐ ┌──────────────┐  │  │
//!                    │  │  │ config │ │ health │ │observability │  │  │
//!                    │  │  └────────┘ └────────┘ └──────────────┘  │  │
//!                    │  │  ┌────────────────────────────────────┐  │  │
//!                    │  │  │     lifecycle (signals/shutdown)   │  │  │
//!                    │  │  └────────────────────────────────────┘  │  │
//!                    │  └──────────────────────────────────────────┘  │
//!                    └────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use sync_gateway::config::{self, GatewayConfig};
use sync_gateway::http::HttpServer;
use sync_gateway::lifecycle::{signals, Shutdown};
use sync_gateway::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "sync-gateway")]
#[command(about = "Event sync gateway with retry backoff and health reporting", long_about = None)]
struct Args {
    /// Path to the TOML configuration file (defaults used when absent).
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Fail fast: a broken config is a startup error, not a degraded run.
    let config = match &args.config {
        Some(path) => config::load_config(path)?,
        None => GatewayConfig::default(),
    };

    logging::init_logging(&config.observability);

    tracing::info!("sync-gateway v0.1.0 starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        upstream = %config.upstream.endpoint,
        max_attempts = config.retries.max_attempts,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let local_addr = listener.local_addr()?;
    tracing::info!(address = %local_addr, "Listening for connections");

    let shutdown = Arc::new(Shutdown::new());
    tokio::spawn(signals::watch(shutdown.clone()));

    let server = HttpServer::new(config, shutdown.clone())?;
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
