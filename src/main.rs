//! Storefront guard service.
//!
//! # Architecture Overview
//!
//! ```text
//!                        ┌──────────────────────────────────────────────┐
//!                        │               STOREFRONT GUARD               │
//!                        │                                              │
//!   Client Request       │  ┌──────────┐   ┌───────────┐   ┌─────────┐  │
//!   ─────────────────────┼─▶│   http   │──▶│ client_ip │──▶│ handler │  │
//!                        │  │  server  │   │   (key)   │   │         │  │
//!                        │  └──────────┘   └───────────┘   └────┬────┘  │
//!                        │                                      │       │
//!                        │                      ┌───────────────┴─────┐ │
//!                        │                      ▼                     ▼ │
//!                        │              ┌──────────────┐     ┌────────┐ │
//!                        │              │ rate limiter │     │ orders │ │
//!                        │              │ auth / api   │     │ store  │ │
//!                        │              └──────▲───────┘     └────────┘ │
//!                        │                     │ idle sweep             │
//!                        │              ┌──────┴───────┐                │
//!                        │              │ cleanup task │                │
//!                        │              └──────────────┘                │
//!                        └──────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::net::TcpListener;

use storefront_guard::config::loader::{load_or_default, CONFIG_PATH_ENV};
use storefront_guard::lifecycle::{signals, Shutdown};
use storefront_guard::observability::{logging, metrics};
use storefront_guard::HttpServer;

#[derive(Parser)]
#[command(name = "storefront-guard")]
#[command(about = "Rate-limited login and order intake for the storefront", long_about = None)]
struct Args {
    /// Path to a TOML config file.
    #[arg(short, long, env = CONFIG_PATH_ENV)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = load_or_default(args.config.as_deref())?;

    logging::init(&config.observability.log_filter);
    tracing::info!("storefront-guard v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.listener.bind_address,
        auth_max_attempts = config.auth_limiter.max_attempts,
        auth_block_minutes = config.auth_limiter.block_duration_minutes,
        api_max_attempts = config.api_limiter.max_attempts,
        api_block_minutes = config.api_limiter.block_duration_minutes,
        "Configuration loaded"
    );

    if config.admin.password.is_empty() {
        tracing::warn!("No admin password configured; every login attempt will fail");
    }
    if config.admin.api_key == "CHANGE_ME_IN_PRODUCTION" {
        tracing::warn!("Admin API key is the placeholder value; set STOREFRONT_GUARD_ADMIN_API_KEY");
    }
    tracing::info!("Rate limits are enforced per process; replicas keep separate counts");

    if config.observability.metrics_enabled {
        let addr: SocketAddr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr);
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    tokio::spawn(signals::shutdown_on_signal(shutdown.clone()));

    let server = HttpServer::new(config);
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
