//! Migration proxy binary.
//!
//! ```text
//!                        ┌──────────────────────────────────────────────┐
//!     Client Request     │  http server ─▶ routing ─▶ target client ────┼──▶ Target
//!     ───────────────────┼─▶                 │                          │
//!                        │                   ├─▶ strategy               │
//!                        │                   └─▶ donor pool ───────────┼──▶ Donors (read-only)
//!     Client Response    │                         │                    │
//!     ◀──────────────────┼── response ◀────────────┘  write-back ───────┼──▶ Target
//!                        └──────────────────────────────────────────────┘
//! ```

use clap::Parser;
use tokio::net::TcpListener;

use tricky_proxy::cli::Cli;
use tricky_proxy::config::{read_config, ProxyConfig};
use tricky_proxy::lifecycle::StartupError;
use tricky_proxy::observability::{init_logging, init_metrics};
use tricky_proxy::{HttpServer, Shutdown};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => read_config(path)?,
        None => ProxyConfig::default(),
    };
    cli.apply(&mut config);

    init_logging(&config.observability.log_level);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "tricky-proxy starting");

    let server = HttpServer::new(&config)?;

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let address = config.listener.bind_address.clone();
    let listener = TcpListener::bind(&address)
        .await
        .map_err(|source| StartupError::Bind { address, source })?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
