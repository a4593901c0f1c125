//! dispatch-core demo server.
//!
//! Loads configuration, registers the demo routes and serves them until
//! SIGINT/SIGTERM.
//!
//! ```text
//! DISPATCH_CONFIG=config.toml DISPATCH_API_TOKEN=secret cargo run
//! ```

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;

use dispatch_core::app;
use dispatch_core::config::{load_config, AppConfig};
use dispatch_core::http::HttpServer;
use dispatch_core::lifecycle::{spawn_signal_handler, Shutdown};
use dispatch_core::observability::{init_logging, metrics};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = match std::env::var("DISPATCH_CONFIG") {
        Ok(path) => load_config(Path::new(&path))?,
        Err(_) => AppConfig::default(),
    };

    init_logging(&config.observability);
    tracing::info!("dispatch-core v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        environment = ?config.http.environment,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => {
                metrics::init_metrics(addr);
            }
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let api_token = app::api_token(&config, std::env::var(app::API_TOKEN_ENV).ok())?;
    let server = Arc::new(app::build_server(&config, &api_token)?);

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    spawn_signal_handler(shutdown.clone());

    let grace = Duration::from_secs(config.timeouts.shutdown_grace_secs);
    let http = HttpServer::new(server, &config);
    match shutdown.drain(grace, http.run(listener, &shutdown)).await {
        Some(result) => result?,
        None => tracing::warn!("Forcing exit with requests still in flight"),
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
