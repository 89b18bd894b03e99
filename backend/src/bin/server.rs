//! DramaBox Gateway HTTP Server Binary
//!
//! Loads configuration, builds the upstream client and serves the REST API.
//!
//! # Usage
//!
//! ```bash
//! # Built-in sample catalog (default)
//! cargo run --bin dramabox-server
//!
//! # Relay to a remote catalog
//! UPSTREAM_TYPE=http UPSTREAM_BASE_URL=http://catalog.internal/api \
//!   cargo run --bin dramabox-server
//! ```
//!
//! # Environment Variables
//!
//! - `HOST`: Server host (default: 0.0.0.0)
//! - `PORT`: Server port (default: 3000)
//! - `APP_ENV`: Environment name reported by `/api/stats` (default: development)
//! - `GATEWAY_CONFIG`: Path to `gateway.toml`
//! - `UPSTREAM_TYPE`, `UPSTREAM_BASE_URL`: Override the `[upstream]` section
//! - `RUST_LOG`: Log filter (default: info)

use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use dramabox_gateway::config::{GatewayConfig, ServerConfig};
use dramabox_gateway::http::{create_router, AppState};
use dramabox_gateway::upstream::UpstreamFactory;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(true)
        .with_thread_ids(true)
        .init();

    info!("Starting DramaBox Gateway");

    let server = ServerConfig::from_env()?;
    let config = GatewayConfig::load()?;

    let upstream = UpstreamFactory::create(&config.upstream)?;
    info!(
        upstream = %config.upstream.kind,
        deadline_ms = config.batch.deadline_ms,
        max_batch_size = config.batch.max_batch_size,
        "Upstream initialized"
    );

    let addr = server.bind_address();
    let state = AppState::from_config(upstream, &config, server);
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
