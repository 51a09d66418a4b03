use anyhow::Context;
use tracing_subscriber::EnvFilter;

use material_api::config::AppConfig;
use material_api::handlers::AppState;
use material_api::server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, MATERIAL_TABLE, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AppConfig::from_env()?;
    tracing::info!(
        "Starting Material API in {:?} mode for table '{}'",
        config.environment,
        config.material.table
    );

    let state = AppState::from_config(&config)
        .await
        .context("failed to open storage")?;

    let bind_addr = format!("0.0.0.0:{}", config.api.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("Material API listening on http://{}", bind_addr);

    server::serve(listener, state, &config.api, shutdown_signal()).await?;
    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}
