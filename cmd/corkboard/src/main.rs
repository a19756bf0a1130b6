//! # corkboard
//!
//! The server binary: loads configuration, initializes logging, wires the
//! file-system stores into the service graph and serves the HTTP API.

use std::sync::Arc;

use anyhow::Context;
use api_adapters::AppState;
use auth_adapters::SessionCodec;
use storage_adapters::{FsContentStore, FsUserStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // 1. Configuration
    let config = configs::AppConfig::load().context("loading configuration")?;

    // 2. Logging
    init_tracing(config.server.json_logs);

    // 3. Storage adapters
    let content = Arc::new(
        FsContentStore::new(&config.storage.data_dir)
            .await
            .context("opening content store")?,
    );
    let users = Arc::new(
        FsUserStore::new(&config.storage.users_dir)
            .await
            .context("opening user store")?,
    );

    // 4. Services and router
    let state = AppState::new(
        content,
        users,
        SessionCodec::new(config.auth.session_secret.clone()),
        config.auth.super_admins.clone(),
    );
    let app = api_adapters::router(state);

    // 5. Serve until ctrl-c
    let addr = (config.server.host.as_str(), config.server.port);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {}:{}", config.server.host, config.server.port))?;
    tracing::info!(
        addr = %listener.local_addr()?,
        data_dir = %config.storage.data_dir.display(),
        "corkboard listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("corkboard stopped");
    Ok(())
}

fn init_tracing(json: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug"));
    if json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(%err, "failed to listen for shutdown signal");
        return;
    }
    tracing::info!("shutdown signal received");
}
