//! OpenSASE Catalog - product catalog and cart service

use std::sync::Arc;

use anyhow::Result;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use opensase_catalog::auth::TokenVerifier;
use opensase_catalog::config::{CatalogConfig, StoreBackend};
use opensase_catalog::store::{MemoryStore, PgStore};
use opensase_catalog::{create_router, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "opensase_catalog=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = CatalogConfig::from_env()?;
    let tokens = TokenVerifier::new(config.auth_token_secret.clone());

    let state = match &config.store {
        StoreBackend::Postgres(db) => {
            let store = PgStore::connect(&db.url, db.max_connections).await?;
            store.migrate().await?;
            tracing::info!(max_connections = db.max_connections, "Connected to PostgreSQL");
            AppState::new(Arc::new(store), tokens, config.max_page_size)
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store; data is lost on restart");
            AppState::new(Arc::new(MemoryStore::new()), tokens, config.max_page_size)
        }
    };

    let app = create_router(state);
    let addr = config.socket_addr();
    tracing::info!("OpenSASE Catalog listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!(error = %err, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
