//! Cricket Live Scoring Server - Binary Entry Point

use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cricket_live::api::auth::TokenVerifier;
use cricket_live::api::websocket::ChannelHub;
use cricket_live::api::{create_router, AppState};
use cricket_live::config::{ServerConfig, StorageBackend};
use cricket_live::event_store::{FileRepository, FileRepositoryConfig, MatchRepository, MemoryRepository};
use cricket_live::scoring::{AssignedScorerPolicy, BroadcastDispatcher, ScoringService};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env()?;

    let repo: Arc<dyn MatchRepository> = match config.storage {
        StorageBackend::File => Arc::new(FileRepository::open(FileRepositoryConfig::new(&config.data_dir))?),
        StorageBackend::Memory => {
            warn!("Using in-memory storage, matches are lost on restart");
            Arc::new(MemoryRepository::new())
        }
    };

    let auth = match config.jwt_secret.as_deref() {
        Some(secret) => Some(Arc::new(TokenVerifier::new(secret)?)),
        None => {
            warn!("CRICKET_JWT_SECRET is not set, serving read-only");
            None
        }
    };

    let hub = Arc::new(ChannelHub::new(config.broadcast_capacity));
    let dispatcher = BroadcastDispatcher::new(hub.clone(), config.publish_timeout);
    let service = Arc::new(ScoringService::new(
        repo,
        config.commit_strategy,
        Arc::new(AssignedScorerPolicy),
        dispatcher,
    ));
    service.recover()?;

    let app = create_router(Arc::new(AppState { service, hub, auth }));

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    info!(addr = %config.addr, version = cricket_live::VERSION, "Cricket live server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
