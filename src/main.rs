use anyhow::Context;
use movie_reviews_api::api::{self, AppState};
use movie_reviews_api::catalog::HttpMovieCatalog;
use movie_reviews_api::config::{AppConfig, StoreBackend};
use movie_reviews_api::storage::{InMemoryReviewStore, MongoReviewStore, ReviewStore};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    info!("🚀 Starting Movie Reviews API Server");

    // Load configuration
    let config = AppConfig::load()?;
    info!("📋 Configuration loaded");
    info!("   - Store: {:?}", config.database.backend);
    info!("   - Catalog: {}", config.catalog.base_url);
    info!("   - Catalog timeout: {}ms", config.catalog.timeout_ms);
    info!("   - Server: {}", config.server.bind_addr());

    // Initialize review storage
    info!("💾 Initializing review storage...");
    let store: Arc<dyn ReviewStore> = match config.database.backend {
        StoreBackend::Mongo => Arc::new(
            MongoReviewStore::connect(
                &config.database.uri,
                &config.database.name,
                &config.database.collection,
            )
            .await?,
        ),
        StoreBackend::Memory => {
            warn!("⚠️  Using in-memory review store, reviews are lost on shutdown");
            Arc::new(InMemoryReviewStore::new())
        }
    };
    info!("✅ Review storage ready");

    // Initialize movie catalog client
    let catalog = Arc::new(HttpMovieCatalog::new(
        &config.catalog.base_url,
        config.catalog.timeout(),
    )?);

    // Create application state
    let state = AppState { store, catalog };

    let app = api::router(state, config.server.enable_cors);

    // Start server
    let addr = config.server.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("🌐 Server listening on http://{}", addr);
    info!("");
    info!("📡 Available endpoints:");
    info!("   GET  /api/health          - Health check");
    info!("   POST /api/reviews         - Create review");
    info!("   GET  /api/reviews         - List reviews for a movie");
    info!("   POST /api/reviews/_counts - Review counts per movie");
    info!("");
    info!("✨ Server is ready to accept requests!");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("👋 Server shutting down gracefully");

    Ok(())
}

/// Graceful shutdown handler
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("🛑 Shutdown signal received");
}
