use crate::config::Config;
use crate::ingest::Ingestor;
use crate::storage::AssetStore;
use crate::streaming;
use anyhow::{Context, Result};
use axum::{
    extract::DefaultBodyLimit,
    http::{header, Method, StatusCode},
    response::IntoResponse,
    routing::get,
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use vidstream_av::HlsTranscoder;
use vidstream_db::pool::DbPool;

mod error;
pub mod routes_videos;

pub use error::{AppError, INTERNAL_MESSAGE};

/// Shared application context
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<Config>,
    /// Metadata store
    pub db: DbPool,
    /// Upload pipeline; also owns the asset store and transcoder
    pub ingestor: Arc<Ingestor>,
    /// Cancelled on shutdown so running encoders are stopped
    pub shutdown: CancellationToken,
}

impl AppContext {
    /// Build the context from configuration and an initialized pool.
    pub fn new(config: Config, db: DbPool) -> Self {
        let assets = AssetStore::new(&config.storage.video_dir);
        let transcoder = HlsTranscoder::new(&config.storage.hls_dir, config.transcode.hls_settings());
        let ingestor = Ingestor::new(db.clone(), assets, Arc::new(transcoder));

        Self {
            config: Arc::new(config),
            db,
            ingestor: Arc::new(ingestor),
            shutdown: CancellationToken::new(),
        }
    }
}

/// Create the Axum router with all routes
pub fn create_router(ctx: AppContext) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, header::RANGE])
        .expose_headers([header::CONTENT_RANGE, header::ACCEPT_RANGES, header::CONTENT_LENGTH]);

    let upload_limit = ctx.config.storage.max_upload_bytes();

    Router::new()
        .route("/health", get(health_check))
        .merge(routes_videos::video_routes())
        .merge(streaming::direct_router())
        .merge(streaming::hls_router())
        .layer(DefaultBodyLimit::max(upload_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}

async fn health_check() -> impl IntoResponse {
    StatusCode::OK
}

/// Create the asset and HLS directories if they are missing.
pub async fn prepare_storage(config: &Config) -> Result<()> {
    for dir in [&config.storage.video_dir, &config.storage.hls_dir] {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("Failed to create directory {:?}", dir))?;
    }
    Ok(())
}

/// Start the HTTP server
pub async fn start_server(config: Config, db: DbPool) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;

    prepare_storage(&config).await?;

    let ctx = AppContext::new(config, db);
    let shutdown = ctx.shutdown.clone();
    let app = create_router(ctx);

    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            shutdown.cancel();
        })
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

pub async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => {}
            Err(e) => {
                tracing::error!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
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

    tracing::info!("Shutdown signal received");
}
