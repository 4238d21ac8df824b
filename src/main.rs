//! Camstream Server
//!
//! Main entry point: loads the camera list, serves the API and HLS output,
//! and stops every transcoder on shutdown.

use camstream_server::{config_store::CameraDirectory, state::AppConfig, web_api, AppState};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "camstream_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Camstream Server v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = AppConfig::default();
    tracing::info!(
        cameras_file = %config.cameras_file.display(),
        hls_dir = %config.hls_dir.display(),
        ffmpeg = %config.ffmpeg_path.display(),
        segment_seconds = config.hls_segment_seconds,
        list_size = config.hls_list_size,
        "Configuration loaded"
    );

    let cameras = CameraDirectory::load(&config.cameras_file).await?;
    tracing::info!(cameras = cameras.len(), "Camera directory loaded");

    tokio::fs::create_dir_all(&config.hls_dir).await?;

    let addr = format!("{}:{}", config.host, config.port);
    let state = AppState::new(config, cameras)?;
    let streams = state.streams.clone();

    let app = web_api::create_router(state)
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http());

    // Start server
    tracing::info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let stopped = streams.shutdown_all().await;
    tracing::info!(sessions = stopped, "Shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
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
