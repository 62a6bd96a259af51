mod catalog;
mod function;
mod handlers;
mod service;
mod state;

pub use catalog::{VideoCatalog, VideoSnippet, YouTubeCatalog};
pub use function::{handle_event, FunctionEvent, FunctionResponse, FUNCTION_PREFIX};
pub use handlers::router;
pub use service::RadioService;
pub use state::{Station, ASSUMED_TRACK_SECS};

use axum::Router;
use std::path::Path;
use std::sync::Arc;

use crate::clock::{Clock, MonotonicClock};
use crate::config::ServerConfig;
use crate::error::StationResult;
use crate::middlewares::RequestLog;
use crate::types::Track;

/// Reads the playlist: a JSON array of `{title, artist, youtubeId}`.
pub async fn load_tracks(path: impl AsRef<Path>) -> StationResult<Vec<Track>> {
    let path = path.as_ref();
    let raw = tokio::fs::read_to_string(path).await?;
    let tracks: Vec<Track> = serde_json::from_str(&raw)?;

    tracing::info!("Loaded {} track(s) from {}", tracks.len(), path.display());
    if tracks.is_empty() {
        tracing::warn!("Playlist is empty, currentTrack will fail until tracks are added");
    }

    Ok(tracks)
}

/// Wires the station state and catalog into the shared service.
pub fn init_service(
    tracks: Vec<Track>,
    catalog: Arc<dyn VideoCatalog>,
    clock: Arc<dyn Clock>,
) -> RadioService {
    let station = Arc::new(Station::new(tracks, clock));
    RadioService::new(station, catalog)
}

/// Router with the request-logging layer applied.
pub fn create_router(service: RadioService, prefix: &str) -> Router {
    router(service, prefix).layer(tower::layer::layer_fn(RequestLog::new))
}

/// Loads the playlist, binds the configured address and serves until Ctrl+C.
pub async fn serve(config: ServerConfig) -> StationResult<()> {
    let tracks = load_tracks(&config.tracks_path).await?;

    if config.youtube_api_key.is_none() {
        tracing::warn!("YOUTUBE_API_KEY is not set, currentTrack will answer 500");
    }

    let catalog: Arc<dyn VideoCatalog> =
        Arc::new(YouTubeCatalog::new(config.youtube_api_key.clone()));
    let service = init_service(tracks, catalog, Arc::new(MonotonicClock::new()));
    let app = create_router(service, &config.api_prefix);

    let listener = tokio::net::TcpListener::bind(config.bind_addr()).await?;
    let addr = listener.local_addr()?;

    tracing::info!(
        "Lofi radio listening on http://{}{} (function adapter at {})",
        addr,
        config.api_prefix,
        FUNCTION_PREFIX
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to install Ctrl+C handler: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Graceful shutdown signal received");
}
