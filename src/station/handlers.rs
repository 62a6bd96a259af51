use axum::extract::{Path, Query, State};
use axum::http::{header, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{any, get, post};
use axum::{Json, Router};
use serde::Deserialize;
use std::collections::HashMap;

use super::function::{handle_event, FunctionEvent, FUNCTION_PREFIX};
use super::service::RadioService;
use crate::error::{StationError, StationResult};
use crate::types::{MuteState, PlayState, Progress, StationSnapshot, Track, TrackChanged, TrackDetails};

/// Returns the static playlist.
pub async fn get_tracks(State(service): State<RadioService>) -> Json<Vec<Track>> {
    Json(service.tracks())
}

/// Returns the current track enriched with catalog data, or a 500 when the
/// catalog lookup fails.
pub async fn current_track(State(service): State<RadioService>) -> StationResult<Json<TrackDetails>> {
    service.current_track().await.map(Json)
}

pub async fn toggle_play_pause(State(service): State<RadioService>) -> Json<PlayState> {
    Json(service.toggle_play_pause())
}

pub async fn toggle_mute(State(service): State<RadioService>) -> Json<MuteState> {
    Json(service.toggle_mute())
}

/// Query parameters accepted by `changeTrack`.
#[derive(Deserialize)]
pub struct ChangeTrackQuery {
    direction: Option<String>,
}

pub async fn change_track(
    State(service): State<RadioService>,
    Query(query): Query<ChangeTrackQuery>,
) -> Json<TrackChanged> {
    Json(service.change_track(query.direction.as_deref()))
}

pub async fn progress(State(service): State<RadioService>) -> Json<Progress> {
    Json(service.progress())
}

pub async fn status(State(service): State<RadioService>) -> Json<StationSnapshot> {
    Json(service.status())
}

pub async fn not_found() -> StationError {
    StationError::NotFound
}

/// Serves the serverless-function adapter over the same listener, so
/// clients written against the function path keep working.
pub async fn function_gateway(
    State(service): State<RadioService>,
    method: Method,
    Path(path): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let event = FunctionEvent {
        path: format!("{}{}", FUNCTION_PREFIX, path),
        http_method: method.to_string(),
        query_string_parameters: params,
    };

    let reply = handle_event(&service, event).await;
    let status =
        StatusCode::from_u16(reply.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    (status, [(header::CONTENT_TYPE, "application/json")], reply.body).into_response()
}

/// Endpoint routes, relative to the API prefix.
fn api_routes() -> Router<RadioService> {
    Router::new()
        .route("/tracks", get(get_tracks).fallback(not_found))
        .route("/currentTrack", get(current_track).fallback(not_found))
        .route("/togglePlayPause", post(toggle_play_pause).fallback(not_found))
        .route("/toggleMute", post(toggle_mute).fallback(not_found))
        .route("/changeTrack", post(change_track).fallback(not_found))
        .route("/progress", get(progress).fallback(not_found))
        .route("/status", get(status).fallback(not_found))
}

/// Builds the full router: endpoints under `prefix` (already normalized,
/// empty for the root), the function adapter, and a JSON 404 fallback.
pub fn router(service: RadioService, prefix: &str) -> Router {
    let api = if prefix.is_empty() {
        api_routes()
    } else {
        Router::new().nest(prefix, api_routes())
    };

    api.route(&format!("{}{{*path}}", FUNCTION_PREFIX), any(function_gateway))
        .fallback(not_found)
        .with_state(service)
}
