use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::service::RadioService;
use crate::error::StationError;

/// Path prefix every function invocation carries.
pub const FUNCTION_PREFIX: &str = "/.netlify/functions/api/";

/// Serverless invocation, in the shape the function platform hands over.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionEvent {
    pub path: String,
    pub http_method: String,
    #[serde(default)]
    pub query_string_parameters: HashMap<String, String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionResponse {
    pub status_code: u16,
    pub body: String,
}

impl FunctionResponse {
    fn ok<T: Serialize>(value: &T) -> Self {
        match serde_json::to_string(value) {
            Ok(body) => Self {
                status_code: 200,
                body,
            },
            Err(e) => Self::error(StationError::from(e)),
        }
    }

    fn error(error: StationError) -> Self {
        if error.status().is_server_error() {
            tracing::error!("Function invocation failed: {}", error);
        }

        // ErrorBody only holds strings, serialization cannot fail
        let body = serde_json::to_string(&error.body())
            .unwrap_or_else(|_| r#"{"error":"Internal server error"}"#.to_string());

        Self {
            status_code: error.status().as_u16(),
            body,
        }
    }
}

/// Dispatches one serverless invocation against the shared service.
pub async fn handle_event(service: &RadioService, event: FunctionEvent) -> FunctionResponse {
    let path = event
        .path
        .strip_prefix(FUNCTION_PREFIX)
        .unwrap_or(&event.path);
    let method = event.http_method.to_ascii_uppercase();

    tracing::info!("Received {} request for {}", method, path);

    match (method.as_str(), path) {
        ("GET", "tracks") => FunctionResponse::ok(&service.tracks()),
        ("GET", "currentTrack") => match service.current_track().await {
            Ok(details) => FunctionResponse::ok(&details),
            Err(e) => FunctionResponse::error(e),
        },
        ("POST", "togglePlayPause") => FunctionResponse::ok(&service.toggle_play_pause()),
        ("POST", "toggleMute") => FunctionResponse::ok(&service.toggle_mute()),
        ("POST", "changeTrack") => {
            let direction = event.query_string_parameters.get("direction");
            FunctionResponse::ok(&service.change_track(direction.map(String::as_str)))
        }
        ("GET", "progress") => FunctionResponse::ok(&service.progress()),
        ("GET", "status") => FunctionResponse::ok(&service.status()),
        _ => FunctionResponse::error(StationError::NotFound),
    }
}
