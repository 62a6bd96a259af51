use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use crate::types::ErrorBody;

#[derive(Error, Debug)]
pub enum StationError {
    #[error("Playlist is empty")]
    NoTracks,

    #[error("No video found for id {0}")]
    VideoNotFound(String),

    #[error("Video catalog request failed: {0}")]
    Catalog(#[from] reqwest::Error),

    #[error("Video catalog is not configured: {0}")]
    CatalogUnavailable(String),

    #[error("Failed to read track list: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON serialization failed: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Not Found")]
    NotFound,
}

impl StationError {
    pub fn status(&self) -> StatusCode {
        match self {
            StationError::NotFound => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// JSON body both transports send for this error.
    pub fn body(&self) -> ErrorBody {
        match self {
            StationError::NotFound => ErrorBody {
                error: "Not Found".to_string(),
                details: None,
            },
            StationError::NoTracks
            | StationError::VideoNotFound(_)
            | StationError::Catalog(_)
            | StationError::CatalogUnavailable(_) => ErrorBody {
                error: "Failed to fetch video".to_string(),
                details: Some(self.to_string()),
            },
            _ => ErrorBody {
                error: "Internal server error".to_string(),
                details: Some(self.to_string()),
            },
        }
    }
}

// Tells Axum how to convert our errors into HTTP responses
impl IntoResponse for StationError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        } else {
            tracing::debug!("Request failed: {}", self);
        }

        (status, Json(self.body())).into_response()
    }
}

pub type StationResult<T> = Result<T, StationError>;

#[derive(Error, Debug)]
pub enum WidgetError {
    #[error("Backend request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Backend answered {status} for {path}")]
    Status { status: u16, path: String },

    #[error("Backend is on video {got}, expected {expected}")]
    TrackMismatch { expected: String, got: String },

    #[error("Playlist is empty")]
    EmptyPlaylist,

    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("JSON serialization failed: {0}")]
    SerializationError(#[from] serde_json::Error),
}

pub type WidgetResult<T> = Result<T, WidgetError>;
