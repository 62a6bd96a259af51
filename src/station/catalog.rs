use futures_util::future::BoxFuture;
use serde::Deserialize;

use crate::error::{StationError, StationResult};

const YOUTUBE_VIDEOS_URL: &str = "https://www.googleapis.com/youtube/v3/videos";

/// The part of a video's snippet the station uses.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VideoSnippet {
    pub title: String,
    pub thumbnail_url: String,
}

/// Third-party video metadata lookup.
pub trait VideoCatalog: Send + Sync {
    fn snippet<'a>(&'a self, video_id: &'a str) -> BoxFuture<'a, StationResult<VideoSnippet>>;
}

#[derive(Deserialize)]
struct VideoListResponse {
    #[serde(default)]
    items: Vec<VideoItem>,
}

#[derive(Deserialize)]
struct VideoItem {
    snippet: Snippet,
}

#[derive(Deserialize)]
struct Snippet {
    #[serde(default)]
    title: String,
    thumbnails: Thumbnails,
}

#[derive(Deserialize)]
struct Thumbnails {
    default: Thumbnail,
}

#[derive(Deserialize)]
struct Thumbnail {
    url: String,
}

/// YouTube Data API v3 `videos.list?part=snippet`.
pub struct YouTubeCatalog {
    client: reqwest::Client,
    api_key: Option<String>,
    endpoint: String,
}

impl YouTubeCatalog {
    pub fn new(api_key: Option<String>) -> Self {
        Self::with_endpoint(api_key, YOUTUBE_VIDEOS_URL)
    }

    /// Points the catalog at another host serving the same API shape.
    pub fn with_endpoint(api_key: Option<String>, endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            endpoint: endpoint.into(),
        }
    }

    async fn fetch_snippet(&self, video_id: &str) -> StationResult<VideoSnippet> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            StationError::CatalogUnavailable("YOUTUBE_API_KEY is not set".to_string())
        })?;

        tracing::debug!("Fetching snippet for video {}", video_id);

        let response: VideoListResponse = self
            .client
            .get(&self.endpoint)
            .query(&[("part", "snippet"), ("id", video_id), ("key", api_key)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let item = response
            .items
            .into_iter()
            .next()
            .ok_or_else(|| StationError::VideoNotFound(video_id.to_string()))?;

        tracing::trace!("Catalog answered for {}: {}", video_id, item.snippet.title);

        Ok(VideoSnippet {
            title: item.snippet.title,
            thumbnail_url: item.snippet.thumbnails.default.url,
        })
    }
}

impl VideoCatalog for YouTubeCatalog {
    fn snippet<'a>(&'a self, video_id: &'a str) -> BoxFuture<'a, StationResult<VideoSnippet>> {
        Box::pin(self.fetch_snippet(video_id))
    }
}
