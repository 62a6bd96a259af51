use futures_util::future::BoxFuture;
use serde::de::DeserializeOwned;

use crate::error::{WidgetError, WidgetResult};
use crate::types::{
    Direction, MuteState, PlayState, Progress, StationSnapshot, Track, TrackChanged, TrackDetails,
};

/// The station API as the widget sees it.
pub trait Backend: Send + Sync {
    fn tracks(&self) -> BoxFuture<'_, WidgetResult<Vec<Track>>>;
    fn current_track(&self) -> BoxFuture<'_, WidgetResult<TrackDetails>>;
    fn toggle_play_pause(&self) -> BoxFuture<'_, WidgetResult<PlayState>>;
    fn toggle_mute(&self) -> BoxFuture<'_, WidgetResult<MuteState>>;
    fn change_track(&self, direction: Direction) -> BoxFuture<'_, WidgetResult<TrackChanged>>;
    fn progress(&self) -> BoxFuture<'_, WidgetResult<Progress>>;
    /// Where the shared station currently is.
    fn status(&self) -> BoxFuture<'_, WidgetResult<StationSnapshot>>;
}

/// Talks to a running station over HTTP.
#[derive(Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBackend {
    /// `base_url` includes the API prefix, e.g. `http://127.0.0.1:3000/api`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn decode<T: DeserializeOwned>(
        path: &str,
        response: reqwest::Response,
    ) -> WidgetResult<T> {
        let status = response.status();
        if !status.is_success() {
            return Err(WidgetError::Status {
                status: status.as_u16(),
                path: path.to_string(),
            });
        }

        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> WidgetResult<T> {
        tracing::trace!("GET {}", path);
        let response = self.client.get(self.url(path)).send().await?;
        Self::decode(path, response).await
    }

    async fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> WidgetResult<T> {
        tracing::trace!("POST {}", path);
        let response = self
            .client
            .post(self.url(path))
            .query(query)
            .send()
            .await?;
        Self::decode(path, response).await
    }
}

impl Backend for HttpBackend {
    fn tracks(&self) -> BoxFuture<'_, WidgetResult<Vec<Track>>> {
        Box::pin(self.get_json("tracks"))
    }

    fn current_track(&self) -> BoxFuture<'_, WidgetResult<TrackDetails>> {
        Box::pin(self.get_json("currentTrack"))
    }

    fn toggle_play_pause(&self) -> BoxFuture<'_, WidgetResult<PlayState>> {
        Box::pin(self.post_json("togglePlayPause", &[]))
    }

    fn toggle_mute(&self) -> BoxFuture<'_, WidgetResult<MuteState>> {
        Box::pin(self.post_json("toggleMute", &[]))
    }

    fn change_track(&self, direction: Direction) -> BoxFuture<'_, WidgetResult<TrackChanged>> {
        Box::pin(async move {
            self.post_json("changeTrack", &[("direction", direction.as_str())])
                .await
        })
    }

    fn progress(&self) -> BoxFuture<'_, WidgetResult<Progress>> {
        Box::pin(self.get_json("progress"))
    }

    fn status(&self) -> BoxFuture<'_, WidgetResult<StationSnapshot>> {
        Box::pin(self.get_json("status"))
    }
}
