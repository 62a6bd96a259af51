use std::sync::Arc;

use super::catalog::VideoCatalog;
use super::state::Station;
use crate::error::StationResult;
use crate::types::{
    Direction, MuteState, PlayState, Progress, StationSnapshot, Track, TrackChanged, TrackDetails,
};

/// Every station operation, implemented once. The router and the
/// serverless-function adapter are both thin shells around this.
#[derive(Clone)]
pub struct RadioService {
    station: Arc<Station>,
    catalog: Arc<dyn VideoCatalog>,
}

impl RadioService {
    pub fn new(station: Arc<Station>, catalog: Arc<dyn VideoCatalog>) -> Self {
        Self { station, catalog }
    }

    pub fn station(&self) -> &Station {
        &self.station
    }

    pub fn tracks(&self) -> Vec<Track> {
        self.station.tracks().to_vec()
    }

    /// Current playlist entry plus its catalog thumbnail. One catalog
    /// request per call.
    pub async fn current_track(&self) -> StationResult<TrackDetails> {
        let (index, track) = self.station.current()?;
        tracing::debug!("Fetching data for track {}: {}", index, track.title);

        let snippet = self.catalog.snippet(&track.youtube_id).await?;

        Ok(TrackDetails {
            title: track.title,
            artist: track.artist,
            thumbnail: snippet.thumbnail_url,
            youtube_id: track.youtube_id,
        })
    }

    pub fn toggle_play_pause(&self) -> PlayState {
        PlayState {
            is_playing: self.station.toggle_play_pause(),
        }
    }

    pub fn toggle_mute(&self) -> MuteState {
        MuteState {
            is_muted: self.station.toggle_mute(),
        }
    }

    /// Accepts the raw `direction` query value; anything other than
    /// `next`/`prev` leaves the index alone.
    pub fn change_track(&self, direction: Option<&str>) -> TrackChanged {
        let parsed = direction.and_then(|d| match d.parse::<Direction>() {
            Ok(direction) => Some(direction),
            Err(e) => {
                tracing::warn!("{}", e);
                None
            }
        });

        TrackChanged {
            success: true,
            current_track_index: self.station.change_track(parsed),
        }
    }

    pub fn progress(&self) -> Progress {
        Progress {
            progress: self.station.progress(),
        }
    }

    pub fn status(&self) -> StationSnapshot {
        self.station.snapshot()
    }
}
