use parking_lot::Mutex;
use std::sync::Arc;

use crate::clock::Clock;
use crate::error::{StationError, StationResult};
use crate::types::{Direction, StationSnapshot, Track};

/// Every track is assumed to run three minutes when deriving progress.
pub const ASSUMED_TRACK_SECS: f64 = 180.0;

/// Mutable part of the station. One instance per process, shared by every
/// client: concurrent sessions steer the same "radio".
#[derive(Debug)]
struct Playback {
    current_index: usize,
    is_playing: bool,
    is_muted: bool,
    start_time_ms: u64,
}

pub struct Station {
    tracks: Arc<Vec<Track>>,
    playback: Mutex<Playback>,
    clock: Arc<dyn Clock>,
}

impl Station {
    pub fn new(tracks: Vec<Track>, clock: Arc<dyn Clock>) -> Self {
        let start_time_ms = clock.now_ms();
        Self {
            tracks: Arc::new(tracks),
            playback: Mutex::new(Playback {
                current_index: 0,
                is_playing: false,
                is_muted: false,
                start_time_ms,
            }),
            clock,
        }
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    /// The track the station is on, with its index.
    pub fn current(&self) -> StationResult<(usize, Track)> {
        let index = self.playback.lock().current_index;
        self.tracks
            .get(index)
            .cloned()
            .map(|track| (index, track))
            .ok_or(StationError::NoTracks)
    }

    pub fn toggle_play_pause(&self) -> bool {
        let now = self.clock.now_ms();
        let mut playback = self.playback.lock();

        playback.is_playing = !playback.is_playing;
        if playback.is_playing {
            playback.start_time_ms = now;
        }

        tracing::debug!("Playback toggled: playing={}", playback.is_playing);
        playback.is_playing
    }

    pub fn toggle_mute(&self) -> bool {
        let mut playback = self.playback.lock();
        playback.is_muted = !playback.is_muted;

        tracing::debug!("Mute toggled: muted={}", playback.is_muted);
        playback.is_muted
    }

    /// Moves one track in `direction`, wrapping at both ends. Without a
    /// direction the index stays put. Either way the track clock restarts.
    pub fn change_track(&self, direction: Option<Direction>) -> usize {
        let now = self.clock.now_ms();
        let mut playback = self.playback.lock();

        if let Some(direction) = direction {
            playback.current_index = direction.step(playback.current_index, self.tracks.len());
        }
        playback.start_time_ms = now;

        tracing::debug!(
            "Track changed ({}): index={}",
            direction.map(|d| d.as_str()).unwrap_or("none"),
            playback.current_index
        );
        playback.current_index
    }

    /// Percentage of the assumed track length elapsed since the last
    /// play/change, capped at 100. Zero while paused.
    pub fn progress(&self) -> f64 {
        let playback = self.playback.lock();
        self.progress_of(&playback)
    }

    pub fn snapshot(&self) -> StationSnapshot {
        let playback = self.playback.lock();
        StationSnapshot {
            current_track_index: playback.current_index,
            is_playing: playback.is_playing,
            is_muted: playback.is_muted,
            progress: self.progress_of(&playback),
        }
    }

    fn progress_of(&self, playback: &Playback) -> f64 {
        if !playback.is_playing {
            return 0.0;
        }
        let elapsed_ms = self.clock.now_ms().saturating_sub(playback.start_time_ms);
        let elapsed_secs = elapsed_ms as f64 / 1000.0;
        (elapsed_secs / ASSUMED_TRACK_SECS * 100.0).min(100.0)
    }
}
