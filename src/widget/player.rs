use crate::station::ASSUMED_TRACK_SECS;
use crate::types::TrackDetails;

/// The embedded video player and the track info panel next to it.
pub trait PlayerSink: Send {
    fn load_video(&mut self, youtube_id: &str);
    fn show_track(&mut self, details: &TrackDetails);
    fn set_playing(&mut self, playing: bool);
    fn set_muted(&mut self, muted: bool);
    /// Length of the loaded video, if the player knows it yet.
    fn duration_secs(&self) -> Option<f64>;
    fn seek_to(&mut self, secs: f64);
}

/// Headless player: reports what a real one would display. Without a real
/// video it assumes the station's nominal track length.
#[derive(Debug, Default)]
pub struct LogPlayer {
    pub now_playing: Option<TrackDetails>,
    pub playing: bool,
    pub muted: bool,
    pub position_secs: f64,
}

impl PlayerSink for LogPlayer {
    fn load_video(&mut self, youtube_id: &str) {
        tracing::info!("Loading video {}", youtube_id);
        self.position_secs = 0.0;
    }

    fn show_track(&mut self, details: &TrackDetails) {
        tracing::info!(
            "Now playing: {} by {} ({})",
            details.title,
            details.artist,
            details.thumbnail
        );
        self.now_playing = Some(details.clone());
    }

    fn set_playing(&mut self, playing: bool) {
        tracing::info!("{}", if playing { "Playing" } else { "Paused" });
        self.playing = playing;
    }

    fn set_muted(&mut self, muted: bool) {
        tracing::info!("{}", if muted { "Muted" } else { "Unmuted" });
        self.muted = muted;
    }

    fn duration_secs(&self) -> Option<f64> {
        self.now_playing.as_ref().map(|_| ASSUMED_TRACK_SECS)
    }

    fn seek_to(&mut self, secs: f64) {
        tracing::info!("Seeking to {:.1}s", secs);
        self.position_secs = secs;
    }
}
