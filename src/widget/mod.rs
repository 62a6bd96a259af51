mod backend;
mod cache;
mod cooldown;
mod gate;
mod player;
mod retry;
mod store;

pub use backend::{Backend, HttpBackend};
pub use cache::TtlCache;
pub use cooldown::ChangeCooldown;
pub use gate::RateGate;
pub use player::{LogPlayer, PlayerSink};
pub use retry::{Backoff, BackoffConfig};
pub use store::{FileStore, KeyValueStore, MemoryStore};

use futures_util::future::BoxFuture;
use std::fmt::Debug;
use std::sync::Arc;

use crate::clock::Clock;
use crate::config::WidgetConfig;
use crate::error::{WidgetError, WidgetResult};
use crate::types::{Direction, Track, TrackDetails};

/// How a load request ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Served from the cache, no network call.
    Cached(usize),
    /// Fetched from the backend (possibly after retries).
    Fetched(usize),
    /// Every track in the playlist failed in a row.
    Exhausted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackChange {
    /// Moved; carries the index that ended up loaded.
    Changed(usize),
    /// Dropped by the cooldown.
    Throttled,
    /// Nothing to change to.
    NoTracks,
}

/// Client side of the radio: keeps the local play state, drives the
/// player and routes every backend call through the rate gate.
pub struct RadioWidget<P: PlayerSink> {
    backend: Arc<dyn Backend>,
    player: P,
    gate: Arc<RateGate>,
    cache: TtlCache<TrackDetails>,
    cooldown: ChangeCooldown,
    backoff: BackoffConfig,
    tracks: Vec<Track>,
    current_index: usize,
    is_playing: bool,
    is_muted: bool,
}

impl<P: PlayerSink> RadioWidget<P> {
    pub fn new(
        config: &WidgetConfig,
        backend: Arc<dyn Backend>,
        store: Arc<dyn KeyValueStore>,
        player: P,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            backend,
            player,
            gate: Arc::new(RateGate::new(
                config.requests_per_window,
                config.rate_window,
                clock.clone(),
            )),
            cache: TtlCache::new(store, clock.clone(), config.cache_ttl),
            cooldown: ChangeCooldown::new(config.change_cooldown, clock),
            backoff: BackoffConfig {
                base_delay_ms: config.retry_base_delay.as_millis() as u64,
                max_retries: config.max_retries,
                jitter_factor: config.retry_jitter_factor,
            },
            tracks: Vec::new(),
            current_index: 0,
            is_playing: false,
            is_muted: false,
        }
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    pub fn is_muted(&self) -> bool {
        self.is_muted
    }

    pub fn player(&self) -> &P {
        &self.player
    }

    pub fn gate(&self) -> &RateGate {
        &self.gate
    }

    /// Fetches the playlist, joins the station where it currently is and
    /// loads that track.
    pub async fn start(&mut self) -> WidgetResult<LoadOutcome> {
        let backend: &dyn Backend = &*self.backend;
        let tracks = self.gate.run(|| backend.tracks()).await?;

        tracing::info!("Tracks loaded: {}", tracks.len());
        if tracks.is_empty() {
            return Err(WidgetError::EmptyPlaylist);
        }
        self.tracks = tracks;

        match self.gate.run(|| backend.status()).await {
            Ok(station) => {
                tracing::debug!("Joining station at {:?}", station);
                self.current_index = station.current_track_index;
                self.is_playing = station.is_playing;
                self.is_muted = station.is_muted;
            }
            Err(e) => tracing::warn!("Station status unavailable, starting at track 0: {}", e),
        }
        self.current_index %= self.tracks.len();
        self.player.set_playing(self.is_playing);
        self.player.set_muted(self.is_muted);

        Ok(self.load_track(self.current_index).await)
    }

    pub async fn next(&mut self) -> TrackChange {
        self.change_track(Direction::Next).await
    }

    pub async fn prev(&mut self) -> TrackChange {
        self.change_track(Direction::Prev).await
    }

    /// User-initiated change, subject to the cooldown.
    pub async fn change_track(&mut self, direction: Direction) -> TrackChange {
        if self.tracks.is_empty() {
            tracing::warn!("Track change requested before the playlist loaded");
            return TrackChange::NoTracks;
        }

        if !self.cooldown.try_begin() {
            return TrackChange::Throttled;
        }

        tracing::info!("{} track", direction);
        match self.step(direction).await {
            LoadOutcome::Cached(index) | LoadOutcome::Fetched(index) => TrackChange::Changed(index),
            LoadOutcome::Exhausted => TrackChange::Changed(self.current_index),
        }
    }

    /// The player reached the end of the video.
    pub async fn on_track_ended(&mut self) -> LoadOutcome {
        tracing::info!("Track ended, playing next");
        self.step(Direction::Next).await
    }

    /// The player could not play the video; skip it.
    pub async fn on_player_error(&mut self, code: i32) -> LoadOutcome {
        tracing::error!("Player error {}, skipping track {}", code, self.current_index);
        self.step(Direction::Next).await
    }

    async fn step(&mut self, direction: Direction) -> LoadOutcome {
        if self.tracks.is_empty() {
            return LoadOutcome::Exhausted;
        }

        self.current_index = direction.step(self.current_index, self.tracks.len());
        self.notify_change(direction).await;
        self.load_track(self.current_index).await
    }

    /// Loads `index` cache first. A track that still fails after all
    /// retries is skipped in favour of the next one; after a full pass of
    /// failures the widget stops trying.
    pub async fn load_track(&mut self, index: usize) -> LoadOutcome {
        if self.tracks.is_empty() {
            return LoadOutcome::Exhausted;
        }

        self.current_index = index % self.tracks.len();
        let mut failures = 0;

        loop {
            let index = self.current_index;
            tracing::debug!("Loading track at index {}", index);

            if let Some(details) = self.cache.get(index) {
                tracing::debug!("Using cached data for track {}", index);
                self.apply(&details);
                return LoadOutcome::Cached(index);
            }

            match self.fetch_with_retry(index).await {
                Ok(details) => {
                    self.cache.put(index, details.clone());
                    self.apply(&details);
                    return LoadOutcome::Fetched(index);
                }
                Err(e) => {
                    failures += 1;
                    if failures >= self.tracks.len() {
                        tracing::error!(
                            "Every track failed to load, last error: {}",
                            e
                        );
                        return LoadOutcome::Exhausted;
                    }

                    tracing::warn!("Giving up on track {}: {}. Skipping to next", index, e);
                    self.current_index = Direction::Next.step(index, self.tracks.len());
                    self.notify_change(Direction::Next).await;
                }
            }
        }
    }

    /// One `currentTrack` request per attempt, each through the gate, with
    /// exponential backoff between attempts.
    async fn fetch_with_retry(&self, index: usize) -> WidgetResult<TrackDetails> {
        let gate: &RateGate = &self.gate;
        let backend: &dyn Backend = &*self.backend;
        let expected = self.tracks.get(index).map(|t| t.youtube_id.as_str());

        Backoff::new(self.backoff.clone())
            .retry(move || async move {
                gate.run(|| backend.current_track())
                    .await
                    .and_then(|details| check_track(expected, details))
            })
            .await
    }

    fn apply(&mut self, details: &TrackDetails) {
        self.player.load_video(&details.youtube_id);
        self.player.show_track(details);
    }

    pub async fn toggle_play_pause(&mut self) -> bool {
        self.is_playing = !self.is_playing;
        self.player.set_playing(self.is_playing);
        self.spawn_notify("togglePlayPause", |backend| backend.toggle_play_pause());
        self.is_playing
    }

    pub async fn toggle_mute(&mut self) -> bool {
        self.is_muted = !self.is_muted;
        self.player.set_muted(self.is_muted);
        self.spawn_notify("toggleMute", |backend| backend.toggle_mute());
        self.is_muted
    }

    /// The player changed state on its own (its own controls, autoplay).
    /// Only the local flag follows; the station is not told.
    pub fn on_player_state(&mut self, playing: bool) {
        if self.is_playing != playing {
            tracing::debug!("Player reports playing={}", playing);
        }
        self.is_playing = playing;
    }

    /// Seeks the player to `fraction` (0.0 to 1.0) of the loaded video.
    /// Returns the target position, or `None` while no duration is known.
    pub fn seek(&mut self, fraction: f64) -> Option<f64> {
        let duration = self.player.duration_secs()?;
        let target = fraction.clamp(0.0, 1.0) * duration;
        self.player.seek_to(target);
        Some(target)
    }

    /// Station progress in percent.
    pub async fn progress(&self) -> WidgetResult<f64> {
        let backend: &dyn Backend = &*self.backend;
        let progress = self.gate.run(|| backend.progress()).await?;
        Ok(progress.progress)
    }

    /// Tells the backend about a track change without waiting for it, then
    /// yields once so the notification gets a head start on the next load.
    async fn notify_change(&self, direction: Direction) {
        self.spawn_notify("changeTrack", move |backend| backend.change_track(direction));
        tokio::task::yield_now().await;
    }

    fn spawn_notify<T, F>(&self, what: &'static str, call: F)
    where
        F: for<'a> FnOnce(&'a dyn Backend) -> BoxFuture<'a, WidgetResult<T>> + Send + 'static,
        T: Debug + Send + 'static,
    {
        let gate = Arc::clone(&self.gate);
        let backend = Arc::clone(&self.backend);

        tokio::spawn(async move {
            match gate.run(|| call(&*backend)).await {
                Ok(reply) => tracing::debug!("{} acknowledged: {:?}", what, reply),
                Err(e) => tracing::warn!("{} failed: {}", what, e),
            }
        });
    }
}

/// The backend answers for its own current track; a reply for another
/// track (a change notification still in flight) counts as a failure.
fn check_track(expected: Option<&str>, details: TrackDetails) -> WidgetResult<TrackDetails> {
    match expected {
        Some(expected) if expected != details.youtube_id => Err(WidgetError::TrackMismatch {
            expected: expected.to_string(),
            got: details.youtube_id,
        }),
        _ => Ok(details),
    }
}
