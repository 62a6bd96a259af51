use futures_util::future::BoxFuture;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

use lofi_radio::clock::{Clock, ManualClock, MonotonicClock};
use lofi_radio::config::WidgetConfig;
use lofi_radio::error::{WidgetError, WidgetResult};
use lofi_radio::types::{
    Direction, MuteState, PlayState, Progress, StationSnapshot, Track, TrackChanged, TrackDetails,
};
use lofi_radio::widget::{
    Backend, Backoff, BackoffConfig, ChangeCooldown, FileStore, KeyValueStore, LoadOutcome, MemoryStore,
    PlayerSink, RateGate, TrackChange, TtlCache,
};
use lofi_radio::RadioWidget;

const HOUR_MS: u64 = 3_600_000;

fn playlist(ids: &[&str]) -> Vec<Track> {
    ids.iter()
        .map(|id| Track {
            title: format!("Track {}", id),
            artist: "Lofi".to_string(),
            youtube_id: id.to_string(),
        })
        .collect()
}

fn details_for(track: &Track) -> TrackDetails {
    TrackDetails {
        title: track.title.clone(),
        artist: track.artist.clone(),
        thumbnail: format!("https://i.ytimg.com/vi/{}/default.jpg", track.youtube_id),
        youtube_id: track.youtube_id.clone(),
    }
}

/// In-memory station that can be told to fail `currentTrack` or to apply
/// track changes late.
struct FakeBackend {
    tracks: Vec<Track>,
    index: Mutex<usize>,
    playing: Mutex<bool>,
    muted: Mutex<bool>,
    change_delay: Duration,
    failures_left: AtomicU32,
    current_calls: Mutex<Vec<Instant>>,
    changes: Mutex<Vec<Direction>>,
    play_toggles: AtomicU32,
    mute_toggles: AtomicU32,
}

impl FakeBackend {
    fn new(ids: &[&str]) -> Arc<Self> {
        Self::with_change_delay(ids, Duration::ZERO)
    }

    /// `changeTrack` answers only after `delay`.
    fn with_change_delay(ids: &[&str], delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            tracks: playlist(ids),
            index: Mutex::new(0),
            playing: Mutex::new(false),
            muted: Mutex::new(false),
            change_delay: delay,
            failures_left: AtomicU32::new(0),
            current_calls: Mutex::new(Vec::new()),
            changes: Mutex::new(Vec::new()),
            play_toggles: AtomicU32::new(0),
            mute_toggles: AtomicU32::new(0),
        })
    }

    fn fail_next(&self, count: u32) {
        self.failures_left.store(count, Ordering::SeqCst);
    }

    fn current_calls(&self) -> Vec<Instant> {
        self.current_calls.lock().unwrap().clone()
    }

    fn changes(&self) -> Vec<Direction> {
        self.changes.lock().unwrap().clone()
    }

    fn is_playing(&self) -> bool {
        *self.playing.lock().unwrap()
    }
}

impl Backend for FakeBackend {
    fn tracks(&self) -> BoxFuture<'_, WidgetResult<Vec<Track>>> {
        Box::pin(async move { Ok(self.tracks.clone()) })
    }

    fn current_track(&self) -> BoxFuture<'_, WidgetResult<TrackDetails>> {
        Box::pin(async move {
            self.current_calls.lock().unwrap().push(Instant::now());

            let failing = self
                .failures_left
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if failing {
                return Err(WidgetError::Status {
                    status: 500,
                    path: "currentTrack".to_string(),
                });
            }

            let index = *self.index.lock().unwrap();
            Ok(details_for(&self.tracks[index]))
        })
    }

    fn toggle_play_pause(&self) -> BoxFuture<'_, WidgetResult<PlayState>> {
        Box::pin(async move {
            self.play_toggles.fetch_add(1, Ordering::SeqCst);
            let mut playing = self.playing.lock().unwrap();
            *playing = !*playing;
            Ok(PlayState {
                is_playing: *playing,
            })
        })
    }

    fn toggle_mute(&self) -> BoxFuture<'_, WidgetResult<MuteState>> {
        Box::pin(async move {
            self.mute_toggles.fetch_add(1, Ordering::SeqCst);
            let mut muted = self.muted.lock().unwrap();
            *muted = !*muted;
            Ok(MuteState { is_muted: *muted })
        })
    }

    fn change_track(&self, direction: Direction) -> BoxFuture<'_, WidgetResult<TrackChanged>> {
        Box::pin(async move {
            self.changes.lock().unwrap().push(direction);
            if !self.change_delay.is_zero() {
                tokio::time::sleep(self.change_delay).await;
            }

            let mut index = self.index.lock().unwrap();
            *index = direction.step(*index, self.tracks.len());
            Ok(TrackChanged {
                success: true,
                current_track_index: *index,
            })
        })
    }

    fn progress(&self) -> BoxFuture<'_, WidgetResult<Progress>> {
        Box::pin(async move { Ok(Progress { progress: 42.0 }) })
    }

    fn status(&self) -> BoxFuture<'_, WidgetResult<StationSnapshot>> {
        Box::pin(async move {
            Ok(StationSnapshot {
                current_track_index: *self.index.lock().unwrap(),
                is_playing: *self.playing.lock().unwrap(),
                is_muted: *self.muted.lock().unwrap(),
                progress: 0.0,
            })
        })
    }
}

#[derive(Default)]
struct RecordingPlayer {
    loaded: Vec<String>,
    shown: Vec<TrackDetails>,
    playing: bool,
    muted: bool,
    duration: Option<f64>,
    seeks: Vec<f64>,
}

impl PlayerSink for RecordingPlayer {
    fn load_video(&mut self, youtube_id: &str) {
        self.loaded.push(youtube_id.to_string());
        self.duration = Some(200.0);
    }

    fn show_track(&mut self, details: &TrackDetails) {
        self.shown.push(details.clone());
    }

    fn set_playing(&mut self, playing: bool) {
        self.playing = playing;
    }

    fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    fn duration_secs(&self) -> Option<f64> {
        self.duration
    }

    fn seek_to(&mut self, secs: f64) {
        self.seeks.push(secs);
    }
}

/// Memory store that remembers every write.
#[derive(Default)]
struct RecordingStore {
    inner: MemoryStore,
    writes: Mutex<Vec<(String, String)>>,
}

impl RecordingStore {
    fn writes(&self) -> Vec<(String, String)> {
        self.writes.lock().unwrap().clone()
    }
}

impl KeyValueStore for RecordingStore {
    fn get(&self, key: &str) -> Option<String> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: String) -> WidgetResult<()> {
        self.writes
            .lock()
            .unwrap()
            .push((key.to_string(), value.clone()));
        self.inner.set(key, value)
    }
}

fn widget_with(
    backend: Arc<FakeBackend>,
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
) -> RadioWidget<RecordingPlayer> {
    RadioWidget::new(
        &WidgetConfig::default(),
        backend,
        store,
        RecordingPlayer::default(),
        clock,
    )
}

// Gate

#[tokio::test(start_paused = true)]
async fn test_gate_lets_ten_calls_through_without_delay() {
    let gate = RateGate::per_minute(10, Arc::new(MonotonicClock::new()));
    let started = Instant::now();

    for i in 0..10 {
        assert_eq!(gate.run(|| async move { i * 2 }).await, i * 2);
    }

    assert_eq!(started.elapsed(), Duration::ZERO);
    assert_eq!(gate.used(), 10);
}

#[tokio::test(start_paused = true)]
async fn test_gate_defers_eleventh_call_until_window_resets() {
    let gate = RateGate::per_minute(10, Arc::new(MonotonicClock::new()));
    let started = Instant::now();

    for _ in 0..10 {
        gate.run(|| async {}).await;
    }
    let answer = gate.run(|| async { "late" }).await;

    let waited = started.elapsed();
    assert_eq!(answer, "late");
    assert!(waited >= Duration::from_secs(60), "waited {:?}", waited);
    assert!(waited < Duration::from_secs(61), "waited {:?}", waited);
    assert_eq!(gate.used(), 1);
}

#[test]
fn test_gate_counts_slots_before_calls_finish() {
    let clock = Arc::new(ManualClock::new(0));
    let gate = RateGate::per_minute(10, clock.clone());

    for _ in 0..10 {
        assert!(gate.try_acquire());
    }
    assert!(!gate.try_acquire());

    clock.advance(Duration::from_millis(59_999));
    assert!(!gate.try_acquire());

    clock.advance(Duration::from_millis(1));
    assert!(gate.try_acquire());
    assert_eq!(gate.used(), 1);
}

#[test]
fn test_gate_retry_spacing_is_fixed() {
    let gate = RateGate::per_minute(10, Arc::new(ManualClock::new(0)));
    assert_eq!(gate.retry_spacing(), Duration::from_millis(6000));
}

// Cache

#[test]
fn test_cache_serves_entries_younger_than_ttl() {
    let clock = Arc::new(ManualClock::new(0));
    let store = Arc::new(MemoryStore::new());
    let cache: TtlCache<String> =
        TtlCache::new(store.clone(), clock.clone(), Duration::from_millis(HOUR_MS));

    assert_eq!(cache.get(3), None);
    cache.put(3, "rain".to_string());

    clock.set(HOUR_MS - 1);
    assert_eq!(cache.get(3), Some("rain".to_string()));

    clock.set(HOUR_MS);
    assert_eq!(cache.get(3), None);

    // Expired bytes stay until overwritten
    assert!(store.get("track_3").is_some());

    cache.put(3, "snow".to_string());
    assert_eq!(cache.get(3), Some("snow".to_string()));
}

#[test]
fn test_cache_ignores_corrupt_entries() {
    let store = Arc::new(MemoryStore::new());
    store.set("track_0", "not json".to_string()).unwrap();

    let cache: TtlCache<String> = TtlCache::new(
        store,
        Arc::new(ManualClock::new(0)),
        Duration::from_millis(HOUR_MS),
    );
    assert_eq!(cache.get(0), None);
}

#[test]
fn test_file_store_survives_reopen_and_is_scoped_by_origin() {
    let dir = tempfile::tempdir().unwrap();

    let store = FileStore::for_origin(dir.path(), "http://radio.local:3000").unwrap();
    store.set("track_1", "cached".to_string()).unwrap();
    drop(store);

    let reopened = FileStore::for_origin(dir.path(), "http://radio.local:3000").unwrap();
    assert_eq!(reopened.get("track_1"), Some("cached".to_string()));

    let other = FileStore::for_origin(dir.path(), "http://elsewhere:3000").unwrap();
    assert_eq!(other.get("track_1"), None);
}

// Cooldown and backoff

#[test]
fn test_cooldown_drops_changes_inside_window() {
    let clock = Arc::new(ManualClock::new(0));
    let cooldown = ChangeCooldown::new(Duration::from_millis(5000), clock.clone());

    assert!(cooldown.try_begin());

    clock.set(4_999);
    assert!(!cooldown.try_begin());

    // A dropped change does not push the window out
    clock.set(5_000);
    assert!(cooldown.try_begin());
    assert!(!cooldown.try_begin());
}

#[test]
fn test_backoff_doubles_then_gives_up() {
    let mut backoff = Backoff::new(BackoffConfig::default());

    assert_eq!(backoff.next_delay(), Some(Duration::from_secs(1)));
    assert_eq!(backoff.next_delay(), Some(Duration::from_secs(2)));
    assert_eq!(backoff.next_delay(), Some(Duration::from_secs(4)));
    assert_eq!(backoff.next_delay(), None);
    assert_eq!(backoff.next_delay(), None);
}

#[test]
fn test_backoff_jitter_stays_within_factor() {
    for _ in 0..50 {
        let mut backoff = Backoff::new(BackoffConfig {
            base_delay_ms: 1000,
            max_retries: 2,
            jitter_factor: 0.5,
        });

        let first = backoff.next_delay().unwrap();
        assert!(first >= Duration::from_millis(500) && first <= Duration::from_millis(1500));

        let second = backoff.next_delay().unwrap();
        assert!(second >= Duration::from_millis(1000) && second <= Duration::from_millis(3000));
    }
}

// Widget

#[tokio::test]
async fn test_widget_start_loads_first_track() {
    let backend = FakeBackend::new(&["a", "b", "c"]);
    let mut widget = widget_with(
        backend.clone(),
        Arc::new(MemoryStore::new()),
        Arc::new(ManualClock::new(0)),
    );

    assert_eq!(widget.start().await.unwrap(), LoadOutcome::Fetched(0));
    assert_eq!(widget.tracks().len(), 3);
    assert_eq!(widget.player().loaded, vec!["a"]);
    assert_eq!(widget.player().shown[0].thumbnail, "https://i.ytimg.com/vi/a/default.jpg");
    assert_eq!(backend.current_calls().len(), 1);
}

#[tokio::test]
async fn test_widget_start_rejects_empty_playlist() {
    let backend = FakeBackend::new(&[]);
    let mut widget = widget_with(
        backend,
        Arc::new(MemoryStore::new()),
        Arc::new(ManualClock::new(0)),
    );

    assert!(matches!(widget.start().await, Err(WidgetError::EmptyPlaylist)));
    assert_eq!(widget.next().await, TrackChange::NoTracks);
}

#[tokio::test]
async fn test_widget_next_twice_within_cooldown_changes_once() {
    let clock = Arc::new(ManualClock::new(0));
    let backend = FakeBackend::new(&["a", "b", "c"]);
    let mut widget = widget_with(backend.clone(), Arc::new(MemoryStore::new()), clock.clone());
    widget.start().await.unwrap();

    assert_eq!(widget.next().await, TrackChange::Changed(1));
    clock.advance(Duration::from_millis(4_000));
    assert_eq!(widget.next().await, TrackChange::Throttled);

    assert_eq!(widget.current_index(), 1);
    assert_eq!(backend.changes(), vec![Direction::Next]);
    assert_eq!(widget.player().loaded, vec!["a", "b"]);

    clock.advance(Duration::from_millis(1_000));
    assert_eq!(widget.next().await, TrackChange::Changed(2));
}

#[tokio::test]
async fn test_widget_changes_wrap_around() {
    let clock = Arc::new(ManualClock::new(0));
    let backend = FakeBackend::new(&["a", "b", "c"]);
    let mut widget = widget_with(backend.clone(), Arc::new(MemoryStore::new()), clock.clone());
    widget.start().await.unwrap();

    assert_eq!(widget.prev().await, TrackChange::Changed(2));
    assert_eq!(widget.player().loaded.last().unwrap(), "c");

    clock.advance(Duration::from_secs(5));
    assert_eq!(widget.next().await, TrackChange::Changed(0));
    assert_eq!(backend.changes(), vec![Direction::Prev, Direction::Next]);
}

#[tokio::test]
async fn test_widget_serves_fresh_tracks_from_cache() {
    let clock = Arc::new(ManualClock::new(0));
    let backend = FakeBackend::new(&["a", "b", "c"]);
    let mut widget = widget_with(backend.clone(), Arc::new(MemoryStore::new()), clock.clone());

    widget.start().await.unwrap();
    widget.next().await;
    assert_eq!(backend.current_calls().len(), 2);

    clock.advance(Duration::from_secs(5));
    assert_eq!(widget.prev().await, TrackChange::Changed(0));
    assert_eq!(backend.current_calls().len(), 2);
    assert_eq!(widget.player().loaded, vec!["a", "b", "a"]);

    // Track 1 was cached at t=0 and is now exactly one TTL old
    clock.set(HOUR_MS);
    assert_eq!(widget.next().await, TrackChange::Changed(1));
    assert_eq!(backend.current_calls().len(), 3);
}

#[tokio::test]
async fn test_widget_cache_persists_across_instances() {
    let dir = tempfile::tempdir().unwrap();
    let clock = Arc::new(ManualClock::new(0));
    let backend = FakeBackend::new(&["a", "b"]);

    let store = Arc::new(FileStore::for_origin(dir.path(), "http://radio.local").unwrap());
    let mut first = widget_with(backend.clone(), store, clock.clone());
    first.start().await.unwrap();
    drop(first);

    clock.advance(Duration::from_secs(60));
    let store = Arc::new(FileStore::for_origin(dir.path(), "http://radio.local").unwrap());
    let mut second = widget_with(backend.clone(), store, clock.clone());

    assert_eq!(second.start().await.unwrap(), LoadOutcome::Cached(0));
    assert_eq!(backend.current_calls().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_widget_retries_three_times_then_skips() {
    let backend = FakeBackend::new(&["a", "b", "c"]);
    backend.fail_next(4);
    let mut widget = widget_with(
        backend.clone(),
        Arc::new(MemoryStore::new()),
        Arc::new(MonotonicClock::new()),
    );

    assert_eq!(widget.start().await.unwrap(), LoadOutcome::Fetched(1));

    let calls = backend.current_calls();
    // Four failed attempts on track 0, then one successful load of track 1
    assert_eq!(calls.len(), 5);

    let gaps: Vec<Duration> = calls.windows(2).map(|w| w[1] - w[0]).collect();
    for (gap, expected) in gaps.iter().zip([1, 2, 4]) {
        let expected = Duration::from_secs(expected);
        assert!(
            *gap >= expected && *gap < expected + Duration::from_millis(50),
            "gap {:?}, expected {:?}",
            gap,
            expected
        );
    }
    assert!(gaps[3] < Duration::from_millis(50));

    assert_eq!(backend.changes(), vec![Direction::Next]);
    assert_eq!(widget.current_index(), 1);
    assert_eq!(widget.player().loaded, vec!["b"]);
}

#[tokio::test(start_paused = true)]
async fn test_widget_recovers_within_retry_budget() {
    let backend = FakeBackend::new(&["a", "b"]);
    backend.fail_next(2);
    let mut widget = widget_with(
        backend.clone(),
        Arc::new(MemoryStore::new()),
        Arc::new(MonotonicClock::new()),
    );

    assert_eq!(widget.start().await.unwrap(), LoadOutcome::Fetched(0));
    assert_eq!(backend.current_calls().len(), 3);
    assert!(backend.changes().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_widget_stops_after_every_track_failed() {
    let backend = FakeBackend::new(&["a", "b"]);
    backend.fail_next(u32::MAX);
    let mut widget = widget_with(
        backend.clone(),
        Arc::new(MemoryStore::new()),
        Arc::new(MonotonicClock::new()),
    );

    assert_eq!(widget.start().await.unwrap(), LoadOutcome::Exhausted);
    // Four attempts per track, one skip in between
    assert_eq!(backend.current_calls().len(), 8);
    assert_eq!(backend.changes(), vec![Direction::Next]);
    assert!(widget.player().loaded.is_empty());
}

#[tokio::test]
async fn test_widget_track_end_ignores_cooldown() {
    let backend = FakeBackend::new(&["a", "b", "c"]);
    let mut widget = widget_with(
        backend.clone(),
        Arc::new(MemoryStore::new()),
        Arc::new(ManualClock::new(0)),
    );
    widget.start().await.unwrap();

    assert_eq!(widget.next().await, TrackChange::Changed(1));
    assert_eq!(widget.on_track_ended().await, LoadOutcome::Fetched(2));
    // Track 0 is still cached from start
    assert_eq!(widget.on_player_error(150).await, LoadOutcome::Cached(0));
    assert_eq!(backend.changes().len(), 3);
    assert_eq!(backend.current_calls().len(), 3);
}

#[tokio::test]
async fn test_widget_toggles_notify_backend() {
    let backend = FakeBackend::new(&["a"]);
    let mut widget = widget_with(
        backend.clone(),
        Arc::new(MemoryStore::new()),
        Arc::new(ManualClock::new(0)),
    );

    assert!(widget.toggle_play_pause().await);
    assert!(widget.player().playing);
    assert!(widget.toggle_mute().await);
    assert!(widget.player().muted);
    assert!(!widget.toggle_mute().await);

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(backend.play_toggles.load(Ordering::SeqCst), 1);
    assert_eq!(backend.mute_toggles.load(Ordering::SeqCst), 2);
    assert!(backend.is_playing());
    assert_eq!(widget.progress().await.unwrap(), 42.0);
}

#[tokio::test]
async fn test_widget_joins_station_where_it_is() {
    let backend = FakeBackend::new(&["a", "b", "c"]);
    *backend.index.lock().unwrap() = 2;
    *backend.playing.lock().unwrap() = true;
    *backend.muted.lock().unwrap() = true;

    let mut widget = widget_with(
        backend.clone(),
        Arc::new(MemoryStore::new()),
        Arc::new(ManualClock::new(0)),
    );

    assert_eq!(widget.start().await.unwrap(), LoadOutcome::Fetched(2));
    assert_eq!(widget.current_index(), 2);
    assert_eq!(widget.player().loaded, vec!["c"]);
    assert_eq!(backend.current_calls().len(), 1);
    assert!(backend.changes().is_empty());

    assert!(widget.is_playing());
    assert!(widget.is_muted());
    assert!(widget.player().playing);
    assert!(widget.player().muted);

    // Already playing, so the first toggle pauses
    assert!(!widget.toggle_play_pause().await);
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!backend.is_playing());
}

#[tokio::test(start_paused = true)]
async fn test_widget_retries_reply_for_previous_track() {
    let backend = FakeBackend::with_change_delay(&["a", "b", "c"], Duration::from_millis(1500));
    let store = Arc::new(RecordingStore::default());
    let mut widget = widget_with(backend.clone(), store.clone(), Arc::new(MonotonicClock::new()));

    assert_eq!(widget.start().await.unwrap(), LoadOutcome::Fetched(0));

    let started = Instant::now();
    assert_eq!(widget.next().await, TrackChange::Changed(1));

    // Answers for "a" at 0 s and 1 s, then "b" at 3 s once the change landed
    let calls = backend.current_calls();
    assert_eq!(calls.len(), 4);
    assert!(calls[3] - started >= Duration::from_secs(3));
    assert_eq!(widget.player().loaded, vec!["a", "b"]);

    let writes = store.writes();
    assert_eq!(writes.len(), 2);
    assert_eq!(writes[1].0, "track_1");
    assert!(writes[1].1.contains(r#""youtubeId":"b""#));
    assert!(!writes.iter().any(|(key, value)| key == "track_1" && value.contains(r#""youtubeId":"a""#)));
}

#[tokio::test]
async fn test_widget_follows_player_state_and_seeks() {
    let backend = FakeBackend::new(&["a"]);
    let mut widget = widget_with(
        backend.clone(),
        Arc::new(MemoryStore::new()),
        Arc::new(ManualClock::new(0)),
    );

    // Nothing loaded yet, no duration to seek in
    assert_eq!(widget.seek(0.5), None);

    widget.start().await.unwrap();

    widget.on_player_state(true);
    assert!(widget.is_playing());
    widget.on_player_state(false);
    assert!(!widget.is_playing());

    assert_eq!(widget.seek(0.25), Some(50.0));
    assert_eq!(widget.seek(1.5), Some(200.0));
    assert_eq!(widget.seek(-1.0), Some(0.0));
    assert_eq!(widget.player().seeks, vec![50.0, 200.0, 0.0]);

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(backend.play_toggles.load(Ordering::SeqCst), 0);
}
