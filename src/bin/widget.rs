use std::sync::Arc;
use std::time::Duration;

use lofi_radio::clock::MonotonicClock;
use lofi_radio::config::WidgetConfig;
use lofi_radio::logging::init_logging;
use lofi_radio::widget::{FileStore, HttpBackend, LoadOutcome, LogPlayer};
use lofi_radio::RadioWidget;

/// Headless widget: follows the station, advancing when a track runs out.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    dotenv::dotenv().ok();
    init_logging();
    let config = WidgetConfig::from_env();

    let store = FileStore::for_origin(&config.cache_dir, &config.origin)?;
    tracing::info!("Track cache at {}", store.path().display());

    let mut widget = RadioWidget::new(
        &config,
        Arc::new(HttpBackend::new(config.base_url.clone())),
        Arc::new(store),
        LogPlayer::default(),
        Arc::new(MonotonicClock::new()),
    );

    if widget.start().await? == LoadOutcome::Exhausted {
        return Err("no track in the playlist could be loaded".into());
    }
    if !widget.is_playing() {
        widget.toggle_play_pause().await;
    }

    // Progress polls share the rate gate with everything else
    let mut ticker = tokio::time::interval(Duration::from_secs(15));
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match widget.progress().await {
                    Ok(progress) if progress >= 100.0 => {
                        if widget.on_track_ended().await == LoadOutcome::Exhausted {
                            tracing::error!("Stopping, no track could be loaded");
                            break;
                        }
                    }
                    Ok(progress) => tracing::debug!("Progress {:.1}%", progress),
                    Err(e) => tracing::warn!("Progress poll failed: {}", e),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Stopping widget");
                break;
            }
        }
    }

    Ok(())
}
