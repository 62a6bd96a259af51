use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::clock::Clock;

#[derive(Debug, Clone)]
struct Window {
    count: u32,
    started_at_ms: u64,
}

/// Fixed-window limiter in front of every backend call.
///
/// A denied call sleeps for `window / limit` and tries again, regardless of
/// how much of the window is actually left. Calls are never dropped.
pub struct RateGate {
    window: Mutex<Window>,
    limit: u32,
    window_len: Duration,
    clock: Arc<dyn Clock>,
}

impl RateGate {
    pub fn new(limit: u32, window_len: Duration, clock: Arc<dyn Clock>) -> Self {
        let started_at_ms = clock.now_ms();
        Self {
            window: Mutex::new(Window {
                count: 0,
                started_at_ms,
            }),
            limit: limit.max(1),
            window_len,
            clock,
        }
    }

    /// `limit` calls per 60 s window.
    pub fn per_minute(limit: u32, clock: Arc<dyn Clock>) -> Self {
        Self::new(limit, Duration::from_secs(60), clock)
    }

    /// Wait between two checks of a saturated window.
    pub fn retry_spacing(&self) -> Duration {
        self.window_len / self.limit
    }

    /// Takes a slot in the current window if one is free. The slot is
    /// counted right away, so calls still in flight hold their slot.
    pub fn try_acquire(&self) -> bool {
        let now = self.clock.now_ms();
        let mut window = self.window.lock();

        if now.saturating_sub(window.started_at_ms) >= self.window_len.as_millis() as u64 {
            window.count = 0;
            window.started_at_ms = now;
        }

        if window.count < self.limit {
            window.count += 1;
            tracing::trace!("Rate gate slot {}/{}", window.count, self.limit);
            true
        } else {
            false
        }
    }

    /// Slots used in the current window.
    pub fn used(&self) -> u32 {
        self.window.lock().count
    }

    /// Waits for a slot.
    pub async fn acquire(&self) {
        while !self.try_acquire() {
            let spacing = self.retry_spacing();
            tracing::debug!(
                "Rate limit of {} per {:?} reached, retrying in {:?}",
                self.limit,
                self.window_len,
                spacing
            );
            tokio::time::sleep(spacing).await;
        }
    }

    /// Runs `call` once a slot is free and returns whatever it returns.
    pub async fn run<F, Fut, T>(&self, call: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        self.acquire().await;
        call().await
    }
}
