use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

use crate::clock::Clock;

/// Drops track changes that come in faster than `cooldown` after the last
/// accepted one. Dropped changes are not queued.
pub struct ChangeCooldown {
    last_change_ms: Mutex<Option<u64>>,
    cooldown: Duration,
    clock: Arc<dyn Clock>,
}

impl ChangeCooldown {
    pub fn new(cooldown: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            last_change_ms: Mutex::new(None),
            cooldown,
            clock,
        }
    }

    /// Records a change and returns `true`, or returns `false` while the
    /// previous change is still cooling down.
    pub fn try_begin(&self) -> bool {
        let now = self.clock.now_ms();
        let mut last = self.last_change_ms.lock();

        if let Some(previous) = *last {
            let gap = now.saturating_sub(previous);
            if gap < self.cooldown.as_millis() as u64 {
                tracing::info!(
                    "Track change ignored, {}ms since the last one (cooldown {:?})",
                    gap,
                    self.cooldown
                );
                return false;
            }
        }

        *last = Some(now);
        true
    }
}
