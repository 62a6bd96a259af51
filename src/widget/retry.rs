use rand::Rng;
use std::future::Future;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct BackoffConfig {
    pub base_delay_ms: u64,
    pub max_retries: u32,
    /// Fraction of each delay added or removed at random. Zero disables it.
    pub jitter_factor: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: 1000,
            max_retries: 3,
            jitter_factor: 0.0,
        }
    }
}

/// One chain of retries for a single request: `base * 2^n` before retry
/// `n`, `max_retries` of them.
pub struct Backoff {
    config: BackoffConfig,
    retries: u32,
}

impl Backoff {
    pub fn new(config: BackoffConfig) -> Self {
        Self { config, retries: 0 }
    }

    /// Wait before the next retry, `None` when the chain is used up.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.retries >= self.config.max_retries {
            return None;
        }

        let delay_ms = self.config.base_delay_ms as f64 * 2_f64.powi(self.retries as i32);
        let spread = delay_ms * self.config.jitter_factor;
        let delay_ms = if spread > 0.0 {
            (delay_ms + rand::rng().random_range(-spread..=spread)).max(0.0)
        } else {
            delay_ms
        };

        self.retries += 1;
        Some(Duration::from_millis(delay_ms as u64))
    }

    /// Runs `attempt` until it succeeds or the chain is used up, sleeping
    /// before each retry. The last error is returned as is.
    pub async fn retry<F, Fut, T, E>(mut self, mut attempt: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        loop {
            let err = match attempt().await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            match self.next_delay() {
                Some(delay) => {
                    tracing::warn!("Request failed ({}), retry {} in {:?}", err, self.retries, delay);
                    tokio::time::sleep(delay).await;
                }
                None => {
                    tracing::warn!("Request failed ({}) after {} retries", err, self.retries);
                    return Err(err);
                }
            }
        }
    }
}
