//! Minimum-interval request pacing

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};
use tracing::debug;

/// Enforces a minimum interval between the starts of consecutive requests.
///
/// The lock is held across the wait, so concurrent callers queue up and are
/// released one interval apart.
pub struct RateLimiter {
    min_interval: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_request: Mutex::new(None),
        }
    }

    /// Wait for a free slot and claim it. Returns how long the caller waited.
    pub async fn acquire(&self) -> Duration {
        let mut last_request = self.last_request.lock().await;
        let mut waited = Duration::ZERO;

        if let Some(previous) = *last_request {
            let elapsed = previous.elapsed();
            if elapsed < self.min_interval {
                waited = self.min_interval - elapsed;
                debug!("Rate limiting: waiting {}ms", waited.as_millis());
                sleep(waited).await;
            }
        }

        *last_request = Some(Instant::now());
        waited
    }
}
