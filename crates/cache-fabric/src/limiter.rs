use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

/// Spacing rate limiter: successive `wait()` returns are at least
/// `1 / calls_per_second` apart, across all tasks sharing the instance.
///
/// The lock is held through the sleep so concurrent callers queue up and
/// leave with properly spaced slots. One instance per external provider.
pub struct RateLimiter {
    min_interval: Duration,
    last_call: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(calls_per_second: f64) -> Self {
        Self {
            min_interval: Duration::from_secs_f64(1.0 / calls_per_second.max(0.001)),
            last_call: Mutex::new(None),
        }
    }

    /// Block until the next permitted instant.
    pub async fn wait(&self) {
        let mut last = self.last_call.lock().await;
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < self.min_interval {
                tokio::time::sleep(self.min_interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }
}
