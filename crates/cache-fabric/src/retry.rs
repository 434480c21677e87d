use std::future::Future;
use std::time::Duration;

use observatory_core::EngineError;

/// Exponential-backoff retry, restricted to transient transport errors.
///
/// Parse failures, legitimate absence and domain conflicts go straight back
/// to the caller — retrying those only burns the provider's rate budget.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay,
        }
    }

    /// Fast policy for tests.
    pub fn immediate(max_attempts: u32) -> Self {
        Self::new(max_attempts, Duration::from_millis(1), Duration::from_millis(1))
    }

    pub async fn run<T, F, Fut>(&self, op: F) -> Result<T, EngineError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, EngineError>>,
    {
        let mut attempt = 0u32;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && attempt + 1 < self.max_attempts => {
                    let delay = self
                        .base_delay
                        .saturating_mul(2u32.saturating_pow(attempt))
                        .min(self.max_delay);
                    tracing::debug!(
                        "transient failure (attempt {}/{}), backing off {:?}: {err}",
                        attempt + 1,
                        self.max_attempts,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
