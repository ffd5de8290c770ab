//! Per-provider request pacing

use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::error::{ProviderError, ProviderResult};

/// Enforces a minimum interval between requests to one provider
///
/// The interval derives from the provider's configured requests-per-
/// minute. Waiters queue on the internal mutex, so concurrent callers
/// drain one at a time at the configured pace. Cancellation aborts a
/// waiting caller promptly.
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl RateLimiter {
    /// Create a limiter from a requests-per-minute budget
    pub fn from_rpm(rpm: u32) -> Self {
        let rpm = rpm.max(1);
        Self {
            min_interval: Duration::from_secs_f64(60.0 / f64::from(rpm)),
            last_request: Mutex::new(None),
        }
    }

    /// Wait until the next request slot opens
    ///
    /// # Errors
    /// Returns `ProviderError::Cancelled` when the token fires while
    /// waiting.
    pub async fn acquire(&self, cancel: &CancellationToken) -> ProviderResult<()> {
        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.min_interval {
                let wait = self.min_interval - elapsed;
                tracing::debug!(wait_ms = wait.as_millis() as u64, "Rate limit pacing");
                tokio::select! {
                    _ = tokio::time::sleep(wait) => {}
                    _ = cancel.cancelled() => return Err(ProviderError::Cancelled),
                }
            }
        }
        *last = Some(Instant::now());
        Ok(())
    }

    /// The enforced minimum interval
    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }
}
