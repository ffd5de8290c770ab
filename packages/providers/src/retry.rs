//! Retry policy for provider calls

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::{ProviderError, ProviderResult};

/// Run an operation with the provider retry policy
///
/// Up to `max_attempts` tries. Rate-limit rejections back off
/// exponentially (`2^attempt` seconds, honoring a server-provided
/// retry-after when longer); other transient errors retry immediately;
/// permanent errors and cancellation fail at once.
pub async fn with_retry<T, F, Fut>(
    max_attempts: u32,
    cancel: &CancellationToken,
    operation: F,
) -> ProviderResult<T>
where
    F: Fn(u32) -> Fut,
    Fut: Future<Output = ProviderResult<T>>,
{
    if max_attempts == 0 {
        return operation(0).await;
    }

    let mut last_error: Option<ProviderError> = None;

    for attempt in 0..max_attempts {
        if cancel.is_cancelled() {
            return Err(ProviderError::Cancelled);
        }

        match operation(attempt).await {
            Ok(result) => return Ok(result),
            Err(ProviderError::Cancelled) => return Err(ProviderError::Cancelled),
            Err(e) if !e.is_transient() => return Err(e),
            Err(e) => {
                let is_last = attempt + 1 == max_attempts;
                if !is_last {
                    if let ProviderError::RateLimited { retry_after_secs } = &e {
                        let backoff = 2u64.pow(attempt);
                        let wait = retry_after_secs.map_or(backoff, |ra| ra.max(backoff));
                        tracing::warn!(
                            attempt = attempt + 1,
                            max_attempts,
                            wait_secs = wait,
                            "Rate limited, backing off"
                        );
                        tokio::select! {
                            _ = tokio::time::sleep(Duration::from_secs(wait)) => {}
                            _ = cancel.cancelled() => return Err(ProviderError::Cancelled),
                        }
                    } else {
                        tracing::warn!(
                            attempt = attempt + 1,
                            max_attempts,
                            error = %e,
                            "Retrying after transient error"
                        );
                    }
                }
                last_error = Some(e);
            }
        }
    }

    Err(ProviderError::RetriesExhausted {
        attempts: max_attempts,
        last_error: last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "unknown error".to_string()),
    })
}
