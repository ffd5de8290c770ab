//! The unified provider capability

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::ProviderResult;
use crate::types::{EnrichmentRequest, ProviderResponse};

/// An adapter to one external semantic-analysis service
///
/// Providers are stateless with respect to tracks; each instance
/// carries its credentials and a rate-limit bucket. Implementations
/// handle their own retry and JSON recovery, so `analyze` only returns
/// `Err` for permanent misconfiguration, exhausted retries, or
/// cancellation — parse trouble degrades into a fallback-marked
/// response instead.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Short registry name ("anthropic", "openai", "ollama")
    fn name(&self) -> &'static str;

    /// Model identifier this instance talks to
    fn model(&self) -> &str;

    /// Analyze one track's features into semantic metadata
    async fn analyze(
        &self,
        request: &EnrichmentRequest,
        cancel: &CancellationToken,
    ) -> ProviderResult<ProviderResponse>;

    /// Verify the service is reachable and the credentials work
    async fn test_connection(&self) -> ProviderResult<()>;

    /// Estimated cost in USD for a call of the given size
    fn cost_estimate(&self, prompt_tokens: u32, completion_tokens: u32) -> f64;
}
