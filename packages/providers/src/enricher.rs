//! Multi-provider failover orchestration

use std::sync::{Arc, Mutex};

use cadence_shared_config::{provider_order_from_env, ProviderSettings};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{ProviderError, ProviderResult};
use crate::provider::Provider;
use crate::registry::ProviderRegistry;
use crate::types::{EnrichmentRequest, ProviderResponse};

/// Progress state reported between failover attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderStatus {
    Analyzing,
    Succeeded,
    Failed,
}

/// Synchronous progress callback: (provider name, status)
pub type ProgressCallback = Box<dyn Fn(&str, ProviderStatus) + Send + Sync>;

/// Tries an ordered list of providers until one succeeds
///
/// The default ordering is cheapest-first. A fallback-marked response
/// counts as partial success: with `accept_fallback` unset the chain
/// keeps trying for a real classification and only returns the best
/// partial result when everything else failed. Permanent errors
/// (credentials, configuration) abort the chain immediately so the
/// operator can fix them.
pub struct Enricher {
    providers: Vec<Arc<dyn Provider>>,
    accept_fallback: bool,
    progress: Option<ProgressCallback>,
    total_cost: Mutex<f64>,
}

impl Enricher {
    /// Create an enricher over an ordered provider list
    pub fn new(providers: Vec<Arc<dyn Provider>>) -> Self {
        Self {
            providers,
            accept_fallback: true,
            progress: None,
            total_cost: Mutex::new(0.0),
        }
    }

    /// Build an enricher from `PROVIDER_ORDER` and per-provider env
    /// settings
    ///
    /// Providers without configuration (typically a missing API key)
    /// are skipped with a log line rather than failing the whole
    /// chain; the result may be empty when nothing is configured.
    pub fn from_env(registry: &ProviderRegistry) -> Self {
        let mut providers: Vec<Arc<dyn Provider>> = Vec::new();
        for name in provider_order_from_env() {
            let (default_model, requires_key) = match name.as_str() {
                "anthropic" | "claude" => ("claude-3-haiku-20240307", true),
                "openai" | "gpt" | "chatgpt" => ("gpt-4o-mini", true),
                "ollama" => ("mistral", false),
                other => (other, true),
            };
            let settings =
                match ProviderSettings::from_env(&name.to_uppercase(), default_model, requires_key)
                {
                    Ok(settings) => settings,
                    Err(e) => {
                        debug!(provider = %name, error = %e, "Provider not configured, skipping");
                        continue;
                    }
                };
            match registry.create(&name, &settings) {
                Ok(provider) => {
                    info!(provider = %name, model = provider.model(), "Provider configured");
                    providers.push(provider);
                }
                Err(e) => {
                    warn!(provider = %name, error = %e, "Provider unavailable, skipping");
                }
            }
        }
        Self::new(providers)
    }

    /// Whether a fallback-marked enrichment stops the chain
    pub fn with_accept_fallback(mut self, accept: bool) -> Self {
        self.accept_fallback = accept;
        self
    }

    /// Attach a progress callback
    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    /// Names of the configured providers, in try order
    pub fn provider_names(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// True when no providers are configured
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Accumulated cost across every attempt this enricher has made
    pub fn total_cost(&self) -> f64 {
        *self.total_cost.lock().expect("cost lock poisoned")
    }

    fn emit(&self, provider: &str, status: ProviderStatus) {
        if let Some(callback) = &self.progress {
            callback(provider, status);
        }
    }

    fn record_cost(&self, response: &ProviderResponse) {
        if let Some(cost) = response.cost_estimate {
            let mut total = self.total_cost.lock().expect("cost lock poisoned");
            *total += cost;
        }
    }

    /// Run the failover chain for one track
    ///
    /// # Errors
    /// - `ProviderError::Cancelled` when the token fires
    /// - permanent errors from the current provider, unswallowed
    /// - `ProviderError::AllProvidersFailed` when the chain is exhausted
    pub async fn analyze(
        &self,
        request: &EnrichmentRequest,
        cancel: &CancellationToken,
    ) -> ProviderResult<ProviderResponse> {
        if self.providers.is_empty() {
            return Err(ProviderError::AllProvidersFailed { last_error: None });
        }

        let mut last_error: Option<String> = None;
        let mut best_partial: Option<ProviderResponse> = None;

        for provider in &self.providers {
            if cancel.is_cancelled() {
                return Err(ProviderError::Cancelled);
            }

            let name = provider.name();
            debug!(provider = name, model = provider.model(), "Trying provider");
            self.emit(name, ProviderStatus::Analyzing);

            match provider.analyze(request, cancel).await {
                Ok(response) if response.success => {
                    self.record_cost(&response);
                    if response.fallback && !self.accept_fallback {
                        warn!(
                            provider = name,
                            "Provider returned fallback enrichment, trying next"
                        );
                        self.emit(name, ProviderStatus::Failed);
                        if best_partial.is_none() {
                            best_partial = Some(response);
                        }
                        continue;
                    }
                    info!(
                        provider = name,
                        model = response.model,
                        elapsed_ms = response.elapsed_ms,
                        fallback = response.fallback,
                        "Enrichment succeeded"
                    );
                    self.emit(name, ProviderStatus::Succeeded);
                    return Ok(response);
                }
                Ok(response) => {
                    self.record_cost(&response);
                    warn!(
                        provider = name,
                        error = response.error_message.as_deref().unwrap_or("unknown"),
                        "Provider reported failure"
                    );
                    self.emit(name, ProviderStatus::Failed);
                    last_error = response.error_message;
                }
                Err(ProviderError::Cancelled) => return Err(ProviderError::Cancelled),
                Err(e) if e.is_permanent() => {
                    self.emit(name, ProviderStatus::Failed);
                    return Err(e);
                }
                Err(e) => {
                    warn!(provider = name, error = %e, "Provider failed");
                    self.emit(name, ProviderStatus::Failed);
                    last_error = Some(e.to_string());
                }
            }
        }

        if let Some(partial) = best_partial {
            info!(
                provider = %partial.provider,
                "Falling back to partial enrichment after chain exhaustion"
            );
            return Ok(partial);
        }

        Err(ProviderError::AllProvidersFailed { last_error })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::types::Enrichment;

    /// Scripted provider for failover tests
    struct Scripted {
        name: &'static str,
        outcome: Outcome,
        calls: AtomicUsize,
    }

    enum Outcome {
        Success(&'static str),
        Fallback,
        Transient,
        Permanent,
    }

    impl Scripted {
        fn new(name: &'static str, outcome: Outcome) -> Arc<Self> {
            Arc::new(Self {
                name,
                outcome,
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn response(&self, genre: &str, fallback: bool) -> ProviderResponse {
            ProviderResponse {
                success: true,
                enrichment: Some(Enrichment {
                    genre: Some(genre.to_string()),
                    confidence: if fallback { 0.3 } else { 0.8 },
                    ..Default::default()
                }),
                fallback,
                raw_response: String::new(),
                provider: self.name.to_string(),
                model: "scripted".to_string(),
                elapsed_ms: 1,
                prompt_tokens: Some(10),
                completion_tokens: Some(10),
                cost_estimate: Some(0.001),
                error_message: None,
            }
        }
    }

    #[async_trait]
    impl Provider for Scripted {
        fn name(&self) -> &'static str {
            self.name
        }

        fn model(&self) -> &str {
            "scripted"
        }

        async fn analyze(
            &self,
            _request: &EnrichmentRequest,
            _cancel: &CancellationToken,
        ) -> ProviderResult<ProviderResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.outcome {
                Outcome::Success(genre) => Ok(self.response(genre, false)),
                Outcome::Fallback => Ok(self.response("electronic", true)),
                Outcome::Transient => Err(ProviderError::RetriesExhausted {
                    attempts: 3,
                    last_error: "timeout".to_string(),
                }),
                Outcome::Permanent => Err(ProviderError::AuthFailed("bad key".to_string())),
            }
        }

        async fn test_connection(&self) -> ProviderResult<()> {
            Ok(())
        }

        fn cost_estimate(&self, _p: u32, _c: u32) -> f64 {
            0.001
        }
    }

    #[tokio::test]
    async fn test_failover_skips_failed_provider() {
        let a = Scripted::new("a", Outcome::Transient);
        let b = Scripted::new("b", Outcome::Success("disco"));
        let c = Scripted::new("c", Outcome::Success("unused"));

        let enricher = Enricher::new(vec![a.clone(), b.clone(), c.clone()]);
        let response = enricher
            .analyze(&EnrichmentRequest::default(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(response.provider, "b");
        assert_eq!(
            response.enrichment.unwrap().genre.as_deref(),
            Some("disco")
        );
        assert_eq!(a.calls(), 1);
        assert_eq!(b.calls(), 1);
        assert_eq!(c.calls(), 0);
    }

    #[tokio::test]
    async fn test_progress_events_in_order() {
        let a = Scripted::new("a", Outcome::Transient);
        let b = Scripted::new("b", Outcome::Success("house"));

        let events: Arc<Mutex<Vec<(String, ProviderStatus)>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        let enricher = Enricher::new(vec![a, b]).with_progress(Box::new(move |name, status| {
            sink.lock().unwrap().push((name.to_string(), status));
        }));

        enricher
            .analyze(&EnrichmentRequest::default(), &CancellationToken::new())
            .await
            .unwrap();

        let events = events.lock().unwrap();
        assert_eq!(
            *events,
            vec![
                ("a".to_string(), ProviderStatus::Analyzing),
                ("a".to_string(), ProviderStatus::Failed),
                ("b".to_string(), ProviderStatus::Analyzing),
                ("b".to_string(), ProviderStatus::Succeeded),
            ]
        );
    }

    #[tokio::test]
    async fn test_fallback_continues_when_not_accepted() {
        let a = Scripted::new("a", Outcome::Fallback);
        let b = Scripted::new("b", Outcome::Success("funk"));

        let enricher = Enricher::new(vec![a.clone(), b.clone()]).with_accept_fallback(false);
        let response = enricher
            .analyze(&EnrichmentRequest::default(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(response.provider, "b");
        assert!(!response.fallback);
        assert_eq!(a.calls(), 1);
        assert_eq!(b.calls(), 1);
    }

    #[tokio::test]
    async fn test_fallback_accepted_by_default() {
        let a = Scripted::new("a", Outcome::Fallback);
        let b = Scripted::new("b", Outcome::Success("unused"));

        let enricher = Enricher::new(vec![a, b.clone()]);
        let response = enricher
            .analyze(&EnrichmentRequest::default(), &CancellationToken::new())
            .await
            .unwrap();

        assert!(response.fallback);
        assert_eq!(b.calls(), 0);
    }

    #[tokio::test]
    async fn test_partial_result_used_when_chain_exhausts() {
        let a = Scripted::new("a", Outcome::Fallback);
        let b = Scripted::new("b", Outcome::Transient);

        let enricher = Enricher::new(vec![a, b]).with_accept_fallback(false);
        let response = enricher
            .analyze(&EnrichmentRequest::default(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(response.provider, "a");
        assert!(response.fallback);
    }

    #[tokio::test]
    async fn test_permanent_error_aborts_chain() {
        let a = Scripted::new("a", Outcome::Permanent);
        let b = Scripted::new("b", Outcome::Success("unused"));

        let enricher = Enricher::new(vec![a, b.clone()]);
        let result = enricher
            .analyze(&EnrichmentRequest::default(), &CancellationToken::new())
            .await;

        assert!(matches!(result, Err(ProviderError::AuthFailed(_))));
        assert_eq!(b.calls(), 0);
    }

    #[tokio::test]
    async fn test_all_failed() {
        let a = Scripted::new("a", Outcome::Transient);
        let b = Scripted::new("b", Outcome::Transient);

        let enricher = Enricher::new(vec![a, b]);
        let result = enricher
            .analyze(&EnrichmentRequest::default(), &CancellationToken::new())
            .await;

        assert!(matches!(
            result,
            Err(ProviderError::AllProvidersFailed { last_error: Some(_) })
        ));
    }

    #[tokio::test]
    async fn test_empty_enricher_fails() {
        let enricher = Enricher::new(vec![]);
        assert!(enricher.is_empty());
        let result = enricher
            .analyze(&EnrichmentRequest::default(), &CancellationToken::new())
            .await;
        assert!(matches!(
            result,
            Err(ProviderError::AllProvidersFailed { last_error: None })
        ));
    }

    #[tokio::test]
    async fn test_cancellation_short_circuits() {
        let a = Scripted::new("a", Outcome::Success("unused"));
        let enricher = Enricher::new(vec![a.clone()]);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = enricher.analyze(&EnrichmentRequest::default(), &cancel).await;
        assert!(matches!(result, Err(ProviderError::Cancelled)));
        assert_eq!(a.calls(), 0);
    }

    #[tokio::test]
    async fn test_from_env_skips_unconfigured_providers() {
        temp_env::with_vars(
            [
                ("PROVIDER_ORDER", Some("ollama,anthropic")),
                ("ANTHROPIC_API_KEY", None::<&str>),
                ("OLLAMA_MODEL", Some("llama3")),
            ],
            || {
                let registry = crate::registry::builtin_registry();
                let enricher = Enricher::from_env(&registry);
                // Ollama needs no credential; anthropic is skipped
                assert_eq!(enricher.provider_names(), vec!["ollama"]);
            },
        );
    }

    #[tokio::test]
    async fn test_cost_accumulates_across_attempts() {
        let a = Scripted::new("a", Outcome::Fallback);
        let b = Scripted::new("b", Outcome::Success("soul"));

        let enricher = Enricher::new(vec![a, b]).with_accept_fallback(false);
        enricher
            .analyze(&EnrichmentRequest::default(), &CancellationToken::new())
            .await
            .unwrap();

        // Both the partial and the winning attempt are charged
        assert!((enricher.total_cost() - 0.002).abs() < 1e-9);
    }
}
