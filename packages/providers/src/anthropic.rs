//! Anthropic Messages API provider

use std::time::{Duration, Instant};

use async_trait::async_trait;
use cadence_shared_config::ProviderSettings;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{ProviderError, ProviderResult};
use crate::extract::parse_enrichment;
use crate::fallback::fallback_enrichment;
use crate::prompt::{build_analysis_prompt, SYSTEM_PROMPT};
use crate::provider::Provider;
use crate::rate_limit::RateLimiter;
use crate::retry::with_retry;
use crate::types::{EnrichmentRequest, ProviderResponse};
use crate::util::{estimate_tokens, truncate_error_body};

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const API_VERSION: &str = "2023-06-01";

/// Per-1K-token pricing for Anthropic models
fn model_pricing(model: &str) -> (f64, f64) {
    match model {
        "claude-3-haiku-20240307" => (0.00025, 0.00125),
        "claude-3-5-haiku-20241022" => (0.001, 0.005),
        "claude-3-sonnet-20240229" | "claude-3-5-sonnet-20241022" => (0.003, 0.015),
        "claude-3-opus-20240229" => (0.015, 0.075),
        _ => (0.00025, 0.00125),
    }
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    system: &'a str,
    messages: Vec<WireMessage<'a>>,
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct Usage {
    input_tokens: u32,
    output_tokens: u32,
}

/// Anthropic Claude provider
pub struct AnthropicProvider {
    http: reqwest::Client,
    settings: ProviderSettings,
    base_url: String,
    rate_limiter: RateLimiter,
    pricing: (f64, f64),
}

impl AnthropicProvider {
    /// Create a provider from settings
    ///
    /// # Errors
    /// `ProviderError::InvalidConfig` when the credential is missing or
    /// the HTTP client cannot be built.
    pub fn new(settings: &ProviderSettings) -> ProviderResult<Self> {
        if settings.api_key.trim().is_empty() {
            return Err(ProviderError::InvalidConfig(
                "anthropic API key is required".to_string(),
            ));
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(settings.timeout_ms))
            .connect_timeout(Duration::from_secs(10))
            .pool_max_idle_per_host(4)
            .build()
            .map_err(ProviderError::Http)?;

        Ok(Self {
            http,
            base_url: settings
                .base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            rate_limiter: RateLimiter::from_rpm(settings.rate_limit_rpm),
            pricing: model_pricing(&settings.model),
            settings: settings.clone(),
        })
    }

    fn messages_url(&self) -> String {
        format!("{}/v1/messages", self.base_url.trim_end_matches('/'))
    }

    /// One Messages API round trip, no retry
    async fn send_once(&self, prompt: &str) -> ProviderResult<(String, Option<u32>, Option<u32>)> {
        let body = MessagesRequest {
            model: &self.settings.model,
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
            system: SYSTEM_PROMPT,
            messages: vec![WireMessage {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .http
            .post(self.messages_url())
            .header("x-api-key", &self.settings.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(self.settings.timeout_ms)
                } else {
                    ProviderError::Http(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok());
            let body = truncate_error_body(response.text().await.unwrap_or_default());
            return Err(match status.as_u16() {
                401 | 403 => ProviderError::AuthFailed(body),
                404 if body.contains("model") => {
                    ProviderError::ModelNotFound(self.settings.model.clone())
                }
                429 => ProviderError::RateLimited {
                    retry_after_secs: retry_after,
                },
                status => ProviderError::Api {
                    status,
                    message: body,
                },
            });
        }

        let parsed: MessagesResponse = response.json().await?;
        let text = parsed
            .content
            .first()
            .map(|block| block.text.clone())
            .unwrap_or_default();
        let (prompt_tokens, completion_tokens) = match parsed.usage {
            Some(usage) => (Some(usage.input_tokens), Some(usage.output_tokens)),
            None => (None, None),
        };
        Ok((text, prompt_tokens, completion_tokens))
    }
}

#[async_trait]
impl Provider for AnthropicProvider {
    fn name(&self) -> &'static str {
        "anthropic"
    }

    fn model(&self) -> &str {
        &self.settings.model
    }

    async fn analyze(
        &self,
        request: &EnrichmentRequest,
        cancel: &CancellationToken,
    ) -> ProviderResult<ProviderResponse> {
        let started = Instant::now();
        self.rate_limiter.acquire(cancel).await?;

        let prompt = build_analysis_prompt(request);
        debug!(model = %self.settings.model, prompt_len = prompt.len(), "Sending analysis request");

        let (text, prompt_tokens, completion_tokens) =
            with_retry(self.settings.max_retries, cancel, |_| self.send_once(&prompt)).await?;

        let prompt_tokens = prompt_tokens.unwrap_or_else(|| estimate_tokens(&prompt));
        let completion_tokens = completion_tokens.unwrap_or_else(|| estimate_tokens(&text));
        let cost = self.cost_estimate(prompt_tokens, completion_tokens);

        let (enrichment, fallback) = match parse_enrichment(&text) {
            Some(enrichment) => (enrichment, false),
            None => {
                debug!("JSON recovery failed, synthesizing fallback enrichment");
                (fallback_enrichment(request), true)
            }
        };

        Ok(ProviderResponse {
            success: true,
            enrichment: Some(enrichment),
            fallback,
            raw_response: text,
            provider: self.name().to_string(),
            model: self.settings.model.clone(),
            elapsed_ms: started.elapsed().as_millis() as u64,
            prompt_tokens: Some(prompt_tokens),
            completion_tokens: Some(completion_tokens),
            cost_estimate: Some(cost),
            error_message: None,
        })
    }

    async fn test_connection(&self) -> ProviderResult<()> {
        let body = MessagesRequest {
            model: &self.settings.model,
            max_tokens: 1,
            temperature: 0.0,
            system: "",
            messages: vec![WireMessage {
                role: "user",
                content: "ping",
            }],
        };
        let response = self
            .http
            .post(self.messages_url())
            .header("x-api-key", &self.settings.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(ProviderError::Http)?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let body = truncate_error_body(response.text().await.unwrap_or_default());
            Err(match status.as_u16() {
                401 | 403 => ProviderError::AuthFailed(body),
                status => ProviderError::Api {
                    status,
                    message: body,
                },
            })
        }
    }

    fn cost_estimate(&self, prompt_tokens: u32, completion_tokens: u32) -> f64 {
        let (input, output) = self.pricing;
        (f64::from(prompt_tokens) / 1000.0) * input
            + (f64::from(completion_tokens) / 1000.0) * output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_settings(url: &str) -> ProviderSettings {
        ProviderSettings::with_model("claude-3-haiku-20240307", "sk-ant-test").with_base_url(url)
    }

    fn analysis_body(text: &str) -> serde_json::Value {
        json!({
            "content": [{"type": "text", "text": text}],
            "usage": {"input_tokens": 300, "output_tokens": 90}
        })
    }

    #[tokio::test]
    async fn test_analyze_parses_enrichment() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(header("anthropic-version", API_VERSION))
            .respond_with(ResponseTemplate::new(200).set_body_json(analysis_body(
                r#"{"genre": "Disco", "subgenre": "Euro Disco", "confidence": 0.8}"#,
            )))
            .mount(&server)
            .await;

        let provider = AnthropicProvider::new(&test_settings(&server.uri())).unwrap();
        let response = provider
            .analyze(&EnrichmentRequest::default(), &CancellationToken::new())
            .await
            .unwrap();

        assert!(response.success);
        assert!(!response.fallback);
        let enrichment = response.enrichment.unwrap();
        assert_eq!(enrichment.genre.as_deref(), Some("Disco"));
        assert_eq!(response.prompt_tokens, Some(300));
        assert!(response.cost_estimate.unwrap() > 0.0);
    }

    #[tokio::test]
    async fn test_unparseable_response_falls_back() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(analysis_body("I cannot classify this track, sorry.")),
            )
            .mount(&server)
            .await;

        let provider = AnthropicProvider::new(&test_settings(&server.uri())).unwrap();
        let request = EnrichmentRequest {
            bpm: Some(150.0),
            ..Default::default()
        };
        let response = provider
            .analyze(&request, &CancellationToken::new())
            .await
            .unwrap();

        assert!(response.success);
        assert!(response.fallback);
        let enrichment = response.enrichment.unwrap();
        assert_eq!(enrichment.genre.as_deref(), Some("electronic"));
        assert!(enrichment.confidence <= 0.3);
        // Raw text is preserved for audit even on fallback
        assert!(response.raw_response.contains("cannot classify"));
    }

    #[tokio::test]
    async fn test_auth_failure_is_permanent() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid x-api-key"))
            .expect(1)
            .mount(&server)
            .await;

        let provider = AnthropicProvider::new(&test_settings(&server.uri())).unwrap();
        let result = provider
            .analyze(&EnrichmentRequest::default(), &CancellationToken::new())
            .await;

        assert!(matches!(result, Err(ProviderError::AuthFailed(_))));
    }

    #[tokio::test]
    async fn test_server_error_retries_without_backoff() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(500).set_body_string("overloaded"))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(analysis_body(r#"{"genre": "House"}"#)),
            )
            .expect(1)
            .mount(&server)
            .await;

        let provider = AnthropicProvider::new(&test_settings(&server.uri())).unwrap();
        let response = provider
            .analyze(&EnrichmentRequest::default(), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(
            response.enrichment.unwrap().genre.as_deref(),
            Some("House")
        );
    }

    #[tokio::test]
    async fn test_model_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(404).set_body_string("model not found"))
            .mount(&server)
            .await;

        let provider = AnthropicProvider::new(&test_settings(&server.uri())).unwrap();
        let result = provider
            .analyze(&EnrichmentRequest::default(), &CancellationToken::new())
            .await;
        assert!(matches!(result, Err(ProviderError::ModelNotFound(_))));
    }

    #[tokio::test]
    async fn test_missing_key_rejected_at_construction() {
        let settings = ProviderSettings::with_model("claude-3-haiku-20240307", "  ");
        assert!(matches!(
            AnthropicProvider::new(&settings),
            Err(ProviderError::InvalidConfig(_))
        ));
    }

    #[tokio::test]
    async fn test_test_connection() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(analysis_body("pong")))
            .mount(&server)
            .await;

        let provider = AnthropicProvider::new(&test_settings(&server.uri())).unwrap();
        assert!(provider.test_connection().await.is_ok());
    }

    #[test]
    fn test_pricing_table() {
        let haiku = model_pricing("claude-3-haiku-20240307");
        let opus = model_pricing("claude-3-opus-20240229");
        assert!(opus.0 > haiku.0);
        // Unknown models price as the cheapest tier
        assert_eq!(model_pricing("claude-unknown"), haiku);
    }
}
