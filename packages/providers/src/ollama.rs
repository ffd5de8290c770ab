//! Local Ollama chat provider
//!
//! Runs against a local Ollama instance, so it carries no credential
//! and reports zero cost. This is the default first provider in the
//! cheapest-first ordering.

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

const DEFAULT_BASE_URL: &str = "http://localhost:11434";

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    stream: bool,
    options: ChatOptions,
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: ResponseMessage,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: String,
}

/// Local Ollama provider
pub struct OllamaProvider {
    http: reqwest::Client,
    settings: ProviderSettings,
    base_url: String,
    rate_limiter: RateLimiter,
}

impl OllamaProvider {
    /// Create a provider from settings; no credential is required
    pub fn new(settings: &ProviderSettings) -> ProviderResult<Self> {
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
            settings: settings.clone(),
        })
    }

    fn chat_url(&self) -> String {
        format!("{}/api/chat", self.base_url.trim_end_matches('/'))
    }

    async fn send_once(&self, prompt: &str) -> ProviderResult<(String, Option<u32>, Option<u32>)> {
        let body = ChatRequest {
            model: &self.settings.model,
            messages: vec![
                WireMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                WireMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            stream: false,
            options: ChatOptions {
                temperature: self.settings.temperature,
                num_predict: self.settings.max_tokens,
            },
        };

        let response = self
            .http
            .post(self.chat_url())
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
            let body = truncate_error_body(response.text().await.unwrap_or_default());
            return Err(match status.as_u16() {
                404 if body.contains("model") && body.contains("not found") => {
                    ProviderError::ModelNotFound(self.settings.model.clone())
                }
                status => ProviderError::Api {
                    status,
                    message: body,
                },
            });
        }

        let parsed: ChatResponse = response.json().await?;
        Ok((
            parsed.message.content,
            parsed.prompt_eval_count,
            parsed.eval_count,
        ))
    }
}

#[async_trait]
impl Provider for OllamaProvider {
    fn name(&self) -> &'static str {
        "ollama"
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
            // Local inference has no per-token cost
            cost_estimate: Some(0.0),
            error_message: None,
        })
    }

    async fn test_connection(&self) -> ProviderResult<()> {
        let url = format!("{}/api/tags", self.base_url.trim_end_matches('/'));
        let response = self.http.get(url).send().await.map_err(ProviderError::Http)?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let body = truncate_error_body(response.text().await.unwrap_or_default());
            Err(ProviderError::Api {
                status: status.as_u16(),
                message: body,
            })
        }
    }

    fn cost_estimate(&self, _prompt_tokens: u32, _completion_tokens: u32) -> f64 {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_settings(url: &str) -> ProviderSettings {
        ProviderSettings::with_model("mistral", "").with_base_url(url)
    }

    #[tokio::test]
    async fn test_analyze_parses_enrichment() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "message": {"role": "assistant", "content": "{\"genre\": \"Trance\", \"confidence\": 0.7}"},
                "done": true,
                "prompt_eval_count": 400,
                "eval_count": 60
            })))
            .mount(&server)
            .await;

        let provider = OllamaProvider::new(&test_settings(&server.uri())).unwrap();
        let response = provider
            .analyze(&EnrichmentRequest::default(), &CancellationToken::new())
            .await
            .unwrap();

        assert!(response.success);
        assert_eq!(response.enrichment.unwrap().genre.as_deref(), Some("Trance"));
        assert_eq!(response.cost_estimate, Some(0.0));
        assert_eq!(response.prompt_tokens, Some(400));
    }

    #[tokio::test]
    async fn test_model_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(
                ResponseTemplate::new(404).set_body_string("model 'mistral' not found"),
            )
            .mount(&server)
            .await;

        let provider = OllamaProvider::new(&test_settings(&server.uri())).unwrap();
        let result = provider
            .analyze(&EnrichmentRequest::default(), &CancellationToken::new())
            .await;
        assert!(matches!(result, Err(ProviderError::ModelNotFound(_))));
    }

    #[tokio::test]
    async fn test_connection_check() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/tags"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"models": []})))
            .mount(&server)
            .await;

        let provider = OllamaProvider::new(&test_settings(&server.uri())).unwrap();
        assert!(provider.test_connection().await.is_ok());
    }

    #[tokio::test]
    async fn test_no_credential_needed() {
        assert!(OllamaProvider::new(&ProviderSettings::with_model("mistral", "")).is_ok());
    }
}
