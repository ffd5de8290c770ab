//! OpenAI Chat Completions provider

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

const DEFAULT_BASE_URL: &str = "https://api.openai.com";

/// Per-1K-token pricing for OpenAI models
fn model_pricing(model: &str) -> (f64, f64) {
    match model {
        "gpt-4o-mini" => (0.00015, 0.0006),
        "gpt-4o" => (0.0025, 0.01),
        "gpt-4-turbo" => (0.01, 0.03),
        _ => (0.00015, 0.0006),
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    max_tokens: u32,
    messages: Vec<WireMessage<'a>>,
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: String,
}

#[derive(Deserialize)]
struct Usage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

/// OpenAI GPT provider
pub struct OpenAiProvider {
    http: reqwest::Client,
    settings: ProviderSettings,
    base_url: String,
    rate_limiter: RateLimiter,
    pricing: (f64, f64),
}

impl OpenAiProvider {
    /// Create a provider from settings
    pub fn new(settings: &ProviderSettings) -> ProviderResult<Self> {
        if settings.api_key.trim().is_empty() {
            return Err(ProviderError::InvalidConfig(
                "openai API key is required".to_string(),
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

    fn completions_url(&self) -> String {
        format!(
            "{}/v1/chat/completions",
            self.base_url.trim_end_matches('/')
        )
    }

    async fn send_once(&self, prompt: &str) -> ProviderResult<(String, Option<u32>, Option<u32>)> {
        let body = ChatRequest {
            model: &self.settings.model,
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
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
        };

        let response = self
            .http
            .post(self.completions_url())
            .bearer_auth(&self.settings.api_key)
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

        let parsed: ChatResponse = response.json().await?;
        let text = parsed
            .choices
            .first()
            .map(|choice| choice.message.content.clone())
            .unwrap_or_default();
        let (prompt_tokens, completion_tokens) = match parsed.usage {
            Some(usage) => (Some(usage.prompt_tokens), Some(usage.completion_tokens)),
            None => (None, None),
        };
        Ok((text, prompt_tokens, completion_tokens))
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    fn name(&self) -> &'static str {
        "openai"
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
        let url = format!("{}/v1/models", self.base_url.trim_end_matches('/'));
        let response = self
            .http
            .get(url)
            .bearer_auth(&self.settings.api_key)
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
