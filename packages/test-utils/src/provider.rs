//! Mock provider HTTP server
//!
//! Wraps a [`wiremock::MockServer`] with the Anthropic Messages shape,
//! so wire-level provider behavior (retries, failover, parse recovery)
//! can be tested without a real endpoint.

use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Mock enrichment endpoint speaking the Anthropic Messages shape
pub struct MockProviderServer {
    server: MockServer,
}

impl MockProviderServer {
    /// Start a new mock server
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    /// Base URL to point a provider's `base_url` at
    pub fn url(&self) -> String {
        self.server.uri()
    }

    /// Underlying wiremock server, for custom mounts
    pub fn inner(&self) -> &MockServer {
        &self.server
    }

    /// Number of requests the server has received so far
    pub async fn requests_received(&self) -> usize {
        self.server
            .received_requests()
            .await
            .map(|r| r.len())
            .unwrap_or(0)
    }

    /// Mount a successful analysis returning the given content text
    pub async fn mock_analysis_success(&self, content: &str) {
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "content": [{"type": "text", "text": content}],
                "usage": {"input_tokens": 320, "output_tokens": 96}
            })))
            .mount(&self.server)
            .await;
    }

    /// Mount a rate-limit rejection for the next `n` requests
    pub async fn mock_rate_limited(&self, n: u64) {
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(
                ResponseTemplate::new(429)
                    .insert_header("retry-after", "1")
                    .set_body_string("rate limited"),
            )
            .up_to_n_times(n)
            .mount(&self.server)
            .await;
    }

    /// Mount a persistent server error
    pub async fn mock_server_error(&self) {
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .mount(&self.server)
            .await;
    }

    /// Mount an authentication rejection
    pub async fn mock_auth_failure(&self) {
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid x-api-key"))
            .mount(&self.server)
            .await;
    }
}
