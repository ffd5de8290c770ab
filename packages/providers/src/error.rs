//! Error types for the provider layer

use thiserror::Error;

/// Errors that can occur when talking to an enrichment provider
#[derive(Error, Debug)]
pub enum ProviderError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Failed to serialize/deserialize JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The remote service returned an error status
    #[error("provider API error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// The remote service asked us to slow down
    #[error("rate limited by provider{}", retry_after_secs.map(|s| format!(", retry after {}s", s)).unwrap_or_default())]
    RateLimited { retry_after_secs: Option<u64> },

    /// Request exceeded its deadline
    #[error("provider request timed out after {0} ms")]
    Timeout(u64),

    /// Credentials rejected
    #[error("provider authentication failed: {0}")]
    AuthFailed(String),

    /// Requested model does not exist at the provider
    #[error("model not found: {0}")]
    ModelNotFound(String),

    /// Provider settings are unusable
    #[error("invalid provider configuration: {0}")]
    InvalidConfig(String),

    /// All retry attempts exhausted
    #[error("all {attempts} attempts failed, last error: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },

    /// Every configured provider failed
    #[error("all enrichment providers failed{}", last_error.as_deref().map(|e| format!(", last error: {}", e)).unwrap_or_default())]
    AllProvidersFailed { last_error: Option<String> },

    /// No provider is registered under the requested name
    #[error("unknown provider '{name}', available: {}", available.join(", "))]
    UnknownProvider { name: String, available: Vec<String> },

    /// Caller-requested abort
    #[error("provider call cancelled")]
    Cancelled,
}

impl ProviderError {
    /// Transient errors are worth retrying on the same provider
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout(_) | Self::RateLimited { .. } => true,
            Self::Http(e) => {
                if e.is_timeout() || e.is_connect() {
                    return true;
                }
                matches!(e.status(), Some(status) if status.is_server_error() || status.as_u16() == 429)
            }
            Self::Api { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    /// Permanent errors require operator intervention and are never
    /// swallowed into a fallback result
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            Self::AuthFailed(_)
                | Self::ModelNotFound(_)
                | Self::InvalidConfig(_)
                | Self::UnknownProvider { .. }
        )
    }
}

/// Result type for provider operations
pub type ProviderResult<T> = Result<T, ProviderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(ProviderError::Timeout(30_000).is_transient());
        assert!(ProviderError::RateLimited {
            retry_after_secs: None
        }
        .is_transient());
        assert!(ProviderError::Api {
            status: 503,
            message: "overloaded".into()
        }
        .is_transient());

        assert!(!ProviderError::AuthFailed("bad key".into()).is_transient());
        assert!(!ProviderError::Api {
            status: 400,
            message: "bad request".into()
        }
        .is_transient());
    }

    #[test]
    fn test_permanent_classification() {
        assert!(ProviderError::AuthFailed("bad key".into()).is_permanent());
        assert!(ProviderError::ModelNotFound("gpt-9".into()).is_permanent());
        assert!(!ProviderError::Timeout(1).is_permanent());
        assert!(!ProviderError::Cancelled.is_permanent());
    }

    #[test]
    fn test_unknown_provider_display_lists_names() {
        let err = ProviderError::UnknownProvider {
            name: "zai".into(),
            available: vec!["anthropic".into(), "openai".into()],
        };
        let message = err.to_string();
        assert!(message.contains("zai"));
        assert!(message.contains("anthropic, openai"));
    }
}
