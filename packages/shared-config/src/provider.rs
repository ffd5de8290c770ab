//! Enrichment provider configuration types

use std::env;

use crate::{get_env_or_default, parse_env, ConfigError, ConfigResult};

/// Settings for a single enrichment provider
///
/// Each provider reads its own environment prefix, e.g.
/// `ANTHROPIC_API_KEY`, `ANTHROPIC_MODEL`, `ANTHROPIC_RATE_LIMIT_RPM`.
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    /// API credential (empty for credential-free providers)
    pub api_key: String,

    /// Model identifier
    pub model: String,

    /// Maximum tokens per completion
    pub max_tokens: u32,

    /// Sampling temperature (0.0 - 1.0)
    pub temperature: f32,

    /// Hard per-call deadline in milliseconds
    pub timeout_ms: u64,

    /// Retry cap for transient failures
    pub max_retries: u32,

    /// Token-bucket refill rate (requests per minute)
    pub rate_limit_rpm: u32,

    /// Override for the service base URL (useful for testing)
    pub base_url: Option<String>,
}

impl ProviderSettings {
    /// Load settings for a provider from its environment prefix
    ///
    /// # Errors
    /// Returns `ConfigError::MissingEnvVar` when the provider requires a
    /// credential and none is configured.
    pub fn from_env(prefix: &str, default_model: &str, requires_key: bool) -> ConfigResult<Self> {
        let key_var = format!("{}_API_KEY", prefix);
        let api_key = env::var(&key_var).unwrap_or_default();
        if requires_key && api_key.trim().is_empty() {
            return Err(ConfigError::MissingEnvVar(key_var));
        }

        Ok(Self {
            api_key,
            model: get_env_or_default(&format!("{}_MODEL", prefix), default_model),
            max_tokens: parse_env(&format!("{}_MAX_TOKENS", prefix), 1000)?,
            temperature: parse_env(&format!("{}_TEMPERATURE", prefix), 0.1)?,
            timeout_ms: parse_env(&format!("{}_TIMEOUT_MS", prefix), 30_000)?,
            max_retries: parse_env(&format!("{}_MAX_RETRIES", prefix), 3)?,
            rate_limit_rpm: parse_env(&format!("{}_RATE_LIMIT_RPM", prefix), 60)?,
            base_url: env::var(format!("{}_BASE_URL", prefix)).ok(),
        })
    }

    /// Create settings with a model and key (useful for testing)
    pub fn with_model(model: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            max_tokens: 1000,
            temperature: 0.1,
            timeout_ms: 30_000,
            max_retries: 3,
            rate_limit_rpm: 60,
            base_url: None,
        }
    }

    /// Set a custom base URL, returning self for chaining
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Minimum interval between requests implied by the rate limit
    pub fn min_request_interval(&self) -> std::time::Duration {
        let rpm = self.rate_limit_rpm.max(1);
        std::time::Duration::from_secs_f64(60.0 / rpm as f64)
    }
}

/// Parse the ordered provider list from `PROVIDER_ORDER`
///
/// Comma-separated provider names, first-to-try. Defaults to the
/// cheapest-first builtin ordering when unset.
pub fn provider_order_from_env() -> Vec<String> {
    let raw = get_env_or_default("PROVIDER_ORDER", "ollama,anthropic,openai");
    raw.split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_model() {
        let settings = ProviderSettings::with_model("claude-3-haiku-20240307", "sk-test");
        assert_eq!(settings.model, "claude-3-haiku-20240307");
        assert_eq!(settings.max_retries, 3);
        assert_eq!(settings.rate_limit_rpm, 60);
    }

    #[test]
    fn test_min_request_interval() {
        let mut settings = ProviderSettings::with_model("m", "k");
        settings.rate_limit_rpm = 120;
        assert_eq!(settings.min_request_interval().as_millis(), 500);

        // Zero rpm must not divide by zero
        settings.rate_limit_rpm = 0;
        assert_eq!(settings.min_request_interval().as_secs(), 60);
    }

    #[test]
    fn test_missing_required_key() {
        temp_env::with_var_unset("CADENCETEST_API_KEY", || {
            let result = ProviderSettings::from_env("CADENCETEST", "model", true);
            assert!(matches!(result, Err(ConfigError::MissingEnvVar(_))));
        });
    }

    #[test]
    fn test_credential_free_provider() {
        temp_env::with_var_unset("CADENCETEST2_API_KEY", || {
            let settings = ProviderSettings::from_env("CADENCETEST2", "mistral", false).unwrap();
            assert!(settings.api_key.is_empty());
            assert_eq!(settings.model, "mistral");
        });
    }

    #[test]
    fn test_provider_order_parsing() {
        temp_env::with_var("PROVIDER_ORDER", Some("Anthropic, openai ,"), || {
            let order = provider_order_from_env();
            assert_eq!(order, vec!["anthropic", "openai"]);
        });
    }

    #[test]
    fn test_provider_order_default() {
        temp_env::with_var_unset("PROVIDER_ORDER", || {
            let order = provider_order_from_env();
            assert_eq!(order[0], "ollama");
        });
    }
}
