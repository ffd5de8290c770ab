//! Semantic-enrichment provider layer
//!
//! A registry of pluggable LLM providers behind one unified
//! request/response contract. Each provider carries its own rate-limit
//! bucket, retry policy, defensive JSON recovery, and cost accounting;
//! the [`Enricher`] layers ordered failover on top.

mod anthropic;
mod enricher;
mod error;
mod extract;
mod fallback;
mod ollama;
mod openai;
mod prompt;
mod provider;
mod rate_limit;
mod registry;
mod retry;
mod types;
mod util;

pub use anthropic::AnthropicProvider;
pub use enricher::{Enricher, ProgressCallback, ProviderStatus};
pub use error::{ProviderError, ProviderResult};
pub use extract::parse_enrichment;
pub use fallback::fallback_enrichment;
pub use ollama::OllamaProvider;
pub use openai::OpenAiProvider;
pub use prompt::build_analysis_prompt;
pub use provider::Provider;
pub use rate_limit::RateLimiter;
pub use registry::{builtin_registry, ProviderRegistry};
pub use types::{DateVerification, Enrichment, EnrichmentRequest, ProviderResponse};
