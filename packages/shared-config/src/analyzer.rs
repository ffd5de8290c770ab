//! Analyzer/orchestrator configuration types

use crate::{parse_env, parse_env_bool, ConfigResult};

/// Configuration for the enhanced analyzer
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    /// Whether to run semantic enrichment at all
    pub enable_enrichment: bool,

    /// Maximum in-flight provider calls during batch analysis
    pub batch_concurrency: usize,

    /// Courtesy pause between batch items when enrichment is enabled
    pub batch_pause_ms: u64,

    /// Whether a fallback-marked enrichment stops the failover chain
    pub accept_fallback: bool,
}

impl AnalyzerConfig {
    /// Load analyzer configuration from environment variables
    pub fn from_env() -> ConfigResult<Self> {
        Ok(Self {
            enable_enrichment: parse_env_bool("ENABLE_ENRICHMENT", true)?,
            batch_concurrency: parse_env("BATCH_CONCURRENCY", 4)?,
            batch_pause_ms: parse_env("BATCH_PAUSE_MS", 500)?,
            accept_fallback: parse_env_bool("ACCEPT_FALLBACK_ENRICHMENT", true)?,
        })
    }
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            enable_enrichment: true,
            batch_concurrency: 4,
            batch_pause_ms: 500,
            accept_fallback: true,
        }
    }
}
