//! Shared configuration types for Cadence services
//!
//! This crate provides the configuration surface recognized by the
//! analysis core: database location, per-provider credentials and
//! limits, analyzer behavior, and playlist defaults. Everything loads
//! from environment variables with typed defaults.

mod analyzer;
mod database;
mod error;
mod playlist;
mod provider;

pub use analyzer::AnalyzerConfig;
pub use database::DatabaseConfig;
pub use error::{ConfigError, ConfigResult};
pub use playlist::{PlaylistConfig, ScoreWeights};
pub use provider::{provider_order_from_env, ProviderSettings};

use std::env;

/// Common configuration shared by every Cadence component
#[derive(Debug, Clone)]
pub struct CommonConfig {
    /// Database configuration
    pub database: DatabaseConfig,

    /// Analyzer/orchestrator configuration
    pub analyzer: AnalyzerConfig,

    /// Playlist generation defaults
    pub playlist: PlaylistConfig,

    /// Ordered list of enrichment providers, first-to-try
    pub provider_order: Vec<String>,

    /// Log level (from RUST_LOG or LOG_LEVEL)
    pub log_level: String,
}

impl CommonConfig {
    /// Load common configuration from environment variables
    pub fn from_env() -> ConfigResult<Self> {
        Ok(Self {
            database: DatabaseConfig::from_env()?,
            analyzer: AnalyzerConfig::from_env()?,
            playlist: PlaylistConfig::from_env()?,
            provider_order: provider_order_from_env(),
            log_level: env::var("RUST_LOG")
                .or_else(|_| env::var("LOG_LEVEL"))
                .unwrap_or_else(|_| "info".to_string()),
        })
    }
}

/// Helper function to get a required environment variable
pub fn get_required_env(name: &str) -> ConfigResult<String> {
    env::var(name).map_err(|_| ConfigError::MissingEnvVar(name.to_string()))
}

/// Helper function to get an optional environment variable with a default
pub fn get_env_or_default(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

/// Helper function to parse an environment variable into a specific type
pub fn parse_env<T>(name: &str, default: T) -> ConfigResult<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(val) => val
            .parse()
            .map_err(|e| ConfigError::InvalidValue(name.to_string(), format!("{}", e))),
        Err(_) => Ok(default),
    }
}

/// Helper function to parse a boolean environment variable
///
/// Accepts `1/0`, `true/false`, `yes/no` in any case.
pub fn parse_env_bool(name: &str, default: bool) -> ConfigResult<bool> {
    match env::var(name) {
        Ok(val) => match val.to_lowercase().as_str() {
            "1" | "true" | "yes" => Ok(true),
            "0" | "false" | "no" => Ok(false),
            other => Err(ConfigError::InvalidValue(
                name.to_string(),
                format!("expected boolean, got '{}'", other),
            )),
        },
        Err(_) => Ok(default),
    }
}
