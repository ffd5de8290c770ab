//! Analysis orchestration for Cadence
//!
//! [`EnhancedAnalyzer`] drives the full per-track pipeline: fingerprint
//! the file, consult the cache, extract raw features, build the HAMMS
//! vector, optionally enrich through the provider failover chain, and
//! persist everything in one transaction.

mod analyzer;
mod error;
mod features;

pub use analyzer::{AnalyzeOptions, EnhancedAnalyzer};
pub use error::{AnalyzerError, AnalyzerResult};
pub use features::{ExtractError, FeatureExtractor, TagFeatureExtractor, TagReader};
