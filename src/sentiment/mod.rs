// Sentiment scoring: trait-based abstraction for swappable providers.
//
// The SentimentScorer trait defines the provider interface. OpenAiScorer asks
// a chat model for a bare number; ComprehendScorer calls AWS Comprehend.
// SentimentOracle sits on top and applies the failure policy so callers
// only ever see a score in [-1, 1] or a typed failure.

pub mod comprehend;
pub mod openai;
pub mod oracle;
pub mod sigv4;
pub mod traits;

use std::sync::Arc;

use anyhow::Result;

use crate::config::{Config, SentimentBackend};

/// Build the configured scorer backend.
///
/// Call `Config::require_scorer` first; this does not re-check credentials.
pub fn create_scorer(config: &Config) -> Result<Arc<dyn traits::SentimentScorer>> {
    let scorer: Arc<dyn traits::SentimentScorer> = match config.backend {
        SentimentBackend::OpenAi => Arc::new(openai::OpenAiScorer::new(
            &config.openai_base_url,
            config.openai_api_key.clone(),
            config.openai_model.clone(),
        )?),
        SentimentBackend::Comprehend => Arc::new(comprehend::ComprehendScorer::new(
            &config.aws_region,
            config.aws_credentials.clone(),
            config.comprehend_endpoint.as_deref(),
        )?),
    };
    Ok(scorer)
}
