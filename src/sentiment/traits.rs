// Sentiment scorer trait: the swap-ready abstraction.
//
// Each implementation wraps exactly one external provider and answers with a
// polarity score in [-1, 1]. Providers that expose a categorical breakdown
// can also return a DetailedSentiment.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::SentimentBackend;

/// Categorical sentiment as reported by managed NLP providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SentimentLabel {
    Positive,
    Negative,
    Neutral,
    Mixed,
}

/// Label plus the four confidence weights (each in [0, 1]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailedSentiment {
    pub sentiment: SentimentLabel,
    pub positive: f64,
    pub negative: f64,
    pub neutral: f64,
    pub mixed: f64,
}

impl DetailedSentiment {
    /// Collapse the breakdown into a single polarity score.
    ///
    /// POSITIVE uses the positive weight, NEGATIVE the negated negative weight.
    /// NEUTRAL and MIXED stay continuous: half the positive/negative spread.
    pub fn derived_score(&self) -> f64 {
        let score = match self.sentiment {
            SentimentLabel::Positive => self.positive,
            SentimentLabel::Negative => -self.negative,
            SentimentLabel::Neutral | SentimentLabel::Mixed => (self.positive - self.negative) / 2.0,
        };
        score.clamp(-1.0, 1.0)
    }

    /// All four weights are finite and within [0, 1].
    pub fn weights_valid(&self) -> bool {
        [self.positive, self.negative, self.neutral, self.mixed]
            .iter()
            .all(|w| w.is_finite() && (0.0..=1.0).contains(w))
    }
}

/// The oracle's answer for one piece of text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SentimentResult {
    /// Polarity from -1.0 (very negative) to 1.0 (very positive)
    pub score: f64,
    /// Breakdown, when requested and the provider supports it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detailed: Option<DetailedSentiment>,
}

impl SentimentResult {
    pub fn neutral() -> Self {
        Self {
            score: 0.0,
            detailed: None,
        }
    }
}

/// A provider answered, but not with a usable score.
#[derive(Debug, Error)]
#[error("invalid sentiment score received: '{raw}'")]
pub struct InvalidScore {
    pub raw: String,
}

/// Parse a provider's free-text reply into a score, rejecting anything
/// that is not a finite number in [-1, 1].
pub fn parse_score(raw: &str) -> Result<f64, InvalidScore> {
    let trimmed = raw.trim();
    match trimmed.parse::<f64>() {
        Ok(score) if score.is_finite() && (-1.0..=1.0).contains(&score) => Ok(score),
        _ => Err(InvalidScore {
            raw: trimmed.to_string(),
        }),
    }
}

/// First 50 characters of the text, for log lines.
pub(crate) fn preview(text: &str) -> &str {
    match text.char_indices().nth(50) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Trait for scoring text sentiment. Implementations must be async because
/// every provider is an HTTP API.
#[async_trait]
pub trait SentimentScorer: Send + Sync {
    /// Which provider this is; decides the error code reported on failure.
    fn backend(&self) -> SentimentBackend;

    /// Score a single text. Exactly one outbound call.
    async fn score_text(&self, text: &str) -> Result<f64>;

    /// Categorical breakdown. Providers without one return `Ok(None)`.
    async fn detailed(&self, _text: &str) -> Result<Option<DetailedSentiment>> {
        Ok(None)
    }

    /// Cheap reachability probe used by the health endpoint.
    async fn check_connectivity(&self) -> Result<()> {
        Ok(())
    }
}
