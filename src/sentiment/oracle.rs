// SentimentOracle: the boundary between the moderator and the provider.
//
// Wraps one SentimentScorer and applies the failure policy. In lenient mode
// nothing escapes: every provider failure becomes a neutral score and a
// warning in the logs. In strict mode failures come back as OracleError so
// the moderator can report API_ERROR / AWS_ERROR.

use std::sync::Arc;

use thiserror::Error;
use tracing::warn;

use super::traits::{InvalidScore, SentimentResult, SentimentScorer};
use crate::config::{FailurePolicy, SentimentBackend};

/// A provider failure surfaced under the strict policy.
#[derive(Debug, Error)]
pub enum OracleError {
    #[error("{} returned an invalid sentiment score: '{raw}'", .backend.name())]
    InvalidScore { backend: SentimentBackend, raw: String },

    #[error("{} sentiment analysis failed: {details}", .backend.name())]
    AnalysisFailed {
        backend: SentimentBackend,
        details: String,
    },
}

impl OracleError {
    pub fn backend(&self) -> SentimentBackend {
        match self {
            OracleError::InvalidScore { backend, .. } | OracleError::AnalysisFailed { backend, .. } => {
                *backend
            }
        }
    }

    fn from_provider(backend: SentimentBackend, err: anyhow::Error) -> Self {
        match err.downcast_ref::<InvalidScore>() {
            Some(invalid) => OracleError::InvalidScore {
                backend,
                raw: invalid.raw.clone(),
            },
            None => OracleError::AnalysisFailed {
                backend,
                details: format!("{err:#}"),
            },
        }
    }
}

/// Scores text through exactly one provider under a fixed failure policy.
#[derive(Clone)]
pub struct SentimentOracle {
    scorer: Arc<dyn SentimentScorer>,
    policy: FailurePolicy,
}

impl SentimentOracle {
    pub fn new(scorer: Arc<dyn SentimentScorer>, policy: FailurePolicy) -> Self {
        Self { scorer, policy }
    }

    pub fn backend(&self) -> SentimentBackend {
        self.scorer.backend()
    }

    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    /// Score `text` without the detailed breakdown.
    pub async fn score(&self, text: &str) -> Result<SentimentResult, OracleError> {
        self.analyze(text, false).await
    }

    /// Score `text`, optionally fetching the detailed breakdown alongside.
    ///
    /// Empty text is neutral and never reaches the provider. When `detailed`
    /// is set the two provider calls run concurrently.
    pub async fn analyze(&self, text: &str, detailed: bool) -> Result<SentimentResult, OracleError> {
        if text.trim().is_empty() {
            return Ok(SentimentResult::neutral());
        }

        if !detailed {
            let score = self.settle(self.scorer.score_text(text).await, 0.0)?;
            return Ok(SentimentResult {
                score,
                detailed: None,
            });
        }

        let (score, breakdown) =
            tokio::join!(self.scorer.score_text(text), self.scorer.detailed(text));

        let score = match score {
            Ok(score) => score,
            // Breakdown is dropped whenever the scalar call failed
            Err(e) => return self.settle(Err(e), 0.0).map(|_| SentimentResult::neutral()),
        };
        let detailed = self.settle(breakdown, None)?;

        Ok(SentimentResult { score, detailed })
    }

    /// Reachability probe, bypassing the failure policy.
    pub async fn check_connectivity(&self) -> anyhow::Result<()> {
        self.scorer.check_connectivity().await
    }

    fn settle<T>(&self, result: anyhow::Result<T>, fallback: T) -> Result<T, OracleError> {
        match result {
            Ok(value) => Ok(value),
            Err(e) => match self.policy {
                FailurePolicy::Lenient => {
                    warn!(
                        backend = self.backend().name(),
                        error = %format!("{e:#}"),
                        "Sentiment analysis failed, using neutral score"
                    );
                    Ok(fallback)
                }
                FailurePolicy::Strict => Err(OracleError::from_provider(self.backend(), e)),
            },
        }
    }
}
