// Deterministic scorer stubs shared by the integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

use telex_sentiment::config::{FailurePolicy, ModerationConfig, SentimentBackend};
use telex_sentiment::moderation::models::{ModerationRequest, Setting, SettingType};
use telex_sentiment::moderation::MessageModerator;
use telex_sentiment::sentiment::oracle::SentimentOracle;
use telex_sentiment::sentiment::traits::{DetailedSentiment, SentimentLabel, SentimentScorer};

/// What the stub does when asked for a score.
#[derive(Clone, Copy)]
pub enum Behavior {
    Score(f64),
    /// Reply that is not a usable number
    Invalid,
    Transport,
    /// Sleep this long, then answer with the score
    Slow(Duration, f64),
    Panic,
}

pub struct StubScorer {
    pub behavior: Behavior,
    pub backend: SentimentBackend,
    pub reachable: bool,
    pub calls: AtomicUsize,
}

impl StubScorer {
    pub fn new(behavior: Behavior) -> Arc<Self> {
        Self::with_backend(behavior, SentimentBackend::OpenAi)
    }

    pub fn with_backend(behavior: Behavior, backend: SentimentBackend) -> Arc<Self> {
        Arc::new(Self {
            behavior,
            backend,
            reachable: true,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SentimentScorer for StubScorer {
    fn backend(&self) -> SentimentBackend {
        self.backend
    }

    async fn score_text(&self, _text: &str) -> Result<f64> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.behavior {
            Behavior::Score(s) => Ok(s),
            Behavior::Invalid => Ok(telex_sentiment::sentiment::traits::parse_score("lovely")?),
            Behavior::Transport => anyhow::bail!("connection reset by peer"),
            Behavior::Slow(delay, s) => {
                tokio::time::sleep(delay).await;
                Ok(s)
            }
            Behavior::Panic => panic!("scorer exploded"),
        }
    }

    async fn detailed(&self, _text: &str) -> Result<Option<DetailedSentiment>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Some(DetailedSentiment {
            sentiment: SentimentLabel::Negative,
            positive: 0.02,
            negative: 0.9,
            neutral: 0.05,
            mixed: 0.03,
        }))
    }

    async fn check_connectivity(&self) -> Result<()> {
        if self.reachable {
            Ok(())
        } else {
            anyhow::bail!("could not connect")
        }
    }
}

pub fn moderator(scorer: Arc<StubScorer>, config: ModerationConfig) -> MessageModerator {
    let oracle = SentimentOracle::new(scorer, config.failure_policy);
    MessageModerator::new(oracle, config)
}

pub fn lenient() -> ModerationConfig {
    ModerationConfig::default()
}

pub fn strict() -> ModerationConfig {
    ModerationConfig {
        failure_policy: FailurePolicy::Strict,
        ..ModerationConfig::default()
    }
}

pub fn threshold_setting(value: serde_json::Value) -> Setting {
    Setting {
        label: "Toxicity Threshold".to_string(),
        kind: SettingType::Number,
        default: value,
        required: true,
        description: None,
        options: None,
    }
}

pub fn request(message: &str) -> ModerationRequest {
    ModerationRequest {
        message: Some(message.to_string()),
        channel_id: Some("channel-1".to_string()),
        target_url: None,
        settings: vec![threshold_setting(serde_json::json!(-0.5))],
        metadata: None,
    }
}
