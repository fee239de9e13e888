// OpenAI chat-completion sentiment scorer.
//
// Asks the model to answer with a bare number between -1 and 1 and parses
// the reply. Anything that does not parse into that range is reported as an
// InvalidScore so the oracle can decide between neutral and a hard failure.
//
// API docs: https://platform.openai.com/docs/api-reference/chat/create

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::traits::{parse_score, preview, SentimentScorer};
use crate::config::SentimentBackend;

const SYSTEM_PROMPT: &str = "You are a sentiment analysis assistant. Respond with a single number \
between -1 (very negative) to 1 (very positive).";

/// OpenAI chat-completion scorer.
pub struct OpenAiScorer {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiScorer {
    /// Create a scorer against `base_url` (e.g. `https://api.openai.com/v1`).
    pub fn new(base_url: &str, api_key: String, model: String) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("telex-sentiment/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model,
        })
    }
}

#[async_trait]
impl SentimentScorer for OpenAiScorer {
    fn backend(&self) -> SentimentBackend {
        SentimentBackend::OpenAi
    }

    async fn score_text(&self, text: &str) -> Result<f64> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: format!("Analyze the sentiment of this message: \"{text}\""),
                },
            ],
            max_tokens: 10,
            temperature: 0.3,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .context("Failed to call OpenAI API")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("OpenAI API returned {}: {}", status, body);
        }

        let completion: ChatResponse = response
            .json()
            .await
            .context("Failed to parse OpenAI API response")?;

        let reply = completion
            .choices
            .first()
            .and_then(|c| c.message.content.as_deref())
            .unwrap_or("")
            .trim()
            .to_string();

        let score = parse_score(&reply)?;

        debug!(
            score = score,
            model = %self.model,
            text_preview = preview(text),
            "Scored text"
        );

        Ok(score)
    }

    async fn check_connectivity(&self) -> Result<()> {
        let response = self
            .client
            .get(format!("{}/models", self.base_url))
            .bearer_auth(&self.api_key)
            .send()
            .await
            .context("Failed to reach OpenAI API")?;

        if !response.status().is_success() {
            anyhow::bail!("OpenAI API returned {}", response.status());
        }
        Ok(())
    }
}

// --- OpenAI request/response types ---

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f64,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ReplyMessage,
}

#[derive(Deserialize)]
struct ReplyMessage {
    content: Option<String>,
}
