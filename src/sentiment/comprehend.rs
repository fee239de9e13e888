// AWS Comprehend implementation.
//
// DetectSentiment returns a label (POSITIVE/NEGATIVE/NEUTRAL/MIXED) and four
// confidence weights. The label picks the sign and the weights give the
// magnitude; see DetailedSentiment::derived_score.
//
// Requests use the JSON 1.1 protocol, signed with SigV4.
// API docs: https://docs.aws.amazon.com/comprehend/latest/APIReference/API_DetectSentiment.html

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::sigv4::{sign_post, SigningParams};
use super::traits::{preview, DetailedSentiment, SentimentLabel, SentimentScorer};
use crate::config::{AwsCredentials, SentimentBackend};

const CONTENT_TYPE: &str = "application/x-amz-json-1.1";
const DETECT_SENTIMENT_TARGET: &str = "Comprehend_20171127.DetectSentiment";
const SERVICE: &str = "comprehend";

/// AWS Comprehend sentiment scorer.
pub struct ComprehendScorer {
    client: Client,
    endpoint: Url,
    /// Host (and port, if any) as signed in the canonical request
    host: String,
    region: String,
    credentials: AwsCredentials,
}

impl ComprehendScorer {
    /// Create a scorer for `region`. `endpoint` overrides the regional
    /// `https://comprehend.{region}.amazonaws.com` URL.
    pub fn new(region: &str, credentials: AwsCredentials, endpoint: Option<&str>) -> Result<Self> {
        let raw = match endpoint {
            Some(e) => e.to_string(),
            None => format!("https://comprehend.{region}.amazonaws.com"),
        };
        let endpoint =
            Url::parse(&raw).with_context(|| format!("Invalid Comprehend endpoint: {raw}"))?;
        let host = match (endpoint.host_str(), endpoint.port()) {
            (Some(h), Some(p)) => format!("{h}:{p}"),
            (Some(h), None) => h.to_string(),
            (None, _) => anyhow::bail!("Comprehend endpoint has no host: {raw}"),
        };

        let client = Client::builder()
            .user_agent(concat!("telex-sentiment/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            endpoint,
            host,
            region: region.to_string(),
            credentials,
        })
    }

    /// One signed DetectSentiment call.
    async fn detect_sentiment(&self, text: &str) -> Result<DetailedSentiment> {
        let body = serde_json::to_vec(&DetectSentimentRequest {
            text,
            language_code: "en",
        })?;

        let signed = sign_post(
            &SigningParams {
                credentials: &self.credentials,
                region: &self.region,
                service: SERVICE,
                host: &self.host,
                content_type: CONTENT_TYPE,
                target: DETECT_SENTIMENT_TARGET,
                now: Utc::now(),
            },
            &body,
        )?;

        let mut request = self
            .client
            .post(self.endpoint.clone())
            .header("content-type", CONTENT_TYPE)
            .header("x-amz-target", DETECT_SENTIMENT_TARGET)
            .header("x-amz-date", &signed.amz_date)
            .header("authorization", &signed.authorization);
        if let Some(token) = &signed.security_token {
            request = request.header("x-amz-security-token", token);
        }

        let response = request
            .body(body)
            .send()
            .await
            .context("Failed to call AWS Comprehend")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("AWS Comprehend returned {}: {}", status, body);
        }

        let result: DetectSentimentResponse = response
            .json()
            .await
            .context("Failed to parse AWS Comprehend response")?;

        let detailed = DetailedSentiment {
            sentiment: result.sentiment,
            positive: result.sentiment_score.positive,
            negative: result.sentiment_score.negative,
            neutral: result.sentiment_score.neutral,
            mixed: result.sentiment_score.mixed,
        };

        if !detailed.weights_valid() {
            anyhow::bail!("AWS Comprehend returned weights outside [0, 1]: {detailed:?}");
        }

        Ok(detailed)
    }
}

#[async_trait]
impl SentimentScorer for ComprehendScorer {
    fn backend(&self) -> SentimentBackend {
        SentimentBackend::Comprehend
    }

    async fn score_text(&self, text: &str) -> Result<f64> {
        let detailed = self.detect_sentiment(text).await?;
        let score = detailed.derived_score();

        debug!(
            score = score,
            sentiment = ?detailed.sentiment,
            text_preview = preview(text),
            "Scored text"
        );

        Ok(score)
    }

    async fn detailed(&self, text: &str) -> Result<Option<DetailedSentiment>> {
        self.detect_sentiment(text).await.map(Some)
    }

    async fn check_connectivity(&self) -> Result<()> {
        self.detect_sentiment("health check").await.map(|_| ())
    }
}

// --- Comprehend request/response types ---

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct DetectSentimentRequest<'a> {
    text: &'a str,
    language_code: &'static str,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DetectSentimentResponse {
    sentiment: SentimentLabel,
    sentiment_score: SentimentScore,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SentimentScore {
    positive: f64,
    negative: f64,
    neutral: f64,
    mixed: f64,
}
