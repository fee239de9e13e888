// Provider tests against a local wiremock server.
//
// Exercises the real OpenAI and Comprehend scorers plus target_url delivery
// over HTTP, without touching the actual services.

mod common;

use std::sync::Arc;

use common::{lenient, request};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use telex_sentiment::config::{AwsCredentials, FailurePolicy, ModerationConfig};
use telex_sentiment::moderation::delivery::TargetDelivery;
use telex_sentiment::moderation::models::{ErrorCode, ModerationRequest};
use telex_sentiment::moderation::MessageModerator;
use telex_sentiment::sentiment::comprehend::ComprehendScorer;
use telex_sentiment::sentiment::openai::OpenAiScorer;
use telex_sentiment::sentiment::oracle::{OracleError, SentimentOracle};
use telex_sentiment::sentiment::traits::{SentimentLabel, SentimentScorer};

fn completion(content: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "choices": [
            {"index": 0, "message": {"role": "assistant", "content": content}, "finish_reason": "stop"}
        ]
    })
}

fn openai(server: &MockServer) -> OpenAiScorer {
    OpenAiScorer::new(&server.uri(), "test-key".into(), "gpt-3.5-turbo".into()).unwrap()
}

fn comprehend(server: &MockServer) -> ComprehendScorer {
    ComprehendScorer::new(
        "us-east-1",
        AwsCredentials {
            access_key_id: "AKIDEXAMPLE".into(),
            secret_access_key: "secret".into(),
            session_token: None,
        },
        Some(&server.uri()),
    )
    .unwrap()
}

fn detect_sentiment(label: &str, positive: f64, negative: f64) -> serde_json::Value {
    json!({
        "Sentiment": label,
        "SentimentScore": {"Positive": positive, "Negative": negative, "Neutral": 0.05, "Mixed": 0.01}
    })
}

// ============================================================
// OpenAI
// ============================================================

#[tokio::test]
async fn openai_parses_bare_number() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_partial_json(json!({"model": "gpt-3.5-turbo", "max_tokens": 10})))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(" -0.75\n")))
        .expect(1)
        .mount(&server)
        .await;

    let score = openai(&server).score_text("I hate Mondays").await.unwrap();
    assert_eq!(score, -0.75);
}

#[tokio::test]
async fn openai_out_of_range_reply_is_neutral_when_lenient() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("7")))
        .mount(&server)
        .await;

    let oracle = SentimentOracle::new(Arc::new(openai(&server)), FailurePolicy::Lenient);
    assert_eq!(oracle.score("hello").await.unwrap().score, 0.0);

    let strict = SentimentOracle::new(Arc::new(openai(&server)), FailurePolicy::Strict);
    assert!(matches!(
        strict.score("hello").await,
        Err(OracleError::InvalidScore { .. })
    ));
}

#[tokio::test]
async fn openai_http_error_is_reported_with_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
        .mount(&server)
        .await;

    let err = openai(&server).score_text("hello").await.unwrap_err();
    let message = format!("{err:#}");
    assert!(message.contains("429"), "{message}");
    assert!(message.contains("rate limited"), "{message}");
}

// ============================================================
// Comprehend
// ============================================================

#[tokio::test]
async fn comprehend_negative_label_negates_weight() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/"))
        .and(header("x-amz-target", "Comprehend_20171127.DetectSentiment"))
        .and(header("content-type", "application/x-amz-json-1.1"))
        .and(header_exists("x-amz-date"))
        .and(header_exists("authorization"))
        .and(body_partial_json(json!({"LanguageCode": "en", "Text": "awful service"})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(detect_sentiment("NEGATIVE", 0.01, 0.93)),
        )
        .mount(&server)
        .await;

    let score = comprehend(&server).score_text("awful service").await.unwrap();
    assert_eq!(score, -0.93);
}

#[tokio::test]
async fn comprehend_mixed_label_uses_half_spread() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(detect_sentiment("MIXED", 0.4, 0.2)),
        )
        .mount(&server)
        .await;

    let score = comprehend(&server).score_text("good and bad").await.unwrap();
    assert!((score - 0.1).abs() < 1e-9);
}

#[tokio::test]
async fn comprehend_detailed_runs_alongside_score() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(detect_sentiment("POSITIVE", 0.88, 0.02)),
        )
        .expect(2)
        .mount(&server)
        .await;

    let oracle = SentimentOracle::new(Arc::new(comprehend(&server)), FailurePolicy::Strict);
    let result = oracle.analyze("lovely", true).await.unwrap();
    assert_eq!(result.score, 0.88);
    let detailed = result.detailed.unwrap();
    assert_eq!(detailed.sentiment, SentimentLabel::Positive);
    assert_eq!(detailed.neutral, 0.05);
}

#[tokio::test]
async fn comprehend_access_denied_is_aws_error_when_strict() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "__type": "UnrecognizedClientException",
            "message": "The security token included in the request is invalid."
        })))
        .mount(&server)
        .await;

    let config = ModerationConfig {
        failure_policy: FailurePolicy::Strict,
        ..lenient()
    };
    let oracle = SentimentOracle::new(Arc::new(comprehend(&server)), config.failure_policy);
    let failure = MessageModerator::new(oracle, config)
        .moderate(request("hello"))
        .await
        .unwrap_err();
    assert_eq!(failure.code, ErrorCode::AwsError);
    assert!(failure.details.contains("UnrecognizedClientException"));
}

#[tokio::test]
async fn comprehend_connectivity_probe_fails_on_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    assert!(comprehend(&server).check_connectivity().await.is_err());
}

// ============================================================
// Delivery to target_url
// ============================================================

fn forwarding_moderator(openai_server: &MockServer) -> MessageModerator {
    let config = ModerationConfig {
        forward_to_target: true,
        ..lenient()
    };
    let oracle = SentimentOracle::new(Arc::new(openai(openai_server)), config.failure_policy);
    MessageModerator::new(oracle, config).with_delivery(TargetDelivery::new().unwrap())
}

#[tokio::test]
async fn decided_message_is_delivered_to_target() {
    let provider = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("-0.9")))
        .mount(&provider)
        .await;

    let target = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/webhook"))
        .and(body_partial_json(json!({
            "channel_id": "channel-1",
            "message": "⚠️ Potentially harmful message detected (sentiment: -0.90): get lost"
        })))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&target)
        .await;

    let req = ModerationRequest {
        target_url: Some(format!("{}/webhook", target.uri())),
        ..request("get lost")
    };
    let response = forwarding_moderator(&provider).moderate(req).await.unwrap();
    assert_eq!(
        response.metadata.target_url,
        Some(format!("{}/webhook", target.uri()))
    );
    let delivery = response.metadata.delivery.unwrap();
    assert!(delivery.attempted);
    assert!(delivery.delivered);
    assert_eq!(delivery.status, Some(202));
}

#[tokio::test]
async fn failed_delivery_is_reported_but_response_still_sent() {
    let provider = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("0.6")))
        .mount(&provider)
        .await;

    let target = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("down"))
        .mount(&target)
        .await;

    let req = ModerationRequest {
        target_url: Some(target.uri()),
        ..request("nice work")
    };
    let response = forwarding_moderator(&provider).moderate(req).await.unwrap();
    assert_eq!(response.message, "nice work");
    let delivery = response.metadata.delivery.unwrap();
    assert!(delivery.attempted);
    assert!(!delivery.delivered);
    let error = delivery.error.unwrap();
    assert_eq!(error.code, ErrorCode::ApiError);
    assert!(error.details.contains("500"));
}
