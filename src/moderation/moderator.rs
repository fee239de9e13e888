// MessageModerator: one request from arrival to reply.
//
//   Received -> Validated -> Scored -> Decided -> Responded
//                  |           |          |
//                  +-----------+----------+--> Failed (ModerationError)
//
// Validation never touches the network. Scoring is raced against the
// request's TimeBudget. The decision is a strict `score < threshold`.
// Failures come back as a ModerationError; the web layer maps its code to
// an HTTP status.

use reqwest::Url;
use tracing::{info, warn};

use super::budget::{BudgetExceeded, TimeBudget};
use super::delivery::TargetDelivery;
use super::models::{
    now_rfc3339, DeliveryReport, ErrorCode, ModerationError, ModerationRequest,
    ModerationResponse, ResponseMetadata,
};
use super::settings::ResolvedSettings;
use crate::config::{ModerationConfig, SentimentBackend, TimeoutPolicy};
use crate::sentiment::oracle::{OracleError, SentimentOracle};

fn invalid(code: ErrorCode, details: &str) -> ModerationError {
    ModerationError::new(code, "Invalid request", details)
}

/// Error code used for provider-side failures of `backend`.
pub fn provider_error_code(backend: SentimentBackend) -> ErrorCode {
    match backend {
        SentimentBackend::Comprehend => ErrorCode::AwsError,
        SentimentBackend::OpenAi => ErrorCode::ApiError,
    }
}

/// Rewrite applied to flagged messages.
pub fn warning_message(score: f64, original: &str) -> String {
    format!("⚠️ Potentially harmful message detected (sentiment: {score:.2}): {original}")
}

/// Fields that survived validation.
struct Validated {
    message: String,
    channel_id: Option<String>,
    target_url: Option<String>,
    request_id: Option<String>,
}

pub struct MessageModerator {
    oracle: SentimentOracle,
    config: ModerationConfig,
    delivery: Option<TargetDelivery>,
}

impl MessageModerator {
    pub fn new(oracle: SentimentOracle, config: ModerationConfig) -> Self {
        Self {
            oracle,
            config,
            delivery: None,
        }
    }

    /// Enable forwarding of decided messages to the request's target_url.
    pub fn with_delivery(mut self, delivery: TargetDelivery) -> Self {
        self.delivery = Some(delivery);
        self
    }

    pub fn config(&self) -> &ModerationConfig {
        &self.config
    }

    pub fn oracle(&self) -> &SentimentOracle {
        &self.oracle
    }

    /// Start a budget now and process `request` under it.
    pub async fn moderate(
        &self,
        request: ModerationRequest,
    ) -> Result<ModerationResponse, ModerationError> {
        let budget = TimeBudget::start(self.config.time_budget);
        self.process(request, budget).await
    }

    /// Process `request` under an already-running budget (started on arrival).
    pub async fn process(
        &self,
        request: ModerationRequest,
        budget: TimeBudget,
    ) -> Result<ModerationResponse, ModerationError> {
        let valid = self.validate(&request)?;
        let settings = ResolvedSettings::resolve(&request.settings, self.config.default_threshold);

        if budget.check().is_err() {
            return self.timed_out(valid, &settings, &budget);
        }

        let scored = budget
            .race(
                self.oracle
                    .analyze(&valid.message, self.config.detailed_sentiment),
            )
            .await;

        let sentiment = match scored {
            Err(_) => return self.timed_out(valid, &settings, &budget),
            Ok(Err(e)) => return Err(self.oracle_failure(e, &valid)),
            Ok(Ok(sentiment)) => sentiment,
        };

        let flagged = sentiment.score < settings.toxicity_threshold;
        let message = if flagged && settings.add_warning_prefix {
            warning_message(sentiment.score, &valid.message)
        } else {
            valid.message.clone()
        };

        let delivery = match (&self.delivery, valid.target_url.as_deref()) {
            (Some(delivery), Some(target_url)) if self.config.forward_to_target => Some(
                self.deliver(delivery, target_url, valid.channel_id.as_deref(), &message, &budget)
                    .await,
            ),
            _ => None,
        };

        let processing_time = budget.elapsed_ms();
        info!(
            request_id = valid.request_id.as_deref().unwrap_or("-"),
            channel_id = valid.channel_id.as_deref().unwrap_or("-"),
            score = sentiment.score,
            threshold = settings.toxicity_threshold,
            flagged,
            processing_time,
            "Moderated message"
        );

        Ok(ModerationResponse {
            message,
            metadata: ResponseMetadata {
                processed: true,
                sentiment_score: Some(sentiment.score),
                flagged,
                processing_time,
                channel_id: valid.channel_id,
                target_url: valid.target_url,
                timestamp: now_rfc3339(),
                sensitivity_level: settings.sensitivity_level.to_string(),
                detailed_sentiment: sentiment.detailed,
                delivery,
            },
        })
    }

    fn validate(&self, request: &ModerationRequest) -> Result<Validated, ModerationError> {
        let message = match request.message.as_deref() {
            Some(m) if !m.trim().is_empty() => m.to_string(),
            _ => {
                return Err(invalid(
                    ErrorCode::InvalidMessage,
                    "message is required",
                ))
            }
        };

        let channel_id = request
            .channel_id
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string);
        if self.config.require_channel_id && channel_id.is_none() {
            return Err(invalid(
                ErrorCode::InvalidChannel,
                "channel_id is required",
            ));
        }

        let target_url = request
            .target_url
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string);
        match &target_url {
            Some(url) if Url::parse(url).is_err() => {
                return Err(invalid(
                    ErrorCode::InvalidTargetUrl,
                    "target_url must be a valid URL",
                ))
            }
            None if self.config.require_target_url => {
                return Err(invalid(
                    ErrorCode::InvalidTargetUrl,
                    "target_url is required",
                ))
            }
            _ => {}
        }

        Ok(Validated {
            message,
            channel_id,
            target_url,
            request_id: request.metadata.as_ref().and_then(|m| m.request_id()),
        })
    }

    fn timed_out(
        &self,
        valid: Validated,
        settings: &ResolvedSettings,
        budget: &TimeBudget,
    ) -> Result<ModerationResponse, ModerationError> {
        let processing_time = budget.elapsed_ms();
        warn!(
            request_id = valid.request_id.as_deref().unwrap_or("-"),
            processing_time,
            "Time budget exceeded"
        );

        match self.config.timeout_policy {
            TimeoutPolicy::ReturnOriginal => Ok(ModerationResponse {
                message: valid.message,
                metadata: ResponseMetadata {
                    processed: false,
                    sentiment_score: None,
                    flagged: false,
                    processing_time,
                    channel_id: valid.channel_id,
                    target_url: valid.target_url,
                    timestamp: now_rfc3339(),
                    sensitivity_level: settings.sensitivity_level.to_string(),
                    detailed_sentiment: None,
                    delivery: None,
                },
            }),
            TimeoutPolicy::Error => Err(ModerationError::new(
                ErrorCode::TimeoutError,
                "Processing timed out",
                format!(
                    "exceeded the {}ms processing budget after {processing_time}ms",
                    self.config.time_budget.as_millis()
                ),
            )),
        }
    }

    fn oracle_failure(&self, err: OracleError, valid: &Validated) -> ModerationError {
        warn!(
            request_id = valid.request_id.as_deref().unwrap_or("-"),
            error = %err,
            "Sentiment analysis failed"
        );
        ModerationError::new(
            provider_error_code(err.backend()),
            "Sentiment analysis failed",
            err.to_string(),
        )
    }

    async fn deliver(
        &self,
        delivery: &TargetDelivery,
        target_url: &str,
        channel_id: Option<&str>,
        message: &str,
        budget: &TimeBudget,
    ) -> DeliveryReport {
        // No time left means the POST is never sent
        if budget.remaining().is_zero() {
            let details = format!("not sent: {}", BudgetExceeded { limit: budget.limit() });
            warn!(target_url, error = %details, "Delivery to target_url skipped");
            return self.failed_delivery(false, details);
        }

        let details = match budget
            .race(delivery.deliver(target_url, channel_id, message))
            .await
        {
            Ok(Ok(status)) => {
                return DeliveryReport {
                    attempted: true,
                    delivered: true,
                    status: Some(status),
                    error: None,
                }
            }
            Ok(Err(e)) => format!("{e:#}"),
            Err(e) => format!("abandoned in flight: {e}"),
        };

        warn!(target_url, error = %details, "Delivery to target_url failed");
        self.failed_delivery(true, details)
    }

    fn failed_delivery(&self, attempted: bool, details: String) -> DeliveryReport {
        DeliveryReport {
            attempted,
            delivered: false,
            status: None,
            error: Some(ModerationError::new(
                provider_error_code(self.oracle.backend()),
                "Failed to deliver message to target_url",
                details,
            )),
        }
    }
}
