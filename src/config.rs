use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

/// Default toxicity threshold when neither the request nor the environment sets one.
pub const DEFAULT_TOXICITY_THRESHOLD: f64 = -0.5;

/// Processing budget: a 1000 ms platform deadline minus a 100 ms safety margin.
pub const DEFAULT_TIME_BUDGET_MS: u64 = 900;

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_AWS_REGION: &str = "us-east-1";

/// Which sentiment provider backs the oracle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SentimentBackend {
    /// OpenAI chat completion asked for a bare number (default)
    OpenAi,
    /// AWS Comprehend DetectSentiment
    Comprehend,
}

impl SentimentBackend {
    pub fn name(self) -> &'static str {
        match self {
            SentimentBackend::OpenAi => "openai",
            SentimentBackend::Comprehend => "comprehend",
        }
    }
}

/// What the oracle does when the provider fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Log a warning and score the text as neutral (0).
    #[default]
    Lenient,
    /// Surface a typed failure that becomes an API_ERROR / AWS_ERROR response.
    Strict,
}

/// What the moderator does when the time budget runs out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeoutPolicy {
    /// Answer 200 with the unmodified message so the platform's pipeline keeps moving.
    #[default]
    ReturnOriginal,
    /// Answer 408 with a TIMEOUT_ERROR.
    Error,
}

impl FromStr for FailurePolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lenient" => Ok(FailurePolicy::Lenient),
            "strict" => Ok(FailurePolicy::Strict),
            other => anyhow::bail!("unknown FAILURE_POLICY '{other}' (expected lenient or strict)"),
        }
    }
}

impl FromStr for TimeoutPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "original" | "return_original" => Ok(TimeoutPolicy::ReturnOriginal),
            "error" => Ok(TimeoutPolicy::Error),
            other => anyhow::bail!("unknown TIMEOUT_POLICY '{other}' (expected original or error)"),
        }
    }
}

/// AWS credentials for signing Comprehend requests.
#[derive(Debug, Clone, Default)]
pub struct AwsCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

/// Request-handling knobs shared by every moderation call.
#[derive(Debug, Clone)]
pub struct ModerationConfig {
    pub default_threshold: f64,
    pub failure_policy: FailurePolicy,
    pub timeout_policy: TimeoutPolicy,
    pub time_budget: Duration,
    pub require_channel_id: bool,
    pub require_target_url: bool,
    pub forward_to_target: bool,
    pub detailed_sentiment: bool,
}

impl Default for ModerationConfig {
    fn default() -> Self {
        Self {
            default_threshold: DEFAULT_TOXICITY_THRESHOLD,
            failure_policy: FailurePolicy::Lenient,
            timeout_policy: TimeoutPolicy::ReturnOriginal,
            time_budget: Duration::from_millis(DEFAULT_TIME_BUDGET_MS),
            require_channel_id: true,
            require_target_url: false,
            forward_to_target: false,
            detailed_sentiment: false,
        }
    }
}

/// Central configuration loaded from environment variables.
///
/// All secrets come from env vars (never hardcoded). The .env file
/// is loaded at startup via dotenvy before this runs.
#[derive(Debug, Clone)]
pub struct Config {
    pub backend: SentimentBackend,
    pub openai_api_key: String,
    pub openai_model: String,
    pub openai_base_url: String,
    pub aws_credentials: AwsCredentials,
    pub aws_region: String,
    /// Overrides the regional Comprehend endpoint (local stacks, tests)
    pub comprehend_endpoint: Option<String>,
    pub port: u16,
    pub moderation: ModerationConfig,
    /// Probe the provider from /health (only meaningful for Comprehend)
    pub check_provider_health: bool,
    pub app_url: Option<String>,
    pub integration_target_url: Option<String>,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Nothing is required here; call `require_scorer` before building a
    /// backend so missing credentials are reported up front.
    pub fn load() -> Result<Self> {
        let backend = match env::var("SENTIMENT_BACKEND").as_deref() {
            Ok("comprehend") | Ok("aws") => SentimentBackend::Comprehend,
            // "openai" or unset both default to OpenAI
            _ => SentimentBackend::OpenAi,
        };

        let default_threshold = match env::var("TOXICITY_THRESHOLD") {
            Ok(raw) => {
                let value: f64 = raw
                    .trim()
                    .parse()
                    .with_context(|| format!("TOXICITY_THRESHOLD is not a number: '{raw}'"))?;
                if !(-1.0..=1.0).contains(&value) {
                    anyhow::bail!("TOXICITY_THRESHOLD must be between -1 and 1, got {value}");
                }
                value
            }
            Err(_) => DEFAULT_TOXICITY_THRESHOLD,
        };

        let time_budget_ms = match env::var("TIME_BUDGET_MS") {
            Ok(raw) => raw
                .trim()
                .parse::<u64>()
                .with_context(|| format!("TIME_BUDGET_MS is not a whole number: '{raw}'"))?,
            Err(_) => DEFAULT_TIME_BUDGET_MS,
        };

        let port = match env::var("PORT") {
            Ok(raw) => raw
                .trim()
                .parse::<u16>()
                .with_context(|| format!("PORT is not a valid port: '{raw}'"))?,
            Err(_) => 3000,
        };

        let moderation = ModerationConfig {
            default_threshold,
            failure_policy: env_parse("FAILURE_POLICY")?.unwrap_or_default(),
            timeout_policy: env_parse("TIMEOUT_POLICY")?.unwrap_or_default(),
            time_budget: Duration::from_millis(time_budget_ms),
            require_channel_id: env_flag("REQUIRE_CHANNEL_ID", true),
            require_target_url: env_flag("REQUIRE_TARGET_URL", false),
            forward_to_target: env_flag("FORWARD_TO_TARGET", false),
            detailed_sentiment: env_flag("DETAILED_SENTIMENT", false),
        };

        Ok(Self {
            backend,
            openai_api_key: env::var("OPENAI_API_KEY").unwrap_or_default(),
            openai_model: env::var("OPENAI_MODEL")
                .unwrap_or_else(|_| DEFAULT_OPENAI_MODEL.to_string()),
            openai_base_url: env::var("OPENAI_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_OPENAI_BASE_URL.to_string()),
            aws_credentials: AwsCredentials {
                access_key_id: env::var("AWS_ACCESS_KEY_ID").unwrap_or_default(),
                secret_access_key: env::var("AWS_SECRET_ACCESS_KEY").unwrap_or_default(),
                session_token: env::var("AWS_SESSION_TOKEN").ok().filter(|t| !t.is_empty()),
            },
            aws_region: env::var("AWS_REGION").unwrap_or_else(|_| DEFAULT_AWS_REGION.to_string()),
            comprehend_endpoint: env::var("COMPREHEND_ENDPOINT").ok(),
            port,
            moderation,
            check_provider_health: env_flag("CHECK_PROVIDER_HEALTH", false),
            app_url: env::var("APP_URL").ok(),
            integration_target_url: env::var("TELEX_TARGET_URL").ok(),
        })
    }

    /// Check that the OpenAI API key is configured.
    pub fn require_openai(&self) -> Result<()> {
        if self.openai_api_key.is_empty() {
            anyhow::bail!(
                "OPENAI_API_KEY not set. Add it to your .env file,\n\
                 or set SENTIMENT_BACKEND=comprehend to use AWS Comprehend instead."
            );
        }
        Ok(())
    }

    /// Check that AWS credentials are configured.
    pub fn require_aws(&self) -> Result<()> {
        if self.aws_credentials.access_key_id.is_empty()
            || self.aws_credentials.secret_access_key.is_empty()
        {
            anyhow::bail!(
                "AWS_ACCESS_KEY_ID and AWS_SECRET_ACCESS_KEY must be set for the Comprehend backend.\n\
                 Add them to your .env file."
            );
        }
        Ok(())
    }

    /// Validate that the chosen backend has what it needs.
    pub fn require_scorer(&self) -> Result<()> {
        match self.backend {
            SentimentBackend::OpenAi => self.require_openai(),
            SentimentBackend::Comprehend => self.require_aws(),
        }
    }
}

/// Parse an optional env var through `FromStr`, failing loudly on bad values.
fn env_parse<T: FromStr<Err = anyhow::Error>>(key: &str) -> Result<Option<T>> {
    match env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .parse()
            .map(Some)
            .with_context(|| format!("invalid value for {key}")),
        _ => Ok(None),
    }
}

/// Boolean env var: "1", "true", "yes", "on" are truthy; anything else falsy; unset uses `default`.
fn env_flag(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(raw) => matches!(
            raw.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        ),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_policy_parses_case_insensitively() {
        assert_eq!("Strict".parse::<FailurePolicy>().unwrap(), FailurePolicy::Strict);
        assert_eq!(" lenient ".parse::<FailurePolicy>().unwrap(), FailurePolicy::Lenient);
        assert!("panic".parse::<FailurePolicy>().is_err());
    }

    #[test]
    fn timeout_policy_accepts_both_spellings() {
        assert_eq!(
            "original".parse::<TimeoutPolicy>().unwrap(),
            TimeoutPolicy::ReturnOriginal
        );
        assert_eq!(
            "return_original".parse::<TimeoutPolicy>().unwrap(),
            TimeoutPolicy::ReturnOriginal
        );
        assert_eq!("error".parse::<TimeoutPolicy>().unwrap(), TimeoutPolicy::Error);
    }

    #[test]
    fn moderation_defaults_match_platform_budget() {
        let config = ModerationConfig::default();
        assert_eq!(config.default_threshold, -0.5);
        assert_eq!(config.time_budget, Duration::from_millis(900));
        assert_eq!(config.failure_policy, FailurePolicy::Lenient);
        assert_eq!(config.timeout_policy, TimeoutPolicy::ReturnOriginal);
        assert!(config.require_channel_id);
        assert!(!config.require_target_url);
    }

    #[test]
    fn require_scorer_reports_missing_openai_key() {
        let config = Config {
            backend: SentimentBackend::OpenAi,
            openai_api_key: String::new(),
            openai_model: DEFAULT_OPENAI_MODEL.to_string(),
            openai_base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            aws_credentials: AwsCredentials::default(),
            aws_region: DEFAULT_AWS_REGION.to_string(),
            comprehend_endpoint: None,
            port: 3000,
            moderation: ModerationConfig::default(),
            check_provider_health: false,
            app_url: None,
            integration_target_url: None,
        };
        let err = config.require_scorer().unwrap_err();
        assert!(err.to_string().contains("OPENAI_API_KEY"));

        let aws = Config {
            backend: SentimentBackend::Comprehend,
            ..config
        };
        assert!(aws.require_scorer().unwrap_err().to_string().contains("AWS_ACCESS_KEY_ID"));
    }
}
