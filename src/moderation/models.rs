// Wire types for the modifier protocol.
//
// Requests deserialize leniently: missing fields become None or empty, and
// validation in the moderator assigns the error code.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::sentiment::traits::DetailedSentiment;

/// Declared type of a setting. Unrecognized type names are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SettingType {
    Number,
    Checkbox,
    Dropdown,
    Text,
    Boolean,
    String,
    Other(String),
}

impl From<String> for SettingType {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "number" => SettingType::Number,
            "checkbox" => SettingType::Checkbox,
            "dropdown" => SettingType::Dropdown,
            "text" => SettingType::Text,
            "boolean" => SettingType::Boolean,
            "string" => SettingType::String,
            _ => SettingType::Other(raw),
        }
    }
}

impl From<SettingType> for String {
    fn from(kind: SettingType) -> Self {
        match kind {
            SettingType::Number => "number".to_string(),
            SettingType::Checkbox => "checkbox".to_string(),
            SettingType::Dropdown => "dropdown".to_string(),
            SettingType::Text => "text".to_string(),
            SettingType::Boolean => "boolean".to_string(),
            SettingType::String => "string".to_string(),
            SettingType::Other(raw) => raw,
        }
    }
}

/// One named configuration entry, supplied by the caller or taken from defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Setting {
    pub label: String,
    #[serde(rename = "type")]
    pub kind: SettingType,
    /// String, number or bool; interpreted by the typed lookup in `settings`
    #[serde(default)]
    pub default: Value,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
}

/// Free-form diagnostic fields sent by the platform. Values are kept as
/// whatever JSON the caller sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestMetadata {
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl RequestMetadata {
    /// `request_id` as text, whether it was sent as a string or a number.
    pub fn request_id(&self) -> Option<String> {
        match self.fields.get("request_id")? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

/// Inbound modifier request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModerationRequest {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub channel_id: Option<String>,
    #[serde(default)]
    pub target_url: Option<String>,
    #[serde(default)]
    pub settings: Vec<Setting>,
    #[serde(default)]
    pub metadata: Option<RequestMetadata>,
}

/// Result of forwarding the decided message to `target_url`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeliveryReport {
    /// False when the budget ran out before the POST was sent
    pub attempted: bool,
    pub delivered: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ModerationError>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponseMetadata {
    /// False when the time budget ran out and the message was passed through untouched
    pub processed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sentiment_score: Option<f64>,
    pub flagged: bool,
    /// Milliseconds since the request arrived
    pub processing_time: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_url: Option<String>,
    pub timestamp: String,
    pub sensitivity_level: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detailed_sentiment: Option<DetailedSentiment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery: Option<DeliveryReport>,
}

/// Outbound modifier response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModerationResponse {
    pub message: String,
    pub metadata: ResponseMetadata,
}

/// Enumerated error kinds reported to the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    InvalidMessage,
    InvalidChannel,
    InvalidTargetUrl,
    TimeoutError,
    ProcessingError,
    ApiError,
    AwsError,
}

/// Structured error body. Every failure path produces one of these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModerationError {
    pub error: String,
    pub code: ErrorCode,
    pub details: String,
    pub timestamp: String,
}

impl ModerationError {
    pub fn new(code: ErrorCode, error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code,
            details: details.into(),
            timestamp: now_rfc3339(),
        }
    }
}

pub(crate) fn now_rfc3339() -> String {
    Utc::now().to_rfc3339()
}
