// Typed lookup over the caller-supplied settings list.
//
// Settings arrive as label/value pairs with loosely typed defaults ("-0.5",
// -0.5, "Yes", true). Each well-known setting has a SettingId; values are
// parsed and validated here and fall back to defaults when absent or bad.

use std::fmt;
use std::sync::OnceLock;

use serde_json::Value;
use tracing::warn;

use super::models::{Setting, SettingType};
use crate::config::DEFAULT_TOXICITY_THRESHOLD;

/// Well-known settings understood by the moderator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingId {
    ToxicityThreshold,
    AddWarningPrefix,
    SensitivityLevel,
}

impl SettingId {
    /// The label the platform uses for this setting.
    pub fn label(self) -> &'static str {
        match self {
            SettingId::ToxicityThreshold => "Toxicity Threshold",
            SettingId::AddWarningPrefix => "Add Warning Prefix",
            SettingId::SensitivityLevel => "Sensitivity Level",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SensitivityLevel {
    Low,
    #[default]
    Medium,
    High,
}

impl SensitivityLevel {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "low" => Some(SensitivityLevel::Low),
            "medium" => Some(SensitivityLevel::Medium),
            "high" => Some(SensitivityLevel::High),
            _ => None,
        }
    }
}

impl fmt::Display for SensitivityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SensitivityLevel::Low => "Low",
            SensitivityLevel::Medium => "Medium",
            SensitivityLevel::High => "High",
        };
        f.write_str(s)
    }
}

/// The settings a single request resolves to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedSettings {
    pub toxicity_threshold: f64,
    pub add_warning_prefix: bool,
    pub sensitivity_level: SensitivityLevel,
}

impl ResolvedSettings {
    /// Resolve against the request's list, using `default_threshold` when the
    /// threshold is absent or unusable.
    pub fn resolve(settings: &[Setting], default_threshold: f64) -> Self {
        let toxicity_threshold = match find(settings, SettingId::ToxicityThreshold) {
            Some(setting) => match as_threshold(&setting.default) {
                Some(t) => t,
                None => {
                    warn!(value = %setting.default, "Ignoring invalid toxicity threshold");
                    default_threshold
                }
            },
            None => default_threshold,
        };

        let add_warning_prefix = find(settings, SettingId::AddWarningPrefix)
            .and_then(|s| as_flag(&s.default))
            .unwrap_or(true);

        let sensitivity_level = find(settings, SettingId::SensitivityLevel)
            .and_then(|s| s.default.as_str().and_then(SensitivityLevel::parse))
            .unwrap_or_default();

        Self {
            toxicity_threshold,
            add_warning_prefix,
            sensitivity_level,
        }
    }
}

/// First setting carrying the well-known label.
pub fn find(settings: &[Setting], id: SettingId) -> Option<&Setting> {
    settings.iter().find(|s| s.label == id.label())
}

/// Process-wide default settings, also advertised in the integration descriptor.
pub fn default_settings() -> &'static [Setting] {
    static DEFAULTS: OnceLock<Vec<Setting>> = OnceLock::new();
    DEFAULTS.get_or_init(|| {
        vec![
            Setting {
                label: SettingId::ToxicityThreshold.label().to_string(),
                kind: SettingType::Number,
                default: Value::String(DEFAULT_TOXICITY_THRESHOLD.to_string()),
                required: true,
                description: Some("Threshold for marking messages as potentially harmful".into()),
                options: None,
            },
            Setting {
                label: SettingId::AddWarningPrefix.label().to_string(),
                kind: SettingType::Checkbox,
                default: Value::String("Yes".into()),
                required: true,
                description: Some("Prepend warning symbol to toxic messages".into()),
                options: None,
            },
            Setting {
                label: SettingId::SensitivityLevel.label().to_string(),
                kind: SettingType::Dropdown,
                default: Value::String("Medium".into()),
                required: true,
                description: Some("Adjust overall sensitivity of sentiment detection".into()),
                options: Some(vec!["Low".into(), "Medium".into(), "High".into()]),
            },
        ]
    })
}

fn as_threshold(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    (parsed.is_finite() && (-1.0..=1.0).contains(&parsed)).then_some(parsed)
}

fn as_flag(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "yes" | "true" | "on" | "1" => Some(true),
            "no" | "false" | "off" | "0" => Some(false),
            _ => None,
        },
        Value::Number(n) => n.as_f64().map(|v| v != 0.0),
        _ => None,
    }
}
