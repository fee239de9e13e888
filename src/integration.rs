// Integration descriptor served at /integration.json.
//
// The platform reads this once when the integration is installed: app
// metadata, the settings it should render and send back with every request,
// and where results are delivered. Built once at startup, immutable after.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::moderation::models::Setting;
use crate::moderation::settings::default_settings;

pub const DEFAULT_APP_URL: &str = "https://telex-sentiment-analysis-modifier.onrender.com";
pub const DEFAULT_TARGET_URL: &str =
    "https://ping.telex.im/v1/webhooks/01951d72-fb32-74b0-9c9f-ed1347b1513b";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegrationDescriptor {
    pub data: IntegrationData,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegrationData {
    pub date: Dates,
    pub descriptions: Descriptions,
    pub integration_category: String,
    pub integration_type: String,
    pub is_active: bool,
    pub output: Vec<OutputFlag>,
    pub key_features: Vec<String>,
    pub permissions: BTreeMap<String, Permission>,
    pub settings: Vec<Setting>,
    pub target_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dates {
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Descriptions {
    pub app_name: String,
    pub app_description: String,
    pub app_logo: String,
    pub app_url: String,
    pub background_color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputFlag {
    pub label: String,
    pub value: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Permission {
    pub always_online: bool,
    pub display_name: String,
}

impl IntegrationDescriptor {
    /// Descriptor with `app_url` / `target_url` taken from config when set.
    pub fn from_config(config: &Config) -> Self {
        Self::build(config.app_url.as_deref(), config.integration_target_url.as_deref())
    }

    pub fn build(app_url: Option<&str>, target_url: Option<&str>) -> Self {
        let mut permissions = BTreeMap::new();
        permissions.insert(
            "monitoring_user".to_string(),
            Permission {
                always_online: true,
                display_name: "Sentiment Monitor".to_string(),
            },
        );

        Self {
            data: IntegrationData {
                date: Dates {
                    created_at: "2024-02-17".to_string(),
                    updated_at: "2024-02-21".to_string(),
                },
                descriptions: Descriptions {
                    app_name: "Message Sentiment Analyzer".to_string(),
                    app_description: "Analyzes message sentiment using advanced NLP and flags \
                                      potentially harmful content."
                        .to_string(),
                    app_logo: "https://i.ibb.co/4ZpTNTv3/Telex-Sentiment-Analyzer.png".to_string(),
                    app_url: app_url.unwrap_or(DEFAULT_APP_URL).to_string(),
                    background_color: "#4A90E2".to_string(),
                },
                integration_category: "Communication & Collaboration".to_string(),
                integration_type: "modifier".to_string(),
                is_active: true,
                output: vec![
                    OutputFlag {
                        label: "sentiment_analysis".to_string(),
                        value: true,
                    },
                    OutputFlag {
                        label: "toxicity_detection".to_string(),
                        value: true,
                    },
                ],
                key_features: [
                    "Real-time sentiment analysis of messages",
                    "Toxicity detection and warning system",
                    "Customizable sensitivity thresholds",
                    "Multi-channel support",
                ]
                .iter()
                .map(|s| s.to_string())
                .collect(),
                permissions,
                settings: default_settings().to_vec(),
                target_url: target_url.unwrap_or(DEFAULT_TARGET_URL).to_string(),
            },
        }
    }
}
