// Out-of-band delivery of the decided message to the caller's target_url.
//
// The platform accepts either 200 or 202. Anything else is a failed delivery
// that gets logged and reported, never a reason to withhold the reply.

use anyhow::{Context, Result};
use reqwest::{Client, StatusCode};
use serde::Serialize;
use tracing::debug;

#[derive(Serialize)]
struct DeliveryPayload<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    channel_id: Option<&'a str>,
    message: &'a str,
}

/// POSTs `{channel_id, message}` to a webhook.
#[derive(Clone)]
pub struct TargetDelivery {
    client: Client,
}

impl TargetDelivery {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("telex-sentiment/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client })
    }

    /// Deliver `message`. Returns the HTTP status on success (200 or 202).
    pub async fn deliver(
        &self,
        target_url: &str,
        channel_id: Option<&str>,
        message: &str,
    ) -> Result<u16> {
        let response = self
            .client
            .post(target_url)
            .json(&DeliveryPayload {
                channel_id,
                message,
            })
            .send()
            .await
            .with_context(|| format!("Failed to deliver message to {target_url}"))?;

        let status = response.status();
        if status != StatusCode::OK && status != StatusCode::ACCEPTED {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("target_url returned {}: {}", status, body);
        }

        debug!(status = status.as_u16(), target_url, "Delivered message");
        Ok(status.as_u16())
    }
}
