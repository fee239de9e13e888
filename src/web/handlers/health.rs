// GET /health: liveness report, plus provider reachability when enabled.
//
// The provider probe only runs when enabled and the oracle is backed by AWS
// Comprehend. An unreachable provider turns the answer into 503 "degraded".

use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use sysinfo::System;
use tracing::warn;

use crate::config::SentimentBackend;
use crate::moderation::models::now_rfc3339;
use crate::web::AppState;

const PROVIDER_PROBE_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    /// Seconds since the server started
    pub uptime: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory: Option<MemoryUsage>,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aws_status: Option<&'static str>,
}

#[derive(Debug, Serialize)]
pub struct MemoryUsage {
    /// Resident set size in bytes
    pub rss: u64,
    pub virtual_memory: u64,
}

pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let oracle = state.moderator.oracle();

    let probe = state.check_provider_health && oracle.backend() == SentimentBackend::Comprehend;

    let aws_status = if probe {
        let checked = tokio::time::timeout(PROVIDER_PROBE_TIMEOUT, oracle.check_connectivity()).await;
        let reachable = match checked {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                warn!(error = %format!("{e:#}"), "AWS Comprehend connectivity check failed");
                false
            }
            Err(_) => {
                warn!("AWS Comprehend connectivity check timed out");
                false
            }
        };
        Some(if reachable { "connected" } else { "disconnected" })
    } else {
        None
    };

    let degraded = aws_status == Some("disconnected");
    let body = HealthResponse {
        status: if degraded { "degraded" } else { "ok" },
        version: env!("CARGO_PKG_VERSION"),
        uptime: state.started_at.elapsed().as_secs_f64(),
        memory: process_memory(),
        timestamp: now_rfc3339(),
        aws_status,
    };

    let status = if degraded {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };
    (status, Json(body))
}

fn process_memory() -> Option<MemoryUsage> {
    let pid = sysinfo::get_current_pid().ok()?;
    let mut sys = System::new();
    sys.refresh_process(pid);
    sys.process(pid).map(|p| MemoryUsage {
        rss: p.memory(),
        virtual_memory: p.virtual_memory(),
    })
}
