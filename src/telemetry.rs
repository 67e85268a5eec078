use std::time::{Duration, SystemTime, UNIX_EPOCH};

use reqwest::{Client, Url};
use serde::Serialize;

use crate::config::Config;

pub const TELEMETRY_ENDPOINT_ENV: &str = "M365_TELEMETRY_ENDPOINT";

/// Forwards command outcomes to a collector
#[derive(Debug, Clone)]
pub struct TelemetryEmitter {
    client: Client,
    endpoint: Url,
}

impl TelemetryEmitter {
    /// Emitter for the configured endpoint, unless telemetry is disabled
    pub fn from_env(config: &Config) -> Option<Self> {
        if config.settings.disable_telemetry {
            return None;
        }
        let endpoint = std::env::var(TELEMETRY_ENDPOINT_ENV).ok()?;
        Self::new(endpoint.parse().ok()?)
    }

    pub fn new(endpoint: Url) -> Option<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(2))
            .build()
            .ok()?;
        Some(Self { client, endpoint })
    }

    pub async fn emit(&self, event: &TelemetryEvent<'_>) {
        if let Err(err) = self
            .client
            .post(self.endpoint.clone())
            .json(event)
            .send()
            .await
        {
            tracing::debug!(error = %err, "telemetry emit failed");
        }
    }
}

/// One command invocation
#[derive(Debug, Serialize)]
pub struct TelemetryEvent<'a> {
    pub command: &'a str,
    /// Names of the options used, never their values
    pub options: Vec<&'a str>,
    pub outcome: &'a str,
    pub exit_code: i32,
    pub session_id: &'a str,
    pub timestamp_ms: u64,
}

pub fn timestamp_now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}
