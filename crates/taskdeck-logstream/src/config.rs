//! Stream client configuration.

use crate::error::{ClientError, Result};
use crate::protocol::TaskId;
use std::time::Duration;
use url::Url;

pub const DEFAULT_RECONNECT_DELAY_MS: u64 = 3_000;
pub const DEFAULT_MAX_RECONNECT_ATTEMPTS: u32 = 10;
pub const DEFAULT_HEARTBEAT_INTERVAL_MS: u64 = 30_000;
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_MAX_RENDERED_RECORDS: usize = 1_000;
pub const DEFAULT_HISTORY_THRESHOLD_PX: f32 = 100.0;

/// Tunables for one log stream client.
///
/// The defaults match the backend's operator console: a fixed 3 s retry delay
/// capped at 10 attempts, a 30 s heartbeat probe, and a 1000-record render
/// window.
#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// Backend base endpoint, e.g. `http://127.0.0.1:8000` or `wss://ops.example`.
    pub endpoint: String,
    pub reconnect_delay_ms: u64,
    pub max_reconnect_attempts: u32,
    pub heartbeat_interval_ms: u64,
    pub connect_timeout_ms: u64,
    pub max_rendered_records: usize,
    pub history_threshold_px: f32,
}

impl StreamConfig {
    #[must_use]
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            reconnect_delay_ms: DEFAULT_RECONNECT_DELAY_MS,
            max_reconnect_attempts: DEFAULT_MAX_RECONNECT_ATTEMPTS,
            heartbeat_interval_ms: DEFAULT_HEARTBEAT_INTERVAL_MS,
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
            max_rendered_records: DEFAULT_MAX_RENDERED_RECORDS,
            history_threshold_px: DEFAULT_HISTORY_THRESHOLD_PX,
        }
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    /// Heartbeat probe period. Never zero; the driver's interval timer
    /// requires a non-zero period, so a zero tunable is clamped to 1 ms.
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms.max(1))
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Build the streaming URL for one task's log feed.
    ///
    /// `http`/`https` endpoints are mapped onto the matching WebSocket scheme
    /// so the config can carry the same base URL the REST layer uses.
    pub fn feed_url(&self, task_id: TaskId) -> Result<Url> {
        let mut url = Url::parse(&self.endpoint)?;
        let mapped = match url.scheme() {
            "ws" | "wss" => None,
            "http" => Some("ws"),
            "https" => Some("wss"),
            other => {
                return Err(ClientError::InvalidUrl(format!(
                    "endpoint must use ws, wss, http, or https scheme, got: {other}"
                )));
            }
        };
        if let Some(scheme) = mapped {
            url.set_scheme(scheme).map_err(|()| {
                ClientError::InvalidUrl(format!("cannot map {} onto a WebSocket scheme", self.endpoint))
            })?;
        }

        let path = format!("{}/api/ws/logs/{task_id}", url.path().trim_end_matches('/'));
        url.set_path(&path);
        url.set_query(None);
        url.set_fragment(None);
        Ok(url)
    }
}
