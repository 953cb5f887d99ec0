use std::time::Duration;

use serde::{Deserialize, Serialize};

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/134.0.0.0 Safari/537.36";

/// Resolver-wide settings. Per-request knobs live in
/// [`StreamOptions`](crate::metadata::StreamOptions) instead.
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct Settings {
    pub user_agent: String,
    /// Timeout for one-shot transport calls (probe, length, manifest).
    pub request_timeout_secs: u64,
    /// Path requested on an encoding's origin host for the reachability probe.
    pub probe_path: String,
    /// Precache window for live streams when the request does not set one.
    pub default_precache_secs: u64,
    /// Interval between live manifest re-resolutions.
    pub live_poll_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            request_timeout_secs: 10,
            probe_path: "/generate_204".to_string(),
            default_precache_secs: 10,
            live_poll_secs: 5,
        }
    }
}

impl Settings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn live_poll_interval(&self) -> Duration {
        Duration::from_secs(self.live_poll_secs)
    }
}
