//! Bridge configuration.
//!
//! The engine multiplexes several telemetry streams over control messages,
//! each identified by a [`ControlTag`]. The tag alone does not say how the
//! payload is framed, so the UI supplies a static tag → [`StreamKind`]
//! table at startup.
//!
//! ```ignore
//! let config = BridgeConfig::new()
//!     .with_stream(METER_TAG, StreamKind::Meter)
//!     .with_stream(SCOPE_TAG, StreamKind::Waveform);
//! ```
//!
//! The same table can be loaded from JSON:
//!
//! ```json
//! { "streams": { "3": "meter", "4": "waveform" }, "idleIntervalMs": 20 }
//! ```

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use beamer_bridge_core::ControlTag;

/// Default period of the idle tick.
pub const DEFAULT_IDLE_INTERVAL_MS: u64 = 16;

/// How control-message payloads for a tag are decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StreamKind {
    /// Stereo peak/RMS meter frame.
    Meter,
    /// Sample-buffer frame.
    Waveform,
    /// Raw bytes, stored in the mailbox under the control tag.
    Mailbox,
}

/// Startup configuration of a [`Bridge`](crate::Bridge).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeConfig {
    /// Control tag → stream kind.
    #[serde(default)]
    pub streams: HashMap<ControlTag, StreamKind>,
    /// Request a full state dump from the engine on mount.
    #[serde(default = "default_request_state")]
    pub request_state_on_mount: bool,
    /// Idle tick period in milliseconds.
    #[serde(default = "default_idle_interval_ms")]
    pub idle_interval_ms: u64,
}

fn default_request_state() -> bool {
    true
}

fn default_idle_interval_ms() -> u64 {
    DEFAULT_IDLE_INTERVAL_MS
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            streams: HashMap::new(),
            request_state_on_mount: true,
            idle_interval_ms: DEFAULT_IDLE_INTERVAL_MS,
        }
    }
}

impl BridgeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Route control messages for `ctrl_tag` to `kind`.
    pub fn with_stream(mut self, ctrl_tag: ControlTag, kind: StreamKind) -> Self {
        self.streams.insert(ctrl_tag, kind);
        self
    }

    /// Don't ask the engine for a state dump on mount.
    pub fn without_state_request(mut self) -> Self {
        self.request_state_on_mount = false;
        self
    }

    pub fn with_idle_interval(mut self, interval: Duration) -> Self {
        self.idle_interval_ms = interval.as_millis() as u64;
        self
    }

    /// Stream kind configured for `ctrl_tag`, if any.
    pub fn stream_kind(&self, ctrl_tag: ControlTag) -> Option<StreamKind> {
        self.streams.get(&ctrl_tag).copied()
    }

    /// Idle tick period.
    pub fn idle_interval(&self) -> Duration {
        Duration::from_millis(self.idle_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BridgeConfig::new();
        assert!(config.request_state_on_mount);
        assert_eq!(config.idle_interval(), Duration::from_millis(16));
        assert_eq!(config.stream_kind(0), None);
    }

    #[test]
    fn test_builder() {
        let config = BridgeConfig::new()
            .with_stream(3, StreamKind::Meter)
            .with_stream(4, StreamKind::Waveform)
            .without_state_request()
            .with_idle_interval(Duration::from_millis(40));
        assert_eq!(config.stream_kind(3), Some(StreamKind::Meter));
        assert_eq!(config.stream_kind(4), Some(StreamKind::Waveform));
        assert!(!config.request_state_on_mount);
        assert_eq!(config.idle_interval_ms, 40);
    }

    #[test]
    fn test_from_json() {
        let config = BridgeConfig::from_json(
            r#"{ "streams": { "3": "meter", "4": "waveform", "9": "mailbox" }, "idleIntervalMs": 20 }"#,
        )
        .unwrap();
        assert_eq!(config.stream_kind(3), Some(StreamKind::Meter));
        assert_eq!(config.stream_kind(4), Some(StreamKind::Waveform));
        assert_eq!(config.stream_kind(9), Some(StreamKind::Mailbox));
        assert!(config.request_state_on_mount);
        assert_eq!(config.idle_interval_ms, 20);
    }

    #[test]
    fn test_from_json_empty() {
        let config = BridgeConfig::from_json("{}").unwrap();
        assert_eq!(config, BridgeConfig::default());
    }
}
